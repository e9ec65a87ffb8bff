//! HTTP transport used by a fixture run

use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::http::{ClientSettings, HttpResponse, PreparedRequest};

/// Sends prepared requests. One transport serves one run.
pub trait Transport {
    /// Apply client-wide settings before the first request.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying client cannot be built.
    fn configure(&mut self, settings: &ClientSettings) -> Result<(), TransportError>;

    /// Send one request and read its body in full.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be completed.
    fn send(&mut self, request: &PreparedRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot build HTTP client: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("cannot read response body: {0}")]
    Body(String),
    #[error("transport used before it was configured")]
    NotConfigured,
}

/// [`Transport`] over a blocking `reqwest` client
#[derive(Debug, Default)]
pub struct BlockingTransport {
    client: Option<Client>,
}

impl BlockingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for BlockingTransport {
    fn configure(&mut self, settings: &ClientSettings) -> Result<(), TransportError> {
        let redirects = if settings.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(redirects)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    fn send(&mut self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConfigured)?;

        let mut builder = client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let start = Instant::now();
        let resp = builder
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .text()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        let elapsed = start.elapsed();

        Ok(HttpResponse::new(status, body)
            .with_headers(headers)
            .with_elapsed(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use reqwest::Method;

    #[test]
    fn send_before_configure_fails() {
        let settings = ClientSettings {
            base_url: Some("http://127.0.0.1:9/".into()),
            ..ClientSettings::default()
        };
        let request =
            PreparedRequest::prepare(HttpRequest::new(Method::GET, "date"), &settings).unwrap();
        let err = BlockingTransport::new().send(&request).unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured));
    }

    #[test]
    fn configure_builds_client() {
        let mut transport = BlockingTransport::new();
        transport.configure(&ClientSettings::default()).unwrap();
        assert!(transport.client.is_some());
    }
}

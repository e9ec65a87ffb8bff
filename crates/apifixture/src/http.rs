//! Request and response values passed between the fixture and its transport

use std::any::type_name;
use std::time::Duration;

use apifixture_core::{AssertionFailure, AssertionResult, RequestSnapshot, ResponseSnapshot};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;

use crate::error::FixtureError;

/// Request body bytes with an optional content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

impl RequestBody {
    /// Serialize `value` as an `application/json` body.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Serialize`] if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, FixtureError> {
        let content = serde_json::to_vec(value)
            .map_err(|e| FixtureError::Serialize(format!("{}: {e}", type_name::<T>())))?;
        Ok(Self {
            content,
            content_type: Some("application/json".to_string()),
        })
    }

    /// A `text/plain` body.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: text.into().into_bytes(),
            content_type: Some("text/plain; charset=utf-8".to_string()),
        }
    }

    /// Body as text for logging (lossy for non-UTF-8 bytes).
    #[must_use]
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A request under construction.
///
/// `uri` may be absolute or relative to the client's base URL. Headers are
/// kept as text and validated when the request is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: String::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Append a header, keeping existing values with the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Set a header, replacing any value with the same name (case-insensitive).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        remove_header(&mut self.headers, &name);
        self.headers.push((name, value.into()));
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Serialize`] if `value` cannot be serialized.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FixtureError> {
        self.body = Some(RequestBody::json(value)?);
        Ok(())
    }
}

fn remove_header(headers: &mut Vec<(String, String)>, name: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
}

/// Client-wide settings built by the client configurators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: Option<String>,
    pub default_headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
}

impl ClientSettings {
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = Some(base_url.into());
    }

    /// Set a default header, replacing any value with the same name.
    pub fn set_default_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        remove_header(&mut self.default_headers, &name);
        self.default_headers.push((name, value.into()));
    }

    fn parsed_base_url(&self) -> Result<Option<Url>, FixtureError> {
        self.base_url
            .as_deref()
            .map(|base| {
                Url::parse(base).map_err(|e| {
                    FixtureError::Configuration(format!("invalid base URL '{base}': {e}"))
                })
            })
            .transpose()
    }
}

/// A request resolved against the client settings, ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// Resolve the URI against the base URL and merge default headers.
    ///
    /// Request headers win over default headers with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Configuration`] for an unresolvable URI or an
    /// invalid header.
    pub fn prepare(request: HttpRequest, settings: &ClientSettings) -> Result<Self, FixtureError> {
        let url = resolve_url(&request.uri, settings)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &settings.default_headers {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }
        let mut overridden: Vec<HeaderName> = Vec::new();
        for (name, value) in &request.headers {
            let key = header_name(name)?;
            if !overridden.contains(&key) {
                headers.remove(&key);
                overridden.push(key.clone());
            }
            headers.append(key, header_value(name, value)?);
        }

        let body = match request.body {
            Some(body) => {
                if let Some(content_type) = &body.content_type {
                    if !headers.contains_key(CONTENT_TYPE) {
                        headers.insert(CONTENT_TYPE, header_value("content-type", content_type)?);
                    }
                }
                Some(body.content)
            }
            None => None,
        };

        Ok(Self {
            method: request.method,
            url,
            headers,
            body,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.to_string(),
            url: self.url.to_string(),
            headers: header_pairs(&self.headers),
            body: self
                .body
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        }
    }
}

fn resolve_url(uri: &str, settings: &ClientSettings) -> Result<Url, FixtureError> {
    match Url::parse(uri) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = settings.parsed_base_url()?.ok_or_else(|| {
                FixtureError::Configuration(format!("relative URI '{uri}' needs a base URL"))
            })?;
            base.join(uri).map_err(|e| {
                FixtureError::Configuration(format!("cannot resolve '{uri}' against '{base}': {e}"))
            })
        }
        Err(e) => Err(FixtureError::Configuration(format!("invalid URI '{uri}': {e}"))),
    }
}

fn header_name(name: &str) -> Result<HeaderName, FixtureError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| FixtureError::Configuration(format!("invalid header name '{name}': {e}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, FixtureError> {
    HeaderValue::from_str(value)
        .map_err(|e| FixtureError::Configuration(format!("invalid value for header '{name}': {e}")))
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// A received response; the body has been read in full.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    elapsed: Duration,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name` if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fails unless the status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns a failure naming the status and the start of the body.
    pub fn ensure_success(&self) -> AssertionResult {
        if self.status.is_success() {
            return Ok(());
        }
        let mut message = format!(
            "expected a success status code, got {}",
            status_text(self.status)
        );
        if !self.body.is_empty() {
            message.push('\n');
            message.push_str(&apifixture_core::snapshot::truncate_body(&self.body));
        }
        Err(AssertionFailure::unlocated(message))
    }

    #[must_use]
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status_code: self.status.as_u16(),
            reason: self.status.canonical_reason().unwrap_or("").to_string(),
            headers: header_pairs(&self.headers),
            body: (!self.body.is_empty()).then(|| self.body.clone()),
            latency_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `404 Not Found` style text for a status code.
pub(crate) fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(base: &str) -> ClientSettings {
        ClientSettings {
            base_url: Some(base.to_string()),
            ..ClientSettings::default()
        }
    }

    fn local() -> ClientSettings {
        settings("http://localhost:5000/")
    }

    #[test]
    fn relative_uri_resolves_against_base() {
        let prepared = PreparedRequest::prepare(
            HttpRequest::new(Method::GET, "widgets/7"),
            &settings("http://localhost:5000/"),
        )
        .unwrap();
        assert_eq!(prepared.url().as_str(), "http://localhost:5000/widgets/7");
    }

    #[test]
    fn absolute_uri_ignores_base() {
        let prepared = PreparedRequest::prepare(
            HttpRequest::new(Method::GET, "http://other.test/date"),
            &settings("http://localhost:5000/"),
        )
        .unwrap();
        assert_eq!(prepared.url().as_str(), "http://other.test/date");
    }

    #[test]
    fn relative_uri_without_base_is_a_configuration_error() {
        let err = PreparedRequest::prepare(
            HttpRequest::new(Method::GET, "date"),
            &ClientSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::Configuration(ref m) if m.contains("'date'")));
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let request = HttpRequest::new(Method::GET, "date");
        let err = PreparedRequest::prepare(request, &settings("::nope")).unwrap_err();
        assert!(matches!(err, FixtureError::Configuration(ref m) if m.contains("base URL")));
    }

    #[test]
    fn request_headers_override_defaults() {
        let mut settings = settings("http://localhost:5000/");
        settings.set_default_header("Accept", "text/plain");
        settings.set_default_header("X-Trace", "abc");
        let mut request = HttpRequest::new(Method::GET, "date");
        request.set_header("accept", "application/json");

        let prepared = PreparedRequest::prepare(request, &settings).unwrap();
        let accept: Vec<_> = prepared.headers().get_all("accept").iter().collect();
        assert_eq!(accept, vec!["application/json"]);
        assert_eq!(prepared.headers().get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn json_body_sets_content_type() {
        let mut request = HttpRequest::new(Method::POST, "widgets");
        request.set_json(&json!({"name": "a"})).unwrap();
        let prepared = PreparedRequest::prepare(request, &local()).unwrap();
        let content_type = prepared.headers().get(CONTENT_TYPE).unwrap();
        assert_eq!(content_type, "application/json");
        assert_eq!(prepared.body(), Some(br#"{"name":"a"}"#.as_slice()));
        let snapshot = prepared.snapshot();
        assert_eq!(snapshot.body.as_deref(), Some(r#"{"name":"a"}"#));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let mut request = HttpRequest::new(Method::GET, "date");
        request.set_header("X-Bad", "line\r\nbreak");
        let err = PreparedRequest::prepare(request, &local()).unwrap_err();
        assert!(matches!(err, FixtureError::Configuration(ref m) if m.contains("X-Bad")));
    }

    #[test]
    fn ensure_success_reports_status_and_body() {
        assert!(HttpResponse::new(StatusCode::NO_CONTENT, "").ensure_success().is_ok());

        let failure = HttpResponse::new(StatusCode::NOT_FOUND, "no such widget")
            .ensure_success()
            .unwrap_err();
        insta::assert_snapshot!(failure.to_string(), @r"
        expected a success status code, got 404 Not Found
        no such widget
        ");
    }

    #[test]
    fn response_snapshot_carries_latency() {
        let response = HttpResponse::new(StatusCode::CREATED, "")
            .with_header(LOCATION, HeaderValue::from_static("/widgets/7"))
            .with_elapsed(Duration::from_millis(12));
        let snapshot = response.snapshot();
        assert_eq!(snapshot.status_code, 201);
        assert_eq!(snapshot.reason, "Created");
        assert_eq!(snapshot.latency_ms, 12);
        assert_eq!(snapshot.body, None);
        assert_eq!(response.location(), Some("/widgets/7"));
    }
}

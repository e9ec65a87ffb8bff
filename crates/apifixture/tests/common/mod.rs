//! Stub HTTP server for integration tests

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::{Header, Response, Server};

/// Response produced by a stub handler
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A request as the stub saw it
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Hit {
    /// `METHOD url`
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Local server answering every request with `handler`. The serving thread
/// lives until the test process exits.
pub struct StubServer {
    base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl StubServer {
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&Hit) -> Reply + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("bind stub server");
        let addr = server
            .server_addr()
            .to_ip()
            .expect("stub server has an IP address");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&hits);

        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let hit = Hit {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    headers: request.headers().iter().map(header_pair).collect(),
                    body,
                };
                let reply = handler(&hit);
                recorded.lock().expect("hits lock").push(hit);

                let mut response = Response::from_string(reply.body).with_status_code(reply.status);
                for (name, value) in &reply.headers {
                    if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                        response.add_header(header);
                    }
                }
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://{addr}/"),
            hits,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().expect("hits lock").clone()
    }

    /// `METHOD url` of each request received, in order.
    pub fn hit_lines(&self) -> Vec<String> {
        self.hits().iter().map(Hit::line).collect()
    }
}

fn header_pair(header: &Header) -> (String, String) {
    let name = header.field.as_str().as_str().to_string();
    (name, header.value.as_str().to_string())
}

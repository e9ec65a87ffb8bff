//! Plain-data snapshots of requests and responses for the exchange log

use serde::{Deserialize, Serialize};

/// Headers whose values are masked in logs.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
];

/// Mask value for redacted headers.
const MASK: &str = "***";

/// Bodies longer than this are truncated in logs.
const MAX_BODY_BYTES: usize = 4096;

/// Snapshot of an outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Snapshot of an incoming HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

impl RequestSnapshot {
    /// Copy with sensitive header values replaced by `***`.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            headers: mask_headers(&self.headers),
            ..self.clone()
        }
    }
}

impl ResponseSnapshot {
    /// Copy with sensitive header values replaced by `***`.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            headers: mask_headers(&self.headers),
            ..self.clone()
        }
    }
}

fn mask_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            if SENSITIVE_HEADERS.contains(&k.to_ascii_lowercase().as_str()) {
                (k.clone(), MASK.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Truncate a body for display, cutting on a UTF-8 character boundary.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_BODY_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &body[..end], body.len())
}

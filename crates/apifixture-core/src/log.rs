//! Request/response log with elapsed time since fixture construction

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::snapshot::{RequestSnapshot, ResponseSnapshot, truncate_body};

/// Destination for diagnostic lines.
pub trait LogSink {
    fn write_line(&self, line: &str);
}

/// Writes to stderr. libtest captures it per test and prints it on failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write_line(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// Keeps lines in memory; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// All lines joined with newlines.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lines.borrow().join("\n")
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

/// Exchange log for one fixture.
pub struct ExchangeLog {
    started: Instant,
    sink: Box<dyn LogSink>,
    mask_headers: bool,
}

impl ExchangeLog {
    /// Start the clock now.
    #[must_use]
    pub fn new(sink: Box<dyn LogSink>) -> Self {
        Self {
            started: Instant::now(),
            sink,
            mask_headers: true,
        }
    }

    #[must_use]
    pub fn with_masking(mut self, mask_headers: bool) -> Self {
        self.mask_headers = mask_headers;
        self
    }

    pub fn set_masking(&mut self, mask_headers: bool) {
        self.mask_headers = mask_headers;
    }

    pub fn set_sink(&mut self, sink: Box<dyn LogSink>) {
        self.sink = sink;
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn request(&self, request: &RequestSnapshot) {
        let request = if self.mask_headers {
            request.masked()
        } else {
            request.clone()
        };
        let line = format_request(self.elapsed(), &request);
        self.sink.write_line(&line);
    }

    pub fn response(&self, response: &ResponseSnapshot) {
        let response = if self.mask_headers {
            response.masked()
        } else {
            response.clone()
        };
        let line = format_response(self.elapsed(), &response);
        self.sink.write_line(&line);
    }

    /// Free-form line, e.g. a phase marker.
    pub fn note(&self, message: &str) {
        let line = format!("{} {message}", format_elapsed(self.elapsed()));
        self.sink.write_line(&line);
    }
}

impl std::fmt::Debug for ExchangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeLog")
            .field("started", &self.started)
            .field("mask_headers", &self.mask_headers)
            .finish_non_exhaustive()
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("[{:>9.3}s]", elapsed.as_secs_f64())
}

fn format_request(elapsed: Duration, request: &RequestSnapshot) -> String {
    let mut out = format!(
        "{} Sending {} {}",
        format_elapsed(elapsed),
        request.method,
        request.url
    );
    write_headers_and_body(&mut out, &request.headers, request.body.as_deref());
    out
}

fn format_response(elapsed: Duration, response: &ResponseSnapshot) -> String {
    let mut out = format!(
        "{} Received {} {} ({} ms)",
        format_elapsed(elapsed),
        response.status_code,
        response.reason,
        response.latency_ms
    );
    write_headers_and_body(&mut out, &response.headers, response.body.as_deref());
    out
}

fn write_headers_and_body(out: &mut String, headers: &[(String, String)], body: Option<&str>) {
    for (k, v) in headers {
        let _ = write!(out, "\n  {k}: {v}");
    }
    match body {
        Some(b) if !b.is_empty() => {
            let _ = write!(out, "\n{}", truncate_body(b));
        }
        _ => out.push_str("\n<no body>"),
    }
}

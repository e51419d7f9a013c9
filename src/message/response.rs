use std::io::{self, Write};

use serde_json::Value;

use super::HeaderVec;

pub const HEADER_ALLOW: &str = "Allow";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_ETAG: &str = "ETag";

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// The response produced by a resource (or by the exception phase).
///
/// The body is a `serde_json::Value`: a `Value::String` is a pre-rendered
/// text or HTML payload and is written verbatim, any other value is
/// serialized as JSON, and `Value::Null` is an empty body.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    body: Value,
}

impl Response {
    /// An empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }

    /// A JSON response with the content type already set.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut response = Self::new(status);
        response.set_header(HEADER_CONTENT_TYPE, "application/json");
        response.body = body;
        response
    }

    /// A pre-rendered HTML response with the content type already set.
    #[must_use]
    pub fn html(status: u16, markup: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.set_header(HEADER_CONTENT_TYPE, "text/html");
        response.body = Value::String(markup.into());
        response
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn header_exists(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Add or replace a header (case-insensitive replace).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// The serialized body bytes as they would be written out.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Value::Null => Vec::new(),
            Value::String(s) => s.clone().into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        }
    }

    /// Serialize the response — status line, headers, blank line, body — to
    /// the given sink. Producing output is the terminal act of a dispatch
    /// run; everything before it only mutates the in-memory response.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "HTTP/1.1 {} {}\r\n", self.status, status_reason(self.status))?;
        for (name, value) in &self.headers {
            write!(out, "{name}: {value}\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(&self.body_bytes())?;
        out.flush()
    }
}

use std::collections::HashMap;

use http::Method;
use serde_json::Value;

use super::HeaderVec;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_IF_NONE_MATCH: &str = "if-none-match";

/// An incoming request as seen by the dispatch lifecycle.
///
/// Constructed by the host (or a test) from whatever transport it fronts.
/// The query string is split off the target and decoded at construction;
/// headers are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_params: HashMap<String, String>,
    headers: HeaderVec,
    body: Option<Value>,
}

impl Request {
    /// Build a request from a method and a target such as `/users/42?debug=1`.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let path = match target.find('?') {
            Some(pos) => target[..pos].to_string(),
            None => target.to_string(),
        };
        Self {
            method,
            path,
            query_params: parse_query_params(target),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    /// Attach a header, replacing any existing value for the same name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path split on `/` with empty segments dropped; `/` yields no segments.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive per RFC 7230).
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

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether the client declared it accepts an HTML response. This is the
    /// only content negotiation the core performs; it selects the shape of
    /// error responses.
    #[must_use]
    pub fn accepts_html(&self) -> bool {
        self.header(HEADER_ACCEPT)
            .map(|accept| accept.contains("text/html"))
            .unwrap_or(false)
    }
}

/// Parse query string parameters from a request target.
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values.
#[must_use]
pub fn parse_query_params(target: &str) -> HashMap<String, String> {
    match target.find('?') {
        Some(pos) => url::form_urlencoded::parse(target[pos + 1..].as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Method, Uri};

/// An incoming HTTP request with its body already read into memory.
///
/// The body is collected once, before the router sees the request. Request
/// logging renders that cached copy; nothing ever reads the wire twice.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request by hand. Header names are stored in canonical
    /// `Title-Case` form (`user-agent` becomes `User-Agent`).
    pub fn new(
        method: Method,
        uri: Uri,
        headers: impl IntoIterator<Item = (String, String)>,
        body: impl Into<Bytes>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (canonical_header_name(&name), value))
            .collect();
        Self { method, uri, headers, body: body.into(), params: HashMap::new() }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect::<Vec<_>>();
        Self::new(parts.method, parts.uri, headers, body)
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Path plus query string, e.g. `/search?q=rust`.
    pub fn full_path(&self) -> String {
        match self.uri.query() {
            Some(q) => format!("{}?{q}", self.uri.path()),
            None => self.uri.path().to_owned(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Type` header, or `""` when absent.
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// `content-type` → `Content-Type`, `x-api-key` → `X-Api-Key`.
///
/// hyper hands out lowercase names; sensitive-header matching is exact
/// against this canonical spelling.
pub(crate) fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

//! Request and response values exchanged with a [`Transport`](crate::Transport).
//!
//! Both types are plain data: cloning a request and changing one header is
//! how the interceptor builds a retry of the *same* logical operation.

use std::collections::BTreeMap;
use std::fmt;

/// The HTTP methods the site's API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns `true` for methods that only read (`GET`).
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Header names are stored lowercased so lookups are case-insensitive.
type Headers = BTreeMap<String, String>;

/// The `Authorization` header name, lowercased.
pub const AUTHORIZATION: &str = "authorization";

/// The `Content-Type` header name, lowercased.
pub const CONTENT_TYPE: &str = "content-type";

// ---------------------------------------------------------------------------
// HttpRequest
// ---------------------------------------------------------------------------

/// An outgoing request, addressed by a path relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: Method,
    path: String,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Sets a JSON body and the matching content type.
    pub fn with_json_body(self, body: Vec<u8>) -> Self {
        let mut request = self.with_header(CONTENT_TYPE, "application/json");
        request.body = Some(body);
        request
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The path as given, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path with the query string and trailing slash removed.
    pub fn route(&self) -> &str {
        let route = self.path.split(['?', '#']).next().unwrap_or_default();
        match route.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => route,
        }
    }

    /// Looks up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs, names lowercased.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The bearer token carried by this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

// ---------------------------------------------------------------------------
// HttpResponse
// ---------------------------------------------------------------------------

/// A successful (2xx) response.
///
/// Non-success statuses never become an `HttpResponse`: transports turn
/// them into [`TransportError::Status`](crate::TransportError::Status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Shorthand for a `200 OK` response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the response, returning the raw body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

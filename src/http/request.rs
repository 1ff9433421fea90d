use std::collections::HashMap;
use std::fmt;

use crate::http::headers::Headers;
use crate::http::parser::{self, RequestHead};

/// HTTP request methods.
///
/// The common verbs get their own variant; any other token is kept verbatim
/// in [`Method::Other`] so it can still be routed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other method token
    Other(String),
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Matching is case-sensitive; unknown or lowercase tokens become
    /// [`Method::Other`].
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Other("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(token) => token,
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Method::parse(s)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request, handed by value to exactly one handler.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path with the query string removed (e.g. "/users/42")
    pub path: String,
    /// HTTP version token as sent (typically "HTTP/1.1")
    pub version: String,
    /// Segments captured by `:name` placeholders of the matched route
    pub path_params: HashMap<String, String>,
    /// Decoded query string pairs; the last duplicate wins
    pub query: HashMap<String, String>,
    /// Decoded form or JSON body fields
    pub body: HashMap<String, String>,
    /// Exact body bytes as received
    pub raw_body: Vec<u8>,
    /// Request headers as received
    pub headers: Headers,
}

impl Request {
    /// Assembles a request from a parsed head and its complete body.
    ///
    /// Splits the query string off the target and decodes the body according
    /// to the Content-Type header. Path parameters are left empty; they are
    /// filled in once a route matches.
    pub fn from_parts(head: RequestHead, raw_body: Vec<u8>) -> Self {
        let (path, query) = parser::split_path_and_query(&head.target);
        let query = query
            .map(|q| parser::parse_form_encoded(q.as_bytes()))
            .unwrap_or_default();
        let body = parser::parse_body(head.headers.get("Content-Type"), &raw_body);

        Request {
            path: path.to_string(),
            method: head.method,
            version: head.version,
            path_params: HashMap::new(),
            query,
            body,
            raw_body,
            headers: head.headers,
        }
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Returns a captured path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Whether the client asked for the connection to be closed after this
    /// exchange (`Connection: close`).
    pub fn wants_close(&self) -> bool {
        self.header("Connection")
            .map(|v| v.trim().eq_ignore_ascii_case("close"))
            .unwrap_or(false)
    }

    /// Determines whether the connection should remain open after the
    /// response. HTTP/1.1 defaults to keep-alive.
    pub fn keep_alive(&self) -> bool {
        !self.wants_close()
    }

    /// Browser family named by the User-Agent header.
    pub fn browser(&self) -> &'static str {
        detect_browser(self.header("User-Agent").unwrap_or(""))
    }
}

/// Maps a User-Agent string to a browser family.
///
/// Order matters: Chrome agents also mention Safari.
pub fn detect_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Chrome") {
        "Chrome"
    } else if user_agent.contains("Firefox") {
        "Firefox"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "Unknown Browser"
    }
}

/// Builder for constructing Request objects, mostly for exercising handlers
/// without a socket.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    path_params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: HashMap<String, String>,
    raw_body: Vec<u8>,
    headers: Headers,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            path_params: HashMap::new(),
            query: HashMap::new(),
            body: HashMap::new(),
            raw_body: Vec::new(),
            headers: Headers::new(),
        }
    }

    pub fn method(mut self, method: impl Into<Method>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            path_params: self.path_params,
            query: self.query,
            body: self.body,
            raw_body: self.raw_body,
            headers: self.headers,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

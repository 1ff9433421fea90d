use std::borrow::Cow;

use serde::Serialize;

/// HTTP status codes the engine and its helpers produce.
///
/// Handlers are not limited to these: [`Response::with_status`] accepts any
/// numeric code and reason text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A complete HTTP response ready to be serialized.
///
/// The wire form always carries `Content-Type`, `Connection: keep-alive` and
/// a `Content-Length` computed from `body`; see [`crate::http::writer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Numeric status code
    pub status: u16,
    /// Reason phrase written after the code
    pub reason: Cow<'static, str>,
    /// Value of the Content-Type header
    pub content_type: Cow<'static, str>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use rawhttp::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.status, 200);
/// ```
pub struct ResponseBuilder {
    status: u16,
    reason: Cow<'static, str>,
    content_type: Cow<'static, str>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    /// Content type defaults to `text/plain`.
    pub fn new(status: StatusCode) -> Self {
        Self::with_status(status.as_u16(), status.reason_phrase())
    }

    /// Creates a builder for an arbitrary status code and reason text.
    pub fn with_status(status: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            content_type: Cow::Borrowed("text/plain"),
            body: Vec::new(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<Cow<'static, str>>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            reason: self.reason,
            content_type: self.content_type,
            body: self.body,
        }
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        ResponseBuilder::new(status).build()
    }

    pub fn with_status(status: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        ResponseBuilder::with_status(status, reason).build()
    }

    /// Creates a simple 200 OK `text/plain` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    /// Creates a 200 OK `text/html` response.
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .content_type("text/html")
            .body(body)
            .build()
    }

    /// Serializes `value` as a 200 OK `application/json` response, or a 500
    /// if serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => ResponseBuilder::new(StatusCode::Ok)
                .content_type("application/json")
                .body(body)
                .build(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize JSON response");
                Response::internal_error()
            }
        }
    }

    pub fn bad_request(message: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::BadRequest).body(message).build()
    }

    pub fn forbidden() -> Self {
        ResponseBuilder::new(StatusCode::Forbidden)
            .body(b"Access denied".to_vec())
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(b"Route Not Found".to_vec())
            .build()
    }

    pub fn payload_too_large() -> Self {
        ResponseBuilder::new(StatusCode::PayloadTooLarge)
            .body(b"Request body too large".to_vec())
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .body(b"Internal server error occurred".to_vec())
            .build()
    }

    /// Wire bytes of this response in a freshly allocated buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::http::writer::build(self.status, &self.content_type, &self.reason, &self.body)
    }
}

//! Handler-facing response type.

use std::collections::HashMap;

use crate::listener::{HttpVersion, WireResponse};

/// A response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub code: u16,
    /// Response body.
    pub body: Vec<u8>,
    /// Response headers, each with a list of values.
    pub headers: HashMap<String, Vec<String>>,
    /// Protocol version.
    pub version: HttpVersion,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            body: Vec::new(),
            headers: HashMap::new(),
            version: HttpVersion::default(),
        }
    }

    /// Builds a text response.
    ///
    /// The body is the UTF-8 encoding of `text` and the only header is
    /// `content-type: <content_type>;charset=utf-8`, with no space after
    /// the semicolon. `code` is not validated.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_http::Response;
    ///
    /// let res = Response::from_text("hi", "text/plain", 200);
    /// assert_eq!(res.body, b"hi");
    /// assert_eq!(res.header_values("content-type"), ["text/plain;charset=utf-8"]);
    /// ```
    pub fn from_text(text: &str, content_type: &str, code: u16) -> Self {
        Self::new(code)
            .header("content-type", format!("{content_type};charset=utf-8"))
            .body(text)
    }

    /// Creates a 404 Not Found response with no body.
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// Appends a header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the values of a header, or an empty slice.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

impl From<Response> for WireResponse {
    fn from(res: Response) -> Self {
        Self {
            code: res.code,
            body: res.body,
            headers: res.headers,
            version: res.version,
        }
    }
}

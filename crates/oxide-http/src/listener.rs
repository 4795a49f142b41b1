//! The contract between the routing core and the HTTP listener it runs on.
//!
//! The listener owns sockets, HTTP parsing and TLS. The core only needs a
//! way to acquire a listener for a port, bind and unbind per-path
//! callbacks, and hook a preprocessor in front of per-path dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::verb::{HttpVerb, VerbMask};

/// Completion callback handed to request handlers.
///
/// Called at most once with the response for the request.
pub type ResultCallback<'a> = &'a dyn Fn(WireResponse);

/// A listener-level request callback. Returns `true` if it claimed the
/// request.
pub type RequestHandler = Arc<dyn Fn(&WireRequest, ResultCallback<'_>) -> bool + Send + Sync>;

/// Token for a route bound on a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle(u64);

impl RouteHandle {
    /// Creates a handle. Only listener implementations mint handles.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the listener-assigned id.
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Token for a preprocessor registered on a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreprocessorHandle(u64);

impl PreprocessorHandle {
    /// Creates a handle. Only listener implementations mint handles.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the listener-assigned id.
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// HTTP protocol version of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpVersion {
    /// HTTP/1.0
    Http1_0,
    /// HTTP/1.1
    #[default]
    Http1_1,
}

/// A request as the listener delivers it.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Request verb.
    pub verb: HttpVerb,
    /// Path relative to the listener root.
    pub relative_path: String,
    /// Headers, each with every value received.
    pub headers: HashMap<String, Vec<String>>,
    /// Parameters captured by the listener's route pattern.
    pub path_params: HashMap<String, String>,
    /// Decoded query string parameters.
    pub query_params: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl WireRequest {
    /// Creates a request with no headers, parameters or body.
    pub fn new(verb: HttpVerb, relative_path: impl Into<String>) -> Self {
        Self {
            verb,
            relative_path: relative_path.into(),
            headers: HashMap::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            body: Vec::new(),
        }
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

    /// Sets a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Sets a path parameter.
    #[must_use]
    pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses a raw query string into decoded parameters.
    ///
    /// Keys and values are percent-decoded and `+` becomes a space. A
    /// repeated key keeps its last value.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_http::WireRequest;
    ///
    /// let params = WireRequest::parse_query_string("q=caf%C3%A9+au+lait&page=2");
    /// assert_eq!(params["q"], "café au lait");
    /// assert_eq!(params["page"], "2");
    /// ```
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (url_decode(key), url_decode(value))
            })
            .collect()
    }

    /// Returns `true` if the request targets the root path.
    ///
    /// Listeners may report the root as either `/` or an empty path.
    pub fn is_root(&self) -> bool {
        self.relative_path.is_empty() || self.relative_path == crate::path::ROOT
    }
}

/// A response as the listener sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub code: u16,
    /// Response body.
    pub body: Vec<u8>,
    /// Headers, each with every value to send.
    pub headers: HashMap<String, Vec<String>>,
    /// Protocol version.
    pub version: HttpVersion,
}

impl WireResponse {
    /// Creates an empty response with the given status.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            body: Vec::new(),
            headers: HashMap::new(),
            version: HttpVersion::default(),
        }
    }

    /// Creates a 404 Not Found response with no body.
    pub fn not_found() -> Self {
        Self::new(404)
    }
}

/// A listener bound to one port.
pub trait Listener: Send + Sync {
    /// Binds `handler` to `path` for the verbs in `verbs`.
    ///
    /// The handler is only invoked for requests whose verb is in the mask.
    fn bind_route(&self, path: &str, verbs: VerbMask, handler: RequestHandler) -> RouteHandle;

    /// Removes a route. Unknown handles are ignored.
    fn unbind_route(&self, handle: RouteHandle);

    /// Registers a hook run for every request before per-path dispatch.
    fn register_preprocessor(&self, handler: RequestHandler) -> PreprocessorHandle;

    /// Removes a preprocessor. Unknown handles are ignored.
    fn unregister_preprocessor(&self, handle: PreprocessorHandle);

    /// Returns `true` if `path` can be bound as a route.
    fn is_valid_path(&self, path: &str) -> bool;
}

/// Provides listeners and controls their lifecycle.
pub trait ListenerRuntime: Send + Sync {
    /// Returns the listener for `port`, or `None` if none can be acquired.
    fn listener(&self, port: u16) -> Option<Arc<dyn Listener>>;

    /// Starts every acquired listener.
    fn start_all(&self);

    /// Stops every listener.
    fn stop_all(&self);
}

/// Percent-decodes `input`, turning `+` into a space.
///
/// Decoding works on bytes so multi-byte UTF-8 sequences survive; invalid
/// escapes are kept as written and invalid UTF-8 is replaced.
fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' => {
                let byte = input
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = byte {
                    decoded.push(byte);
                    i += 3;
                    continue;
                }
                decoded.push(b'%');
            }
            other => decoded.push(other),
        }
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

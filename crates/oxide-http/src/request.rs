//! Handler-facing request type.

use std::collections::HashMap;

use crate::listener::WireRequest;
use crate::verb::HttpVerb;

/// A request as handlers see it.
///
/// Header values are flattened into one string and the body is text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Path relative to the listener root.
    pub path: String,
    /// Request headers, values joined by spaces.
    pub headers: HashMap<String, String>,
    /// Parameters captured by the route pattern.
    pub path_params: HashMap<String, String>,
    /// Query string parameters.
    pub query_params: HashMap<String, String>,
    /// Body decoded as UTF-8.
    pub body: String,
}

impl Request {
    /// Creates a request with no headers, parameters or body.
    pub fn new(verb: HttpVerb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            headers: HashMap::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            body: String::new(),
        }
    }

    /// Converts a listener request.
    ///
    /// Every header value is followed by a single space, so `["a", "b"]`
    /// becomes `"a b "`. Clients of the flattened form rely on that
    /// trailing space. Invalid UTF-8 in the body is replaced, never
    /// rejected.
    pub fn from_wire(wire: &WireRequest) -> Self {
        let headers = wire
            .headers
            .iter()
            .map(|(name, values)| {
                let joined = values.iter().fold(String::new(), |mut acc, v| {
                    acc.push_str(v);
                    acc.push(' ');
                    acc
                });
                (name.clone(), joined)
            })
            .collect();

        Self {
            verb: wire.verb,
            path: wire.relative_path.clone(),
            headers,
            path_params: wire.path_params.clone(),
            query_params: wire.query_params.clone(),
            body: String::from_utf8_lossy(&wire.body).into_owned(),
        }
    }

    /// Gets a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// Gets a path parameter.
    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

impl From<&WireRequest> for Request {
    fn from(wire: &WireRequest) -> Self {
        Self::from_wire(wire)
    }
}

//! Path normalization and pattern matching.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Result, ServerError};

/// The root path.
pub const ROOT: &str = "/";

/// Turns an arbitrary path string into the canonical route key.
///
/// The result always starts with a single `/` and never ends with one,
/// unless it is exactly `/`. Surrounding whitespace is ignored, including
/// whitespace uncovered by stripping trailing slashes, so normalizing a
/// normalized path changes nothing.
///
/// # Example
///
/// ```
/// use oxide_http::normalize_path;
///
/// assert_eq!(normalize_path("  foo/bar/ "), "/foo/bar");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ROOT.to_string();
    }

    let mut path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };

    while path.len() > 1 && path.ends_with(|c: char| c == '/' || c.is_whitespace()) {
        path.pop();
    }

    path
}

/// A compiled route path used by listeners to match request paths.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Parses a route path.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_http::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/:id/comments/:comment_id").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id").map(String::as_str), Some("123"));
    /// assert_eq!(params.get("comment_id").map(String::as_str), Some("456"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        let mut param_names = Vec::new();
        let mut regex_str = String::from("^");

        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            regex_str.push('/');

            if let Some(name) = part.strip_prefix(':').filter(|n| !n.is_empty()) {
                param_names.push(name.to_string());
                regex_str.push_str("([^/]+)");
            } else {
                regex_str.push_str(&regex::escape(part));
            }
        }

        regex_str.push_str("/?$");

        let regex =
            Regex::new(&regex_str).map_err(|e| ServerError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            param_names,
        })
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;

        let params = self
            .param_names
            .iter()
            .zip(caps.iter().skip(1))
            .filter_map(|(name, value)| Some((name.clone(), value?.as_str().to_string())))
            .collect();

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns `true` if the pattern has parameter segments.
    pub fn is_dynamic(&self) -> bool {
        !self.param_names.is_empty()
    }
}

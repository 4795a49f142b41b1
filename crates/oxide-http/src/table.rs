//! The route table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;
use crate::verb::{HttpVerb, VerbMask};

/// A handler that returns the response for the dispatcher to send.
pub type DelegateHandler = Arc<dyn Fn(Request) -> Response + Send + Sync>;

/// A handler that takes the request and completes it through its own
/// channel.
pub type NativeHandler = Arc<dyn Fn(Request) + Send + Sync>;

/// Calling convention of a route handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Returns a response.
    Delegate,
    /// Completes the response itself.
    Native,
}

/// A registered route handler.
#[derive(Clone)]
pub enum RouteHandler {
    /// See [`DelegateHandler`].
    Delegate(DelegateHandler),
    /// See [`NativeHandler`].
    Native(NativeHandler),
}

impl RouteHandler {
    /// Returns the calling convention of this handler.
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Delegate(_) => HandlerKind::Delegate,
            Self::Native(_) => HandlerKind::Native,
        }
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegate(_) => f.write_str("RouteHandler::Delegate(..)"),
            Self::Native(_) => f.write_str("RouteHandler::Native(..)"),
        }
    }
}

/// A single route entry.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Union of every verb set registered for the path.
    pub verbs: VerbMask,
    /// The most recently registered handler.
    pub handler: RouteHandler,
}

/// Route entries keyed by normalized path.
///
/// Keys must come from [`normalize_path`](crate::normalize_path). Each
/// path holds one handler; registering again replaces the handler and
/// widens the verb mask. Paths keep the order of their first registration.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
    order: Vec<String>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `path`.
    ///
    /// The handler replaces any previous one, whatever its kind. `verbs`
    /// is OR-ed into the mask already recorded for the path.
    pub fn register(&mut self, path: &str, verbs: VerbMask, handler: RouteHandler) {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.verbs |= verbs;
                entry.handler = handler;
            }
            None => {
                self.entries
                    .insert(path.to_string(), RouteEntry { verbs, handler });
                self.order.push(path.to_string());
            }
        }
    }

    /// Registers a delegate-style handler.
    pub fn register_delegate(&mut self, path: &str, verbs: VerbMask, handler: DelegateHandler) {
        self.register(path, verbs, RouteHandler::Delegate(handler));
    }

    /// Registers a native-style handler.
    pub fn register_native(&mut self, path: &str, verbs: VerbMask, handler: NativeHandler) {
        self.register(path, verbs, RouteHandler::Native(handler));
    }

    /// Looks up the entry for `path`.
    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.get(path)
    }

    /// Returns the delegate-style handler for `path`, if that is its kind.
    pub fn delegate(&self, path: &str) -> Option<DelegateHandler> {
        match &self.lookup(path)?.handler {
            RouteHandler::Delegate(handler) => Some(Arc::clone(handler)),
            RouteHandler::Native(_) => None,
        }
    }

    /// Returns the native-style handler for `path`, if that is its kind.
    pub fn native(&self, path: &str) -> Option<NativeHandler> {
        match &self.lookup(path)?.handler {
            RouteHandler::Native(handler) => Some(Arc::clone(handler)),
            RouteHandler::Delegate(_) => None,
        }
    }

    /// Returns the verb mask recorded for `path`.
    pub fn verbs(&self, path: &str) -> Option<VerbMask> {
        self.lookup(path).map(|e| e.verbs)
    }

    /// Returns the handler kind recorded for `path`.
    pub fn kind(&self, path: &str) -> Option<HandlerKind> {
        self.lookup(path).map(|e| e.handler.kind())
    }

    /// Returns `true` if `path` has a mask that includes `verb`.
    ///
    /// A path with no recorded mask allows nothing.
    pub fn allows(&self, path: &str, verb: HttpVerb) -> bool {
        self.verbs(path).is_some_and(|mask| mask.contains(verb))
    }

    /// Iterates over the registered paths in first-registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no path is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_delegate() -> DelegateHandler {
        Arc::new(|_: Request| Response::new(200))
    }

    fn teapot_delegate() -> DelegateHandler {
        Arc::new(|_: Request| Response::new(418))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = RouteTable::new();
        table.register_delegate("/a", VerbMask::GET, ok_delegate());

        assert_eq!(table.len(), 1);
        assert_eq!(table.kind("/a"), Some(HandlerKind::Delegate));
        assert!(table.delegate("/a").is_some());
        assert!(table.native("/a").is_none());
        assert!(table.lookup("/b").is_none());
    }

    #[test]
    fn test_verbs_merge_instead_of_replace() {
        let mut get_then_post = RouteTable::new();
        get_then_post.register_delegate("/a", VerbMask::GET, ok_delegate());
        get_then_post.register_delegate("/a", VerbMask::POST, ok_delegate());

        let mut post_then_get = RouteTable::new();
        post_then_get.register_delegate("/a", VerbMask::POST, ok_delegate());
        post_then_get.register_delegate("/a", VerbMask::GET, ok_delegate());

        assert_eq!(get_then_post.verbs("/a"), Some(VerbMask::GET | VerbMask::POST));
        assert_eq!(get_then_post.verbs("/a"), post_then_get.verbs("/a"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut table = RouteTable::new();
        table.register_delegate("/a", VerbMask::GET, ok_delegate());
        table.register_delegate("/a", VerbMask::GET, teapot_delegate());

        let handler = table.delegate("/a").unwrap();
        assert_eq!(handler(Request::new(HttpVerb::Get, "/a")).code, 418);
    }

    #[test]
    fn test_kind_switch_keeps_single_entry() {
        let mut table = RouteTable::new();
        table.register_delegate("/a", VerbMask::GET, ok_delegate());
        table.register_native("/a", VerbMask::PUT, Arc::new(|_: Request| {}));

        assert_eq!(table.len(), 1);
        assert_eq!(table.kind("/a"), Some(HandlerKind::Native));
        assert!(table.delegate("/a").is_none());
        assert_eq!(table.verbs("/a"), Some(VerbMask::GET | VerbMask::PUT));
    }

    #[test]
    fn test_paths_keep_registration_order() {
        let mut table = RouteTable::new();
        for path in ["/z", "/a/:x", "/m", "/:y/b", "/a"] {
            table.register_delegate(path, VerbMask::GET, ok_delegate());
        }
        table.register_native("/m", VerbMask::POST, Arc::new(|_: Request| {}));

        let paths: Vec<&str> = table.paths().collect();
        assert_eq!(paths, ["/z", "/a/:x", "/m", "/:y/b", "/a"]);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_allows() {
        let mut table = RouteTable::new();
        table.register_delegate("/a", VerbMask::GET | VerbMask::DELETE, ok_delegate());

        assert!(table.allows("/a", HttpVerb::Get));
        assert!(table.allows("/a", HttpVerb::Delete));
        assert!(!table.allows("/a", HttpVerb::Post));
        assert!(!table.allows("/missing", HttpVerb::Get));
    }
}

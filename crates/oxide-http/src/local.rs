//! In-memory listener runtime.
//!
//! Implements the listener contract without sockets: requests are handed
//! to [`LocalRuntime::dispatch`] directly. Used by the tests and by
//! embedders that terminate HTTP themselves and only need routing.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::listener::{
    Listener, ListenerRuntime, PreprocessorHandle, RequestHandler, RouteHandle, WireRequest,
    WireResponse,
};
use crate::path::{PathPattern, ROOT};
use crate::verb::VerbMask;

/// Outcome of dispatching a request on a [`LocalListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The completion callback produced this response.
    Completed(WireResponse),
    /// A handler claimed the request without completing it.
    Deferred,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Characters allowed in a path segment (RFC 3986 `pchar`).
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@%".contains(c)
}

struct LocalRoute {
    handle: RouteHandle,
    pattern: PathPattern,
    verbs: VerbMask,
    handler: RequestHandler,
}

struct LocalPreprocessor {
    handle: PreprocessorHandle,
    handler: RequestHandler,
}

/// A socket-free listener for one port.
pub struct LocalListener {
    port: u16,
    next_id: AtomicU64,
    routes: Mutex<Vec<LocalRoute>>,
    preprocessors: Mutex<Vec<LocalPreprocessor>>,
}

impl LocalListener {
    /// Creates a listener with nothing bound.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            next_id: AtomicU64::new(1),
            routes: Mutex::new(Vec::new()),
            preprocessors: Mutex::new(Vec::new()),
        }
    }

    /// The port this listener serves.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of bound routes.
    pub fn route_count(&self) -> usize {
        lock(&self.routes).len()
    }

    /// Number of registered preprocessors.
    pub fn preprocessor_count(&self) -> usize {
        lock(&self.preprocessors).len()
    }

    /// Runs `request` through the preprocessors, then the bound routes.
    ///
    /// Literal routes are tried before routes with `:param` segments;
    /// captured parameters are added to the request's path parameters.
    /// Unclaimed requests get a 404.
    pub fn dispatch(&self, mut request: WireRequest) -> Delivery {
        let slot = RefCell::new(None);
        let complete = |response: WireResponse| {
            slot.borrow_mut().get_or_insert(response);
        };

        let preprocessors: Vec<RequestHandler> = lock(&self.preprocessors)
            .iter()
            .map(|p| Arc::clone(&p.handler))
            .collect();

        for handler in preprocessors {
            if handler(&request, &complete) {
                return Self::delivery(slot);
            }
        }

        if let Some((handler, params)) = self.match_route(&request) {
            request.path_params.extend(params);
            if handler(&request, &complete) {
                return Self::delivery(slot);
            }
        }

        debug!(port = self.port, path = %request.relative_path, "no route claimed request");
        Delivery::Completed(WireResponse::not_found())
    }

    fn match_route(
        &self,
        request: &WireRequest,
    ) -> Option<(RequestHandler, HashMap<String, String>)> {
        let routes = lock(&self.routes);
        let candidates = routes
            .iter()
            .filter(|r| !r.pattern.is_dynamic())
            .chain(routes.iter().filter(|r| r.pattern.is_dynamic()));

        for route in candidates {
            if !route.verbs.contains(request.verb) {
                continue;
            }
            if let Some(params) = route.pattern.match_path(&request.relative_path) {
                return Some((Arc::clone(&route.handler), params));
            }
        }

        None
    }

    fn delivery(slot: RefCell<Option<WireResponse>>) -> Delivery {
        match slot.into_inner() {
            Some(response) => Delivery::Completed(response),
            None => Delivery::Deferred,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Listener for LocalListener {
    fn bind_route(&self, path: &str, verbs: VerbMask, handler: RequestHandler) -> RouteHandle {
        let handle = RouteHandle::new(self.next_id());

        match PathPattern::new(path) {
            Ok(pattern) => lock(&self.routes).push(LocalRoute {
                handle,
                pattern,
                verbs,
                handler,
            }),
            Err(err) => warn!(port = self.port, path, %err, "route ignored"),
        }

        handle
    }

    fn unbind_route(&self, handle: RouteHandle) {
        lock(&self.routes).retain(|r| r.handle != handle);
    }

    fn register_preprocessor(&self, handler: RequestHandler) -> PreprocessorHandle {
        let handle = PreprocessorHandle::new(self.next_id());
        lock(&self.preprocessors).push(LocalPreprocessor { handle, handler });
        handle
    }

    fn unregister_preprocessor(&self, handle: PreprocessorHandle) {
        lock(&self.preprocessors).retain(|p| p.handle != handle);
    }

    fn is_valid_path(&self, path: &str) -> bool {
        if path == ROOT {
            return true;
        }

        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };

        rest.split('/')
            .all(|segment| !segment.is_empty() && segment.chars().all(is_path_char))
    }
}

/// A socket-free listener runtime.
///
/// Listeners are created per port on first acquisition and outlive any
/// server using them.
#[derive(Default)]
pub struct LocalRuntime {
    listeners: Mutex<HashMap<u16, Arc<LocalListener>>>,
    unavailable: Mutex<HashSet<u16>>,
    running: AtomicBool,
    acquisitions: AtomicUsize,
}

impl LocalRuntime {
    /// Creates a runtime with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes acquisition fail for `port`.
    pub fn mark_unavailable(&self, port: u16) {
        lock(&self.unavailable).insert(port);
    }

    /// Returns `true` between `start_all` and `stop_all`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of listener acquisitions attempted.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Returns the listener for `port` if it was ever acquired.
    pub fn local_listener(&self, port: u16) -> Option<Arc<LocalListener>> {
        lock(&self.listeners).get(&port).cloned()
    }

    /// Delivers `request` to the listener on `port`.
    ///
    /// Returns `None` when the runtime is stopped or nothing listens on
    /// the port.
    pub fn dispatch(&self, port: u16, request: WireRequest) -> Option<Delivery> {
        if !self.is_running() {
            return None;
        }
        let listener = self.local_listener(port)?;
        Some(listener.dispatch(request))
    }
}

impl ListenerRuntime for LocalRuntime {
    fn listener(&self, port: u16) -> Option<Arc<dyn Listener>> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        if lock(&self.unavailable).contains(&port) {
            return None;
        }

        let listener: Arc<dyn Listener> = lock(&self.listeners)
            .entry(port)
            .or_insert_with(|| Arc::new(LocalListener::new(port)))
            .clone();
        Some(listener)
    }

    fn start_all(&self) {
        debug!("starting local listeners");
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop_all(&self) {
        debug!("stopping local listeners");
        self.running.store(false, Ordering::SeqCst);
    }
}

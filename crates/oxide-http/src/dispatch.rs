//! Request dispatch from listener callbacks to route handlers.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::listener::{RequestHandler, ResultCallback, WireRequest, WireResponse};
use crate::path::ROOT;
use crate::request::Request;
use crate::table::{HandlerKind, RouteTable};

/// Routes listener callbacks into the shared route table.
///
/// Cheap to clone; every clone sees the same table. Handlers are cloned
/// out of the table before they run, so a handler may register routes.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    routes: Arc<RwLock<RouteTable>>,
}

impl Dispatcher {
    /// Creates a dispatcher over an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the route table.
    pub fn routes(&self) -> RwLockReadGuard<'_, RouteTable> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn routes_mut(&self) -> RwLockWriteGuard<'_, RouteTable> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatches to the delegate-style handler for `path`.
    ///
    /// The handler's response goes to `complete`; a missing handler
    /// completes with a 404. Always returns `true`.
    pub fn handle_request(
        &self,
        path: &str,
        request: &WireRequest,
        complete: ResultCallback<'_>,
    ) -> bool {
        let handler = self.routes().delegate(path);

        match handler {
            Some(handler) => {
                let response = handler(Request::from_wire(request));
                complete(WireResponse::from(response));
            }
            None => {
                debug!(path, verb = %request.verb, "no delegate handler, responding 404");
                complete(WireResponse::not_found());
            }
        }

        true
    }

    /// Dispatches to the native-style handler for `path`.
    ///
    /// The handler owns completion, so `complete` is only called for the
    /// 404 when no handler exists. Always returns `true`.
    pub fn handle_request_native(
        &self,
        path: &str,
        request: &WireRequest,
        complete: ResultCallback<'_>,
    ) -> bool {
        let handler = self.routes().native(path);

        match handler {
            Some(handler) => handler(Request::from_wire(request)),
            None => {
                debug!(path, verb = %request.verb, "no native handler, responding 404");
                complete(WireResponse::not_found());
            }
        }

        true
    }

    /// Listener-global hook serving the root path.
    ///
    /// Declines anything that is not a root request or whose verb is not
    /// in the root mask, and declines when no root handler exists, so the
    /// listener's own dispatch can take over.
    pub fn preprocess_root(&self, request: &WireRequest, complete: ResultCallback<'_>) -> bool {
        if !request.is_root() {
            return false;
        }

        let (verbs, kind) = {
            let routes = self.routes();
            (routes.verbs(ROOT), routes.kind(ROOT))
        };

        if let Some(verbs) = verbs {
            if !verbs.contains(request.verb) {
                return false;
            }
        }

        match kind {
            Some(HandlerKind::Delegate) => self.handle_request(ROOT, request, complete),
            Some(HandlerKind::Native) => self.handle_request_native(ROOT, request, complete),
            None => false,
        }
    }

    /// Wraps [`preprocess_root`](Self::preprocess_root) as a listener
    /// callback.
    pub fn root_preprocessor(&self) -> RequestHandler {
        let dispatcher = self.clone();
        Arc::new(move |request: &WireRequest, complete: &dyn Fn(WireResponse)| {
            dispatcher.preprocess_root(request, complete)
        })
    }

    /// Builds the listener callback for a bound route.
    ///
    /// The callback owns its copy of `path`.
    pub fn route_callback(&self, path: &str, kind: HandlerKind) -> RequestHandler {
        let dispatcher = self.clone();
        let path = path.to_string();
        match kind {
            HandlerKind::Delegate => Arc::new(
                move |request: &WireRequest, complete: &dyn Fn(WireResponse)| {
                    dispatcher.handle_request(&path, request, complete)
                },
            ),
            HandlerKind::Native => Arc::new(
                move |request: &WireRequest, complete: &dyn Fn(WireResponse)| {
                    dispatcher.handle_request_native(&path, request, complete)
                },
            ),
        }
    }
}

//! Server lifecycle on top of a listener runtime.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Result, ServerError};
use crate::listener::{
    Listener, ListenerRuntime, PreprocessorHandle, ResultCallback, RouteHandle, WireRequest,
};
use crate::path::{normalize_path, ROOT};
use crate::request::Request;
use crate::response::Response;
use crate::table::{HandlerKind, RouteHandler};
use crate::verb::VerbMask;

/// Hook that registers routes each time the server starts.
///
/// Runs after the listener is acquired and before listeners are started,
/// so every route it binds is live from the first request.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use oxide_http::{LocalRuntime, Response, Server, VerbMask};
///
/// let runtime = Arc::new(LocalRuntime::new());
/// let mut server = Server::new(runtime).with_route_binder(|server: &mut Server| {
///     server.bind_route("/health", VerbMask::GET, |_| {
///         Response::from_text("ok", "text/plain", 200)
///     });
/// });
///
/// server.start_server(8080).unwrap();
/// assert!(server.verbs_for("/health").is_some());
/// ```
pub trait RouteBinder: Send {
    /// Registers additional routes on `server`.
    fn bind_routes(&mut self, server: &mut Server);
}

impl<F> RouteBinder for F
where
    F: FnMut(&mut Server) + Send,
{
    fn bind_routes(&mut self, server: &mut Server) {
        self(server);
    }
}

/// A route bound on the current listener.
#[derive(Debug)]
struct BoundRoute {
    path: String,
    handle: RouteHandle,
}

/// Routes requests from a listener to registered handlers.
///
/// Routes may be bound before or after [`start_server`](Self::start_server).
/// Routes recorded while idle are attached when the server starts, and
/// again after every restart.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use oxide_http::{Delivery, HttpVerb, LocalRuntime, Server, VerbMask, WireRequest};
///
/// let runtime = Arc::new(LocalRuntime::new());
/// let mut server = Server::new(runtime.clone());
///
/// server.bind_route("/hello", VerbMask::GET, |req| {
///     Server::make_response(&format!("hello from {}", req.path), "text/plain", 200)
/// });
/// server.start_server(8080).unwrap();
///
/// let delivery = runtime.dispatch(8080, WireRequest::new(HttpVerb::Get, "/hello"));
/// match delivery {
///     Some(Delivery::Completed(res)) => assert_eq!(res.body, b"hello from /hello"),
///     other => panic!("unexpected delivery: {other:?}"),
/// }
/// ```
pub struct Server {
    runtime: Arc<dyn ListenerRuntime>,
    dispatcher: Dispatcher,
    listener: Option<Arc<dyn Listener>>,
    port: Option<u16>,
    started: bool,
    root_preprocessor: Option<PreprocessorHandle>,
    bound_routes: Vec<BoundRoute>,
    route_binder: Option<Box<dyn RouteBinder>>,
}

impl Server {
    /// Creates an idle server on top of `runtime`.
    pub fn new(runtime: Arc<dyn ListenerRuntime>) -> Self {
        Self {
            runtime,
            dispatcher: Dispatcher::new(),
            listener: None,
            port: None,
            started: false,
            root_preprocessor: None,
            bound_routes: Vec::new(),
            route_binder: None,
        }
    }

    /// Sets the hook run on every start.
    #[must_use]
    pub fn with_route_binder(mut self, binder: impl RouteBinder + 'static) -> Self {
        self.set_route_binder(binder);
        self
    }

    /// Replaces the hook run on every start.
    pub fn set_route_binder(&mut self, binder: impl RouteBinder + 'static) {
        self.route_binder = Some(Box::new(binder));
    }

    /// Acquires the listener for `port`, attaches every recorded route,
    /// runs the route binder and starts the listeners.
    ///
    /// Failures are logged and leave the server idle. Starting a running
    /// server stops it first.
    pub fn start_server(&mut self, port: i32) -> Result<()> {
        let port = match u16::try_from(port) {
            Ok(port) if port > 0 => port,
            _ => {
                error!(
                    port,
                    "could not start server, port number must be between 1 and 65535"
                );
                return Err(ServerError::InvalidPort(port));
            }
        };

        if self.started {
            warn!(
                old_port = ?self.port,
                new_port = port,
                "server already started, restarting"
            );
            self.stop_server();
        }

        self.port = Some(port);

        let Some(listener) = self.runtime.listener(port) else {
            self.started = false;
            error!(port, "could not start web server");
            return Err(ServerError::ListenerUnavailable(port));
        };

        self.listener = Some(Arc::clone(&listener));
        self.attach_recorded_routes(&listener);
        self.run_route_binder();

        self.runtime.start_all();

        self.started = true;
        info!(port, routes = self.bound_routes.len(), "web server started");
        Ok(())
    }

    /// Stops the listeners and removes everything this server bound.
    ///
    /// Safe to call repeatedly and before any start.
    pub fn stop_server(&mut self) {
        info!(port = ?self.port, "stopping server");

        self.runtime.stop_all();

        // Listeners live in the runtime, not in the server.
        if let Some(listener) = self.listener.take() {
            if let Some(handle) = self.root_preprocessor.take() {
                listener.unregister_preprocessor(handle);
            }

            for bound in self.bound_routes.drain(..) {
                listener.unbind_route(bound.handle);
            }
        }

        self.started = false;
    }

    /// Registers a delegate-style handler for `path`.
    ///
    /// The path is normalized first. Registering an existing path replaces
    /// its handler and adds `verbs` to its mask.
    pub fn bind_route<F>(&mut self, path: &str, verbs: VerbMask, handler: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static,
    {
        self.register(path, verbs, RouteHandler::Delegate(Arc::new(handler)));
    }

    /// Registers a native-style handler for `path`.
    ///
    /// The handler receives the request and is responsible for answering
    /// it; the listener's completion callback is not called.
    pub fn bind_route_native<F>(&mut self, path: &str, verbs: VerbMask, handler: F)
    where
        F: Fn(Request) + Send + Sync + 'static,
    {
        self.register(path, verbs, RouteHandler::Native(Arc::new(handler)));
    }

    /// See [`Dispatcher::handle_request`].
    pub fn handle_request(
        &self,
        path: &str,
        request: &WireRequest,
        complete: ResultCallback<'_>,
    ) -> bool {
        self.dispatcher.handle_request(path, request, complete)
    }

    /// See [`Dispatcher::handle_request_native`].
    pub fn handle_request_native(
        &self,
        path: &str,
        request: &WireRequest,
        complete: ResultCallback<'_>,
    ) -> bool {
        self.dispatcher.handle_request_native(path, request, complete)
    }

    /// Builds a text response. See [`Response::from_text`].
    pub fn make_response(text: &str, content_type: &str, code: u16) -> Response {
        Response::from_text(text, content_type, code)
    }

    /// Returns `true` while the server is started.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The port of the last start attempt that passed validation.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns `true` if the root preprocessor is registered.
    pub fn root_preprocessor_registered(&self) -> bool {
        self.root_preprocessor.is_some()
    }

    /// Number of routes bound on the current listener.
    pub fn bound_route_count(&self) -> usize {
        self.bound_routes.len()
    }

    /// Verb mask recorded for `path`, normalized first.
    pub fn verbs_for(&self, path: &str) -> Option<VerbMask> {
        self.dispatcher.routes().verbs(&normalize_path(path))
    }

    /// Handler kind recorded for `path`, normalized first.
    pub fn handler_kind(&self, path: &str) -> Option<HandlerKind> {
        self.dispatcher.routes().kind(&normalize_path(path))
    }

    /// The dispatcher over this server's route table.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn register(&mut self, path: &str, verbs: VerbMask, handler: RouteHandler) {
        let path = normalize_path(path);
        self.dispatcher
            .routes_mut()
            .register(&path, verbs, handler);

        let Some(listener) = self.listener.clone() else {
            debug!(path = %path, %verbs, "no listener yet, route recorded for next start");
            return;
        };

        if let Err(err) = self.attach(&listener, &path) {
            error!(%err, "this route will not be bound");
        }
    }

    fn attach_recorded_routes(&mut self, listener: &Arc<dyn Listener>) {
        let paths: Vec<String> = self
            .dispatcher
            .routes()
            .paths()
            .map(str::to_string)
            .collect();

        for path in paths {
            if let Err(err) = self.attach(listener, &path) {
                error!(%err, "this route will not be bound");
            }
        }
    }

    /// Makes `path` reachable through `listener` with its current table
    /// entry.
    fn attach(&mut self, listener: &Arc<dyn Listener>, path: &str) -> Result<()> {
        if path == ROOT {
            self.ensure_root_preprocessor(listener);
            return Ok(());
        }

        if !listener.is_valid_path(path) {
            return Err(ServerError::InvalidRoutePath(path.to_string()));
        }

        let Some((verbs, kind)) = self
            .dispatcher
            .routes()
            .lookup(path)
            .map(|entry| (entry.verbs, entry.handler.kind()))
        else {
            return Ok(());
        };

        if let Some(pos) = self.bound_routes.iter().position(|b| b.path == path) {
            let previous = self.bound_routes.remove(pos);
            listener.unbind_route(previous.handle);
        }

        let handle = listener.bind_route(path, verbs, self.dispatcher.route_callback(path, kind));
        debug!(path, %verbs, ?kind, "route bound");

        self.bound_routes.push(BoundRoute {
            path: path.to_string(),
            handle,
        });
        Ok(())
    }

    fn ensure_root_preprocessor(&mut self, listener: &Arc<dyn Listener>) {
        if self.root_preprocessor.is_some() {
            return;
        }

        let handle = listener.register_preprocessor(self.dispatcher.root_preprocessor());
        debug!("root preprocessor registered");
        self.root_preprocessor = Some(handle);
    }

    fn run_route_binder(&mut self) {
        if let Some(mut binder) = self.route_binder.take() {
            binder.bind_routes(self);
            // The hook may have installed a replacement.
            if self.route_binder.is_none() {
                self.route_binder = Some(binder);
            }
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("port", &self.port)
            .field("started", &self.started)
            .field("root_preprocessor", &self.root_preprocessor)
            .field("bound_routes", &self.bound_routes)
            .field("routes", &self.dispatcher.routes().len())
            .finish_non_exhaustive()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.stop_server();
        }
    }
}

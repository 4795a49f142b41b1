//! # oxide-http
//!
//! A request routing core for HTTP listeners you do not own.
//!
//! This crate provides:
//! - Path normalization, so `"users/"`, `" /users "` and `"/users"` are one route
//! - A route table with per-path verb masks that widen on re-registration
//! - Two handler conventions: delegate-style (returns a response) and
//!   native-style (answers the request itself)
//! - Root path dispatch through a listener preprocessor
//! - Conversion between the listener's request/response types and simple
//!   handler-facing ones
//!
//! Sockets, HTTP parsing and TLS belong to the listener, reached through the
//! [`ListenerRuntime`] and [`Listener`] traits. [`LocalRuntime`] is an
//! in-memory implementation.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use oxide_http::{Delivery, HttpVerb, LocalRuntime, Server, VerbMask, WireRequest};
//!
//! let runtime = Arc::new(LocalRuntime::new());
//! let mut server = Server::new(runtime.clone());
//!
//! server.bind_route("/", VerbMask::GET, |_| {
//!     Server::make_response("<h1>Hello</h1>", "text/html", 200)
//! });
//! server.bind_route("users/:id/", VerbMask::GET | VerbMask::DELETE, |req| {
//!     let id = req.path_param("id").unwrap_or("unknown");
//!     Server::make_response(&format!("user {id}"), "text/plain", 200)
//! });
//! server.start_server(8080).unwrap();
//!
//! let res = runtime.dispatch(8080, WireRequest::new(HttpVerb::Get, "/users/7"));
//! assert!(matches!(res, Some(Delivery::Completed(r)) if r.body == b"user 7"));
//!
//! server.stop_server();
//! ```
//!
//! ## Native-style handlers
//!
//! A native-style handler gets the request and nothing else. The listener's
//! completion callback is not called for it, so the handler answers through
//! its own channel (a queue, a socket it owns, a deferred job):
//!
//! ```ignore
//! server.bind_route_native("/jobs", VerbMask::POST, move |req| {
//!     jobs.send(req.body).ok();
//! });
//! ```
//!
//! ## Registering routes on start
//!
//! A [`RouteBinder`] runs every time the server starts, after the listener
//! is acquired:
//!
//! ```ignore
//! let server = Server::new(runtime).with_route_binder(|server: &mut Server| {
//!     server.bind_route("/health", VerbMask::GET, |_| {
//!         Server::make_response("ok", "text/plain", 200)
//!     });
//! });
//! ```

mod dispatch;
mod error;
mod listener;
mod local;
mod path;
mod request;
mod response;
mod server;
mod table;
mod verb;

pub use dispatch::Dispatcher;
pub use error::{Result, ServerError};
pub use listener::{
    HttpVersion, Listener, ListenerRuntime, PreprocessorHandle, RequestHandler, ResultCallback,
    RouteHandle, WireRequest, WireResponse,
};
pub use local::{Delivery, LocalListener, LocalRuntime};
pub use path::{normalize_path, PathPattern, ROOT};
pub use request::Request;
pub use response::Response;
pub use server::{RouteBinder, Server};
pub use table::{DelegateHandler, HandlerKind, NativeHandler, RouteEntry, RouteHandler, RouteTable};
pub use verb::{HttpVerb, VerbMask};

#![allow(dead_code)]

use std::sync::Arc;

use oxide_http::{Delivery, HttpVerb, LocalRuntime, Server, WireRequest, WireResponse};

pub const PORT: u16 = 8080;

pub fn setup() -> (Arc<LocalRuntime>, Server) {
    let runtime = Arc::new(LocalRuntime::new());
    let server = Server::new(runtime.clone());
    (runtime, server)
}

pub fn send(runtime: &LocalRuntime, request: WireRequest) -> Delivery {
    runtime
        .dispatch(PORT, request)
        .unwrap_or_else(|| panic!("nothing listening on port {PORT}"))
}

pub fn respond(runtime: &LocalRuntime, verb: HttpVerb, path: &str) -> WireResponse {
    match send(runtime, WireRequest::new(verb, path)) {
        Delivery::Completed(res) => res,
        Delivery::Deferred => panic!("Expected a response for {verb} {path}, got Deferred"),
    }
}

pub fn body(res: &WireResponse) -> String {
    String::from_utf8(res.body.clone()).expect("body is not UTF-8")
}

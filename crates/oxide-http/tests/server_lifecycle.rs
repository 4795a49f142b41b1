//! Tests for server start/stop and route attachment.

mod common;
use common::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oxide_http::{
    Delivery, HttpVerb, LocalRuntime, Response, Server, ServerError, VerbMask, WireRequest,
};

#[test]
fn routes_bound_before_start_are_served() {
    let (runtime, mut server) = setup();
    server.bind_route("/hello/", VerbMask::GET, |_| {
        Server::make_response("hello", "text/plain", 200)
    });

    server.start_server(i32::from(PORT)).unwrap();

    let res = respond(&runtime, HttpVerb::Get, "/hello");
    assert_eq!(res.code, 200);
    assert_eq!(body(&res), "hello");
    assert_eq!(
        res.headers.get("content-type"),
        Some(&vec!["text/plain;charset=utf-8".to_string()])
    );
}

#[test]
fn routes_bound_after_start_are_served() {
    let (runtime, mut server) = setup();
    server.start_server(i32::from(PORT)).unwrap();

    server.bind_route("late", VerbMask::POST, |req| {
        Server::make_response(&req.body, "text/plain", 201)
    });

    let res = send(&runtime, WireRequest::new(HttpVerb::Post, "/late").body("echo"));
    match res {
        Delivery::Completed(res) => {
            assert_eq!(res.code, 201);
            assert_eq!(body(&res), "echo");
        }
        Delivery::Deferred => panic!("expected a response"),
    }
}

#[test]
fn verbs_merge_across_bindings() {
    let (runtime, mut server) = setup();
    server.bind_route("/items", VerbMask::GET, |_| Response::new(200));
    server.bind_route("/items", VerbMask::POST, |_| Response::new(200));
    server.start_server(i32::from(PORT)).unwrap();

    assert_eq!(respond(&runtime, HttpVerb::Get, "/items").code, 200);
    assert_eq!(respond(&runtime, HttpVerb::Post, "/items").code, 200);
    assert_eq!(respond(&runtime, HttpVerb::Delete, "/items").code, 404);
}

#[test]
fn verbs_merge_while_started() {
    let (runtime, mut server) = setup();
    server.start_server(i32::from(PORT)).unwrap();
    server.bind_route("/items", VerbMask::POST, |_| Response::new(201));
    server.bind_route("/items", VerbMask::GET, |_| Response::new(200));

    assert_eq!(respond(&runtime, HttpVerb::Get, "/items").code, 200);
    assert_eq!(respond(&runtime, HttpVerb::Post, "/items").code, 200);
    assert_eq!(server.bound_route_count(), 1);
}

#[test]
fn unregistered_path_is_404() {
    let (runtime, mut server) = setup();
    server.start_server(i32::from(PORT)).unwrap();

    let res = respond(&runtime, HttpVerb::Get, "/missing");
    assert_eq!(res.code, 404);
    assert!(res.body.is_empty());
}

#[test]
fn stop_before_start_is_harmless() {
    let (runtime, mut server) = setup();
    server.stop_server();

    assert!(!server.is_started());
    assert_eq!(server.port(), None);
    assert_eq!(runtime.acquisitions(), 0);
}

#[test]
fn non_positive_port_leaves_server_idle() {
    let (runtime, mut server) = setup();

    assert_eq!(server.start_server(0), Err(ServerError::InvalidPort(0)));
    assert_eq!(server.start_server(-1), Err(ServerError::InvalidPort(-1)));

    assert!(!server.is_started());
    assert_eq!(runtime.acquisitions(), 0);
    assert!(!runtime.is_running());
}

#[test]
fn unavailable_port_leaves_server_idle() {
    let (runtime, mut server) = setup();
    runtime.mark_unavailable(PORT);
    server.bind_route("/a", VerbMask::GET, |_| Response::new(200));

    assert!(server.start_server(i32::from(PORT)).is_err());
    assert!(!server.is_started());
    assert_eq!(server.bound_route_count(), 0);
    assert!(runtime.dispatch(PORT, WireRequest::new(HttpVerb::Get, "/a")).is_none());
}

#[test]
fn stop_unbinds_everything_and_is_idempotent() {
    let (runtime, mut server) = setup();
    server.bind_route("/", VerbMask::GET, |_| Response::new(200));
    server.bind_route("/a", VerbMask::GET, |_| Response::new(200));
    server.bind_route_native("/b", VerbMask::POST, |_| {});
    server.start_server(i32::from(PORT)).unwrap();

    let listener = runtime.local_listener(PORT).unwrap();
    assert_eq!(listener.route_count(), 2);
    assert_eq!(listener.preprocessor_count(), 1);

    server.stop_server();
    server.stop_server();

    assert!(!server.is_started());
    assert!(!server.root_preprocessor_registered());
    assert_eq!(listener.route_count(), 0);
    assert_eq!(listener.preprocessor_count(), 0);
    assert!(runtime.dispatch(PORT, WireRequest::new(HttpVerb::Get, "/a")).is_none());
}

#[test]
fn restart_restores_routes_and_single_preprocessor() {
    let (runtime, mut server) = setup();
    server.bind_route("/", VerbMask::GET, |_| {
        Server::make_response("root", "text/plain", 200)
    });
    server.bind_route("/a", VerbMask::GET, |_| {
        Server::make_response("a", "text/plain", 200)
    });

    server.start_server(i32::from(PORT)).unwrap();
    server.stop_server();
    server.start_server(i32::from(PORT)).unwrap();

    let listener = runtime.local_listener(PORT).unwrap();
    assert_eq!(listener.preprocessor_count(), 1);
    assert_eq!(listener.route_count(), 1);

    assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/")), "root");
    assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/a")), "a");
}

#[test]
fn restart_on_other_port() {
    let (runtime, mut server) = setup();
    server.bind_route("/a", VerbMask::GET, |_| Response::new(200));
    server.start_server(i32::from(PORT)).unwrap();
    server.stop_server();
    server.start_server(9090).unwrap();

    assert_eq!(server.port(), Some(9090));
    assert_eq!(respond(&runtime, HttpVerb::Get, "/a").code, 404);
    assert_eq!(runtime.local_listener(PORT).unwrap().route_count(), 0);
    assert_eq!(runtime.local_listener(9090).unwrap().route_count(), 1);
}

#[test]
fn route_binder_runs_on_every_start() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let runtime = Arc::new(LocalRuntime::new());
    let mut server = Server::new(runtime.clone()).with_route_binder(move |server: &mut Server| {
        counter.fetch_add(1, Ordering::SeqCst);
        server.bind_route("/health", VerbMask::GET, |_| {
            Server::make_response("ok", "text/plain", 200)
        });
    });

    server.start_server(i32::from(PORT)).unwrap();
    assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/health")), "ok");

    server.stop_server();
    server.start_server(i32::from(PORT)).unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(runtime.local_listener(PORT).unwrap().route_count(), 1);
    assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/health")), "ok");
}

#[test]
fn handler_kind_switch_takes_effect() {
    let (runtime, mut server) = setup();
    let native_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&native_calls);

    server.bind_route("/switch", VerbMask::GET, |_| Response::new(200));
    server.start_server(i32::from(PORT)).unwrap();
    server.bind_route_native("/switch", VerbMask::GET, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let delivery = send(&runtime, WireRequest::new(HttpVerb::Get, "/switch"));
    assert_eq!(delivery, Delivery::Deferred);
    assert_eq!(native_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn path_params_and_headers_reach_handler() {
    let (runtime, mut server) = setup();
    server.bind_route("/users/:id", VerbMask::GET, |req| {
        let text = format!(
            "{}|{}|{}",
            req.path_param("id").unwrap_or_default(),
            req.query("view").unwrap_or_default(),
            req.header("accept").unwrap_or_default(),
        );
        Server::make_response(&text, "text/plain", 200)
    });
    server.start_server(i32::from(PORT)).unwrap();

    let request = WireRequest::new(HttpVerb::Get, "/users/42")
        .query_param("view", "full")
        .header("Accept", "text/plain")
        .header("Accept", "application/json");

    match send(&runtime, request) {
        Delivery::Completed(res) => {
            assert_eq!(body(&res), "42|full|text/plain application/json ");
        }
        Delivery::Deferred => panic!("expected a response"),
    }
}

#[test]
fn invalid_route_path_is_not_bound() {
    let (runtime, mut server) = setup();
    server.start_server(i32::from(PORT)).unwrap();
    server.bind_route("/bad path", VerbMask::GET, |_| Response::new(200));

    assert_eq!(server.bound_route_count(), 0);
    assert_eq!(runtime.local_listener(PORT).unwrap().route_count(), 0);
    assert_eq!(server.verbs_for("/bad path"), Some(VerbMask::GET));
}

#[test]
fn overlapping_patterns_keep_priority_across_restarts() {
    let (runtime, mut server) = setup();
    server.bind_route("/a/:x", VerbMask::GET, |_| {
        Server::make_response("first", "text/plain", 200)
    });
    server.bind_route("/:y/b", VerbMask::GET, |_| {
        Server::make_response("second", "text/plain", 200)
    });
    server.bind_route("/:z/:w", VerbMask::GET, |_| {
        Server::make_response("third", "text/plain", 200)
    });

    for _ in 0..5 {
        server.start_server(i32::from(PORT)).unwrap();
        assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/a/b")), "first");
        assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/c/b")), "second");
        assert_eq!(body(&respond(&runtime, HttpVerb::Get, "/c/d")), "third");
        server.stop_server();
    }
}

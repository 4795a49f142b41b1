//! Hello Server Example
//!
//! Serves an `oxide-http` route table over hyper.
//! Run with: cargo run -p oxide-http --example hello_server -- --port 3000
//! Then try:
//!
//! ```text
//! curl http://localhost:3000/
//! curl http://localhost:3000/users/42?fields=name
//! curl -X POST -d 'hello' http://localhost:3000/echo
//! curl -X POST -d '{"event":"login"}' http://localhost:3000/audit
//! curl http://localhost:3000/health
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_http::{Delivery, HttpVerb, LocalRuntime, Request, Server, VerbMask, WireRequest};

/// Route table demo served over hyper.
#[derive(Parser)]
#[command(name = "hello_server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, env = "OXIDE_HTTP_PORT", default_value_t = 3000)]
    port: u16,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn build_server(runtime: Arc<LocalRuntime>) -> Server {
    let mut server = Server::new(runtime).with_route_binder(|server: &mut Server| {
        server.bind_route("/health", VerbMask::GET, |_| {
            Server::make_response(r#"{"status":"ok"}"#, "application/json", 200)
        });
    });

    server.bind_route("/", VerbMask::GET, |_| {
        Server::make_response("<h1>Hello from oxide-http</h1>", "text/html", 200)
    });

    server.bind_route("/users/:id", VerbMask::GET, |req: Request| {
        let body = serde_json::json!({
            "id": req.path_param("id"),
            "fields": req.query("fields"),
        });
        Server::make_response(&body.to_string(), "application/json", 200)
    });

    server.bind_route("/echo", VerbMask::POST | VerbMask::PUT, |req: Request| {
        Server::make_response(&req.body, "text/plain", 200)
    });

    // Answered out of band; the client sees 202 from the adapter below.
    server.bind_route_native("/audit", VerbMask::POST, |req: Request| {
        match req.json::<serde_json::Value>() {
            Ok(event) => info!(%event, "audit event"),
            Err(err) => warn!(%err, "malformed audit event"),
        }
    });

    server
}

async fn handle_request(
    req: HyperRequest<hyper::body::Incoming>,
    runtime: Arc<LocalRuntime>,
    port: u16,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    // Convert hyper request to the listener's request
    let Some(verb) = HttpVerb::parse(req.method().as_str()) else {
        return Ok(plain(StatusCode::METHOD_NOT_ALLOWED));
    };

    let uri = req.uri().clone();
    let mut wire = WireRequest::new(verb, uri.path());

    if let Some(query) = uri.query() {
        wire.query_params = WireRequest::parse_query_string(query);
    }

    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            wire = wire.header(key.as_str(), v);
        }
    }

    let body_bytes = req
        .collect()
        .await
        .map(|b| b.to_bytes())
        .unwrap_or_default();
    wire.body = body_bytes.to_vec();

    let response = match runtime.dispatch(port, wire) {
        Some(Delivery::Completed(res)) => {
            let mut builder = HyperResponse::builder().status(
                StatusCode::from_u16(res.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            );
            for (name, values) in &res.headers {
                for value in values {
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }
            builder
                .body(Full::new(Bytes::from(res.body)))
                .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Some(Delivery::Deferred) => plain(StatusCode::ACCEPTED),
        None => plain(StatusCode::SERVICE_UNAVAILABLE),
    };

    Ok(response)
}

fn plain(status: StatusCode) -> HyperResponse<Full<Bytes>> {
    let mut response = HyperResponse::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = Arc::new(LocalRuntime::new());
    let mut server = build_server(runtime.clone());
    server.start_server(i32::from(cli.port))?;

    let addr: SocketAddr = ([127, 0, 0, 1], cli.port).into();
    let listener = TcpListener::bind(addr).await?;
    info!("Hello server running at http://{addr}");

    loop {
        let (stream, _) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => break,
        };
        let io = TokioIo::new(stream);
        let runtime = runtime.clone();
        let port = cli.port;

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, runtime.clone(), port));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?err, "error serving connection");
            }
        });
    }

    server.stop_server();
    Ok(())
}

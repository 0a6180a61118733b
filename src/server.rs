//! HTTP transport and graceful shutdown.
//!
//! The server is the boundary between the wire and the pipeline:
//!
//! 1. match the route to a handler name
//! 2. decode path params, query string and a JSON object body into a fresh
//!    [`Context`]
//! 3. run [`Handlers::handle`]
//! 4. settle the result into one [`Response`] and render it
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **SIGINT** the server stops accepting connections, lets
//! every in-flight connection finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::action::{Handled, Outcome};
use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::Error;
use crate::registry::Handlers;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    halt_status: Option<StatusCode>,
}

/// Everything a connection task needs, shared behind one `Arc`.
struct App {
    router: Router,
    handlers: Handlers,
    halt_status: Option<StatusCode>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use railyard::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::Addr(addr.to_owned()))?;
        Ok(Self { addr, halt_status: None })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, Error> {
        Ok(Self { addr: config.socket_addr()?, halt_status: config.halt_status()? })
    }

    /// Status to answer with when a request halts without a response.
    pub fn halt_status(mut self, status: StatusCode) -> Self {
        self.halt_status = Some(status);
        self
    }

    /// Starts accepting connections and dispatching them through `router` to
    /// `handlers`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router, handlers: Handlers) -> Result<(), Error> {
        for name in router.handler_names() {
            if !handlers.contains(name) {
                warn!(handler = name, "route points at an unregistered handler");
            }
        }

        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(App { router, handlers, halt_status: self.halt_status });

        info!(addr = %self.addr, "railyard listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("railyard stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure is answered
/// here, so hyper never sees an error.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Some((handler, params)) = app.router.lookup(req.method(), req.uri().path()) else {
        return Ok(Response::status(StatusCode::NOT_FOUND).render());
    };

    let query = req.uri().query().map(str::to_owned);
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(handler = %handler, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).render());
        }
    };

    let ctx = match decode(params, query.as_deref(), is_json.then_some(&body[..])) {
        Some(ctx) => ctx,
        None => return Ok(Response::status(StatusCode::BAD_REQUEST).render()),
    };

    let result = app.handlers.handle(&handler, ctx).await;
    Ok(settle(&handler, result, app.halt_status).render())
}

/// Builds a request's context. Path params win over query params, which win
/// over JSON body fields. `None` means the JSON body was malformed.
fn decode(
    path_params: Vec<(String, String)>,
    query: Option<&str>,
    json_body: Option<&[u8]>,
) -> Option<Context> {
    let mut ctx = Context::from_params(path_params);

    for (key, value) in query.into_iter().flat_map(parse_query) {
        if !ctx.contains(&key) {
            ctx.insert(key, value);
        }
    }

    if let Some(bytes) = json_body.filter(|b| !b.is_empty()) {
        match serde_json::from_slice::<Value>(bytes).ok()? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    if !ctx.contains(&key) {
                        ctx.insert(key, value);
                    }
                }
            }
            _ => return None,
        }
    }

    Some(ctx)
}

/// `a=1&b=hello+world&c=%2F` → `[("a","1"), ("b","hello world"), ("c","/")]`.
/// Pairs that fail to decode are dropped.
fn parse_query(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    query.split('&').filter(|pair| !pair.is_empty()).filter_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        let k = urlencoding::decode(&k.replace('+', " ")).ok()?.into_owned();
        let v = urlencoding::decode(&v.replace('+', " ")).ok()?.into_owned();
        Some((k, v))
    })
}

/// Turns a pipeline result into exactly one response.
fn settle(handler: &str, result: Handled, halt_status: Option<StatusCode>) -> Response {
    match result {
        Ok(Outcome::Respond(res)) => res,
        Ok(Outcome::Halted { response: Some(res), .. }) => res,
        Ok(Outcome::Halted { by, response: None }) => match halt_status {
            Some(status) => Response::status(status),
            None => {
                error!(handler, halted_by = %by, "request halted without a response and no halt_status is configured");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Err(failure) => {
            error!(
                handler,
                kind = ?failure.kind(),
                origin = ?failure.origin(),
                "unhandled failure: {failure}"
            );
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only on non-Unix).
/// If a handler cannot be installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

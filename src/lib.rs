//! # railyard
//!
//! A minimal HTTP framework in which every request runs through an ordered,
//! interruptible hook pipeline.
//!
//! ## The pipeline
//!
//! Each named [`Handler`] owns, fixed at startup:
//!
//! - **pre-hooks**: guards run in order against the request's [`Context`].
//!   Any of them may return [`Flow::Halt`] and the request stops there.
//! - **wrapping-hooks**: layers around the rest of the chain. Each receives
//!   [`Next`] and decides whether, and how, to delegate inward. It may rewrite
//!   the result or substitute its own, e.g. turning a [`Failure`] into a `500`.
//! - **a terminal action**: the `async fn` doing the work.
//!
//! Hooks are registered explicitly on a [`Registry`], directly or by mounting
//! [`Controller`]s composed from [`Concern`]s, then frozen into [`Handlers`]
//! shared by every request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use railyard::{middleware, Context, Controller, Flow, Registry, Response, Router, Server};
//!
//! fn auth_check(ctx: &mut Context) -> Flow {
//!     if ctx.param("auth_token") == Some("1") {
//!         Flow::Continue
//!     } else {
//!         Flow::halt_with(Response::status(StatusCode::UNAUTHORIZED))
//!     }
//! }
//!
//! async fn index(ctx: Context) -> Response {
//!     let page: u32 = ctx.param_as("index").unwrap_or(1);
//!     Response::json(serde_json::json!({ "page": page }))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let pages = Controller::new("pages")
//!         .around(middleware::catch_all(true))
//!         .before(auth_check)
//!         .action("index", index);
//!
//!     let handlers = Registry::new().mount(&pages).build().unwrap();
//!     let router = Router::new().on(Method::GET, "/pages", "pages#index");
//!
//!     Server::bind("0.0.0.0:3000").unwrap().serve(router, handlers).await.unwrap();
//! }
//! ```

mod action;
mod concern;
mod config;
mod context;
mod error;
mod handler;
mod hook;
mod registry;
mod response;
mod router;
mod server;
mod store;

pub mod health;
pub mod middleware;

pub use action::{Action, BoxFuture, Handled, IntoOutcome, Outcome};
pub use concern::{Concern, Controller};
pub use config::ServerConfig;
pub use context::Context;
pub use error::{ConfigError, Error, Failure, FailureKind, Origin};
pub use handler::Handler;
pub use hook::{Flow, HookId, Next};
pub use registry::{Handlers, Registry};
pub use response::{Body, ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use store::{MemoryStore, Store};

//! A small blog API: an application controller with authentication and
//! error handling, and a pages controller that reads a page index.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example pages
//!   RAILYARD_CONFIG=railyard.toml cargo run --example pages
//!
//! Try:
//!   curl 'http://localhost:3000/users/1/pages?index=1&auth_token=1'
//!   curl 'http://localhost:3000/users/1/pages?index=1'              # 401
//!   curl 'http://localhost:3000/users/9/pages?auth_token=1'         # halted, no response
//!   curl 'http://localhost:3000/users/9?auth_token=1'               # 500 under catch-all
//!   curl http://localhost:3000/healthz

use std::path::Path;
use std::sync::LazyLock;

use http::{Method, StatusCode};
use railyard::{
    health, middleware, Context, Controller, Failure, Flow, MemoryStore, Registry,
    Response, Router, Server, ServerConfig, Store,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

static USERS: LazyLock<MemoryStore<Value>> = LazyLock::new(|| {
    MemoryStore::new("User")
        .with("1", json!({"id": 1, "name": "ada"}))
        .with("2", json!({"id": 2, "name": "grace"}))
});

static POSTS: LazyLock<MemoryStore<Value>> = LazyLock::new(|| {
    MemoryStore::new("Post")
        .with("1", json!({"title": "hello", "page": "1"}))
        .with("2", json!({"title": "again", "page": "1"}))
        .with("3", json!({"title": "later", "page": "2"}))
});

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var_os("RAILYARD_CONFIG") {
        Some(path) => ServerConfig::from_file(Path::new(&path))?,
        None => ServerConfig { catch_all: true, ..ServerConfig::default() },
    };

    let application = Controller::new("application")
        .around(middleware::trace())
        .include(&config.error_handling())
        .before(auth_check);

    let pages = Controller::new("pages")
        .extends(&application)
        .before(get_page_number)
        .action("index", index);

    let users = Controller::new("users")
        .extends(&application)
        .action("show", show_user);

    let handlers = Registry::new()
        .mount(&pages)
        .mount(&users)
        .action("health#liveness", health::liveness)
        .action("health#readiness", health::readiness)
        .build()?;

    let router = Router::new()
        .on(Method::GET, "/users/{user_id}/pages", "pages#index")
        .on(Method::GET, "/users/{user_id}",       "users#show")
        .on(Method::GET, "/healthz",               "health#liveness")
        .on(Method::GET, "/readyz",                "health#readiness");

    Server::from_config(&config)?.serve(router, handlers).await?;
    Ok(())
}

fn auth_check(ctx: &mut Context) -> Flow {
    if ctx.param("auth_token") == Some("1") {
        Flow::Continue
    } else {
        Flow::halt_with(Response::json_ok(json!({"error": "unauthorized"}), StatusCode::UNAUTHORIZED))
    }
}

fn get_page_number(ctx: &mut Context) -> bool {
    if let Some(index) = ctx.get("index").cloned() {
        ctx.insert("page_index", index);
    }
    true
}

// GET /users/{user_id}/pages?index=N
//
// An unknown user yields no response at all. The server answers with
// `halt_status` from the config, or logs it as unhandled when that is unset.
async fn index(ctx: Context) -> Option<Response> {
    USERS.find(ctx.param("user_id")?)?;
    let page = ctx.param("page_index").unwrap_or("1").to_owned();
    let posts = POSTS.filter(&|post| post["page"] == page.as_str());
    Some(Response::json_ok(posts, StatusCode::OK))
}

// GET /users/{user_id}
async fn show_user(ctx: Context) -> Result<Response, Failure> {
    let user = USERS.find_or_fail(ctx.param("user_id").unwrap_or_default())?;
    Ok(Response::json(user))
}

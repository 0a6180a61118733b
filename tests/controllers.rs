//! Controllers composed from concerns, end to end through `Handlers::handle`.

use std::sync::LazyLock;

use http::StatusCode;
use railyard::{
    middleware, Body, Concern, Context, Controller, Failure, FailureKind, Flow, MemoryStore,
    Outcome, Registry, Response, Store,
};
use serde_json::{Value, json};

static USERS: LazyLock<MemoryStore<Value>> = LazyLock::new(|| {
    MemoryStore::new("User")
        .with("1", json!({"id": 1, "name": "ada"}))
        .with("2", json!({"id": 2, "name": "grace"}))
});

static POSTS: LazyLock<MemoryStore<Value>> = LazyLock::new(|| {
    MemoryStore::new("Post")
        .with("10", json!({"title": "first", "page": "1"}))
        .with("11", json!({"title": "second", "page": "2"}))
        .with("12", json!({"title": "third", "page": "1"}))
});

fn auth_check(ctx: &mut Context) -> Flow {
    if ctx.param("auth_token") == Some("1") {
        Flow::Continue
    } else {
        Flow::halt_with(Response::status(StatusCode::UNAUTHORIZED))
    }
}

fn get_page_number(ctx: &mut Context) -> bool {
    if let Some(index) = ctx.get("index").cloned() {
        ctx.insert("page_index", index);
    }
    true
}

/// Posts on the requested page, or nothing at all for an unknown user.
async fn index(ctx: Context) -> Option<Response> {
    let user_id = ctx.param("user_id")?;
    USERS.find(user_id)?;

    let page = ctx.param("page_index").unwrap_or("1").to_owned();
    let posts = POSTS.filter(&|post| post["page"] == page.as_str());
    Some(Response::json_ok(posts, StatusCode::OK))
}

async fn show(ctx: Context) -> Result<Response, Failure> {
    let user = USERS.find_or_fail(ctx.param("user_id").unwrap_or_default())?;
    Ok(Response::json(user))
}

async fn explode(_ctx: Context) -> Result<Response, Failure> {
    Err(Failure::new("database went away"))
}

fn application(catch_all: bool) -> Controller {
    let error_handling = Concern::new("ErrorHandling").around(middleware::catch_all(catch_all));
    Controller::new("application")
        .include(&error_handling)
        .before(auth_check)
}

fn app(catch_all: bool) -> railyard::Handlers {
    let pages = Controller::new("pages")
        .extends(&application(catch_all))
        .before(get_page_number)
        .action("index", index)
        .action("show", show)
        .action("explode", explode);

    let health = Controller::new("health")
        .extends(&application(catch_all))
        .skip_before(auth_check)
        .action("liveness", railyard::health::liveness);

    Registry::new().mount(&pages).mount(&health).build().unwrap()
}

fn authed(params: &[(&str, &str)]) -> Context {
    let mut all = vec![("auth_token", "1")];
    all.extend_from_slice(params);
    Context::from_params(all)
}

#[tokio::test]
async fn index_lists_posts_for_page() {
    let outcome = app(true)
        .handle("pages#index", authed(&[("user_id", "1"), ("index", "1")]))
        .await
        .unwrap();

    let res = outcome.into_response().unwrap();
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(
        res.body(),
        &Body::Json(json!([
            {"title": "first", "page": "1"},
            {"title": "third", "page": "1"},
        ])),
    );
}

#[tokio::test]
async fn unknown_user_halts_without_response() {
    let outcome = app(true)
        .handle("pages#index", authed(&[("user_id", "99"), ("index", "1")]))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Halted { by: "pages#index".into(), response: None });
}

#[tokio::test]
async fn missing_token_is_rejected_before_the_action() {
    let outcome = app(true)
        .handle("pages#index", Context::from_params([("user_id", "1")]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Halted {
            by: "auth_check".into(),
            response: Some(Response::status(StatusCode::UNAUTHORIZED)),
        },
    );
}

#[tokio::test]
async fn not_found_under_catch_all_becomes_500() {
    let outcome = app(true)
        .handle("pages#show", authed(&[("user_id", "404")]))
        .await
        .unwrap();

    let res = outcome.into_response().unwrap();
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), &Body::Json(json!("couldn't find User with id=404")));
}

#[tokio::test]
async fn not_found_without_catch_all_propagates() {
    let failure = app(false)
        .handle("pages#show", authed(&[("user_id", "404")]))
        .await
        .unwrap_err();

    assert_eq!(failure.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn action_failure_respects_catch_all_flag() {
    let caught = app(true).handle("pages#explode", authed(&[])).await.unwrap();
    assert_eq!(
        caught.response().map(Response::status_code),
        Some(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let raised = app(false).handle("pages#explode", authed(&[])).await.unwrap_err();
    assert_eq!(raised.message(), "database went away");
}

#[tokio::test]
async fn skipped_auth_lets_health_through() {
    let handlers = app(true);
    let outcome = handlers.handle("health#liveness", Context::new()).await.unwrap();
    assert_eq!(outcome, Outcome::Respond(Response::text("ok")));
    assert_eq!(
        handlers.get("health#liveness").unwrap().pre_hooks(),
        Vec::<&str>::new(),
    );
}

#[test]
fn resolved_chains_are_inspectable() {
    let handlers = app(true);
    let pages = handlers.get("pages#index").unwrap();
    assert_eq!(pages.pre_hooks(), vec!["auth_check", "get_page_number"]);
    assert_eq!(pages.wrapping_hooks().len(), 1);
    assert_eq!(
        handlers.names(),
        vec!["health#liveness", "pages#explode", "pages#index", "pages#show"],
    );
}

#[test]
fn including_a_concern_twice_duplicates_its_hooks() {
    let auth = Concern::new("Authentication").before(auth_check);
    let twice = Controller::new("admin")
        .include(&auth)
        .extends(&Controller::new("base").include(&auth))
        .action("index", index);

    let handlers = Registry::new().mount(&twice).build().unwrap();
    assert_eq!(
        handlers.get("admin#index").unwrap().pre_hooks(),
        vec!["auth_check", "auth_check"],
    );
    assert_eq!(twice.includes(), ["Authentication", "Authentication"]);
}

fn require(key: &'static str) -> impl Fn(&mut Context) -> Flow + Send + Sync + 'static {
    move |ctx| {
        if ctx.contains(key) {
            Flow::Continue
        } else {
            Flow::halt_with(Response::status(StatusCode::FORBIDDEN))
        }
    }
}

#[tokio::test]
async fn skipping_one_factory_guard_keeps_the_other() {
    let base = Controller::new("base")
        .before_named("auth_token", require("auth_token"))
        .before_named("tenant_id", require("tenant_id"));
    let public = Controller::new("public")
        .extends(&base)
        .skip_before_named("auth_token")
        .action("index", |_ctx: Context| async { "public" });

    let handlers = Registry::new().mount(&public).build().unwrap();
    assert_eq!(handlers.get("public#index").unwrap().pre_hooks(), vec!["tenant_id"]);

    let denied = handlers.handle("public#index", Context::new()).await.unwrap();
    assert_eq!(
        denied,
        Outcome::Halted {
            by: "tenant_id".into(),
            response: Some(Response::status(StatusCode::FORBIDDEN)),
        },
    );

    let allowed = handlers
        .handle("public#index", Context::from_params([("tenant_id", "acme")]))
        .await
        .unwrap();
    assert_eq!(allowed, Outcome::Respond(Response::text("public")));
}

#[test]
fn skipping_a_factory_guard_by_value_is_rejected() {
    let base = Controller::new("base")
        .before(require("auth_token"))
        .before(require("tenant_id"));
    let public = Controller::new("public")
        .extends(&base)
        .skip_before(require("auth_token"))
        .action("index", |_ctx: Context| async { "public" });

    let err = Registry::new().mount(&public).build().unwrap_err();
    assert!(matches!(err, railyard::Error::StatefulSkip { .. }));
}

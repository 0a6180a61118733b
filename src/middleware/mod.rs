//! Built-in wrapping-hooks.
//!
//! Each function returns a hook ready for
//! [`Registry::register_wrapping_hook`](crate::Registry::register_wrapping_hook),
//! [`Controller::around`](crate::Controller::around) or
//! [`Concern::around`](crate::Concern::around):
//!
//! - [`catch_all`] converts failures into `500` responses (or lets them through)
//! - [`trace`] opens a per-request span and logs status and latency
//! - [`timeout`] substitutes `504` when the inner chain takes too long

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use http::StatusCode;
use tracing::{Instrument, error, info, info_span, warn};

use crate::action::{BoxFuture, Outcome};
use crate::context::Context;
use crate::error::Failure;
use crate::hook::Next;
use crate::response::Response;

/// Error handling for everything inside it.
///
/// With `enabled`, a [`Failure`] from the inner chain, or a panic inside it,
/// is logged (message and backtrace) and replaced by a `500` response whose
/// JSON body is the failure message. Without it, failures and panics are
/// passed on untouched.
pub fn catch_all(enabled: bool) -> impl Fn(Context, Next) -> BoxFuture + Clone + Send + Sync + 'static {
    move |ctx, next| {
        let fut: BoxFuture = Box::pin(async move {
            let handler = next.handler().to_owned();
            let result = if enabled {
                AssertUnwindSafe(next.run(ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(Failure::new(panic_message(&*panic))))
            } else {
                next.run(ctx).await
            };
            match result {
                Err(failure) if enabled => {
                    error!(
                        handler = %handler,
                        kind = ?failure.kind(),
                        origin = ?failure.origin(),
                        "caught failure: {failure}"
                    );
                    error!(handler = %handler, "{}", failure.trace());
                    Ok(Outcome::Respond(Response::json_ok(
                        failure.message(),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )))
                }
                other => other,
            }
        });
        fut
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic in request pipeline".to_owned()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Per-request span with the handler name; logs the status (or halt) and
/// latency once the inner chain returns.
pub fn trace() -> impl Fn(Context, Next) -> BoxFuture + Clone + Send + Sync + 'static {
    |ctx, next| {
        let span = info_span!("request", handler = %next.handler());
        let fut: BoxFuture = Box::pin(
            async move {
                let started = Instant::now();
                let result = next.run(ctx).await;
                let latency_ms = millis(started.elapsed());
                match &result {
                    Ok(Outcome::Respond(res)) => {
                        info!(status = res.status_code().as_u16(), latency_ms, "completed");
                    }
                    Ok(Outcome::Halted { by, .. }) => info!(halted_by = %by, latency_ms, "halted"),
                    Err(failure) => info!(error = %failure, latency_ms, "failed"),
                }
                result
            }
            .instrument(span),
        );
        fut
    }
}

/// Races the inner chain against `limit`. On expiry the inner future is
/// dropped and a `504 Gateway Timeout` is substituted.
pub fn timeout(limit: Duration) -> impl Fn(Context, Next) -> BoxFuture + Clone + Send + Sync + 'static {
    move |ctx, next| {
        let fut: BoxFuture = Box::pin(async move {
            let handler = next.handler().to_owned();
            match tokio::time::timeout(limit, next.run(ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(handler = %handler, limit_ms = millis(limit), "timed out");
                    Ok(Outcome::Respond(Response::status(StatusCode::GATEWAY_TIMEOUT)))
                }
            }
        });
        fut
    }
}

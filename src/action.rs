//! Terminal actions and type erasure.
//!
//! # How async actions are stored
//!
//! A [`Registry`](crate::Registry) holds actions of *different* types side by
//! side, so each one is hidden behind a common trait object:
//!
//! ```text
//! async fn index(ctx: Context) -> Response { … }   ← user writes this
//!        ↓ registry.action("pages#index", index)
//! index.into_boxed_action()                        ← Action blanket impl
//!        ↓
//! Arc::new(FnAction(index))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedAction = Arc<dyn ErasedAction>
//! action.call(handler, ctx)  at request time       ← one vtable dispatch
//!        ↓
//! Box::pin(async { index(ctx).await.into_outcome(handler) })
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::context::Context;
use crate::error::Failure;
use crate::response::{IntoResponse, Response};

// ── Outcome ───────────────────────────────────────────────────────────────────

/// How a pipeline run ended, when it did not fail.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The terminal action (or a wrapping-hook standing in for it) produced a
    /// response.
    Respond(Response),
    /// The run stopped early. `by` names the pre-hook that returned
    /// [`Flow::Halt`](crate::Flow::Halt), or the handler whose action chose to
    /// produce nothing. The response is whatever the halting party supplied;
    /// `None` leaves the default to the caller.
    Halted { by: String, response: Option<Response> },
}

impl Outcome {
    /// The response to send, if one was produced or supplied.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Respond(res) => Some(res),
            Self::Halted { response, .. } => response.as_ref(),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Respond(res) => Some(res),
            Self::Halted { response, .. } => response,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }
}

/// The result of running a pipeline, or any inner part of one.
pub type Handled = Result<Outcome, Failure>;

/// A heap-allocated, type-erased future resolving to [`Handled`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Handled> + Send + 'static>>;

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion of an action's return value into a pipeline result.
///
/// `handler` is the name of the handler being run. It is used when an action
/// returns `None` and the run ends without a response.
pub trait IntoOutcome {
    fn into_outcome(self, handler: &str) -> Handled;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self, _: &str) -> Handled { Ok(self) }
}

impl IntoOutcome for Response {
    fn into_outcome(self, _: &str) -> Handled { Ok(Outcome::Respond(self)) }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self, _: &str) -> Handled { Ok(Outcome::Respond(self.into_response())) }
}

impl IntoOutcome for String {
    fn into_outcome(self, _: &str) -> Handled { Ok(Outcome::Respond(self.into_response())) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self, _: &str) -> Handled { Ok(Outcome::Respond(self.into_response())) }
}

/// `None` means "nothing to say": the run halts without a response.
impl<T: IntoResponse> IntoOutcome for Option<T> {
    fn into_outcome(self, handler: &str) -> Handled {
        Ok(match self {
            Some(res) => Outcome::Respond(res.into_response()),
            None => Outcome::Halted { by: handler.to_owned(), response: None },
        })
    }
}

impl<T: IntoOutcome> IntoOutcome for Result<T, Failure> {
    fn into_outcome(self, handler: &str) -> Handled {
        self?.into_outcome(handler)
    }
}

// ── Action ────────────────────────────────────────────────────────────────────

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedAction {
    fn call(&self, handler: Arc<str>, ctx: Context) -> BoxFuture;
}

/// A type-erased action shared across concurrent requests.
#[doc(hidden)]
pub type BoxedAction = Arc<dyn ErasedAction + Send + Sync + 'static>;

/// Implemented for every valid terminal action.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape:
///
/// ```text
/// async fn name(ctx: Context) -> impl IntoOutcome
/// ```
pub trait Action: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_action(self) -> BoxedAction;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Action for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_action(self) -> BoxedAction {
        Arc::new(FnAction(self))
    }
}

/// Bridges a concrete action `F` to the trait-object world.
struct FnAction<F>(F);

impl<F, Fut, R> ErasedAction for FnAction<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, handler: Arc<str>, ctx: Context) -> BoxFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_outcome(&handler) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_halts_with_handler_name() {
        let outcome = None::<Response>.into_outcome("pages#index").unwrap();
        assert_eq!(outcome, Outcome::Halted { by: "pages#index".into(), response: None });
        assert!(outcome.response().is_none());
    }

    #[test]
    fn err_propagates() {
        let result: Result<Response, Failure> = Err(Failure::new("boom"));
        let err = result.into_outcome("h").unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn status_becomes_empty_response() {
        let outcome = StatusCode::NO_CONTENT.into_outcome("h").unwrap();
        assert_eq!(outcome.into_response(), Some(Response::status(StatusCode::NO_CONTENT)));
    }

    #[tokio::test]
    async fn boxed_action_runs() {
        async fn hello(ctx: Context) -> String {
            format!("hello {}", ctx.param("name").unwrap_or("nobody"))
        }
        let action = hello.into_boxed_action();
        let outcome = action
            .call(Arc::from("greet"), Context::from_params([("name", "ada")]))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Respond(Response::text("hello ada")));
    }
}

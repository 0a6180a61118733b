//! Built-in health-check actions.
//!
//! | Probe | Suggested route | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them like any other action. They usually sit outside the
//! authenticated controllers, so no pre-hook can halt them:
//!
//! ```rust
//! use http::Method;
//! use railyard::{health, Registry, Router};
//!
//! let handlers = Registry::new()
//!     .action("health#liveness", health::liveness)
//!     .action("health#readiness", health::readiness)
//!     .build()
//!     .unwrap();
//!
//! let router = Router::new()
//!     .on(Method::GET, "/healthz", "health#liveness")
//!     .on(Method::GET, "/readyz", "health#readiness");
//! ```

use crate::{Context, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_ctx: Context) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it with your own action when
/// readiness depends on a database or a downstream service.
pub async fn readiness(_ctx: Context) -> Response {
    Response::text("ready")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, Registry};

    #[tokio::test]
    async fn probes_answer() {
        let handlers = Registry::new()
            .action("live", liveness)
            .action("ready", readiness)
            .build()
            .unwrap();
        let live = handlers.handle("live", Context::new()).await.unwrap();
        let ready = handlers.handle("ready", Context::new()).await.unwrap();
        assert_eq!(live, Outcome::Respond(Response::text("ok")));
        assert_eq!(ready, Outcome::Respond(Response::text("ready")));
    }
}

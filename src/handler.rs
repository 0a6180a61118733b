//! A resolved handler: a name, its frozen hook lists and its terminal action.
//!
//! # Execution
//!
//! ```text
//! handle(ctx)
//!   ├─ pre-hook 1 ── Halt? ──► Outcome::Halted (nothing else runs)
//!   ├─ pre-hook 2
//!   │   …
//!   └─ wrap 1 ─► wrap 2 ─► … ─► action
//!      wrap 1 ◄─ wrap 2 ◄─ … ◄──┘
//! ```
//!
//! Pre-hooks run in registration order against the same `&mut Context`, so a
//! value written by one is visible to every later hook and to the action.
//! Wrapping-hooks nest like parentheses: opened in registration order, closed
//! in reverse.

use std::sync::Arc;

use tracing::debug;

use crate::action::{BoxedAction, Handled, Outcome};
use crate::context::Context;
use crate::hook::{Flow, HookId, Next, PreEntry, WrapEntry};

/// A handler ready to serve requests. Immutable; cheap to clone.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    pre: Arc<[PreEntry]>,
    wraps: Arc<[WrapEntry]>,
    action: BoxedAction,
    duplicates: Arc<[(HookId, usize)]>,
}

impl Handler {
    pub(crate) fn new(
        name: &str,
        pre: Vec<PreEntry>,
        wraps: Vec<WrapEntry>,
        action: BoxedAction,
        duplicates: Vec<(HookId, usize)>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            pre: pre.into(),
            wraps: wraps.into(),
            action,
            duplicates: duplicates.into(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Pre-hook names in execution order.
    pub fn pre_hooks(&self) -> Vec<&'static str> {
        self.pre.iter().map(|e| e.id.name()).collect()
    }

    /// Wrapping-hook names, outermost first.
    pub fn wrapping_hooks(&self) -> Vec<&'static str> {
        self.wraps.iter().map(|e| e.id.name()).collect()
    }

    /// Hooks registered more than once, with how many times each runs.
    pub fn duplicate_hooks(&self) -> Vec<(&'static str, usize)> {
        self.duplicates.iter().map(|(id, count)| (id.name(), *count)).collect()
    }

    /// Runs one request through the pipeline.
    ///
    /// Returns `Ok(Outcome::Halted { .. })` when a pre-hook stops the run, the
    /// action's (possibly wrapped) result otherwise. A [`Failure`] nobody
    /// intercepted comes back as `Err`, unmodified.
    ///
    /// [`Failure`]: crate::Failure
    pub async fn handle(&self, mut ctx: Context) -> Handled {
        for entry in self.pre.iter() {
            if let Flow::Halt(response) = entry.hook.check(&mut ctx) {
                debug!(
                    handler = %self.name,
                    hook = entry.id.name(),
                    with_response = response.is_some(),
                    "halted by pre-hook"
                );
                return Ok(Outcome::Halted { by: entry.id.name().to_owned(), response });
            }
        }

        Next::new(Arc::clone(&self.name), Arc::clone(&self.wraps), Arc::clone(&self.action))
            .run(ctx)
            .await
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("pre", &self.pre_hooks())
            .field("wraps", &self.wrapping_hooks())
            .finish_non_exhaustive()
    }
}

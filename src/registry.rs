//! Startup-time hook registration and the frozen handler table.
//!
//! ```rust
//! use railyard::{Context, Registry, Response};
//!
//! fn auth_check(ctx: &mut Context) -> bool {
//!     ctx.param("auth_token") == Some("1")
//! }
//!
//! async fn index(_ctx: Context) -> Response {
//!     Response::text("pages")
//! }
//!
//! let handlers = Registry::new()
//!     .action("pages#index", index)
//!     .register_pre_hook("pages#index", auth_check)
//!     .build()
//!     .unwrap();
//! ```
//!
//! [`Registry`] is mutable and single-threaded. [`Registry::build`] resolves
//! it into [`Handlers`], which is read-only and shared by every request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::action::{Action, BoxedAction, Handled};
use crate::concern::Controller;
use crate::context::Context;
use crate::error::{Error, Failure};
use crate::handler::Handler;
use crate::hook::{Flow, HookId, Next, PreEntry, WrapEntry, pre_hook_id};

/// Everything registered against one handler name, not yet resolved.
#[derive(Default)]
struct Draft {
    pre: Vec<PreEntry>,
    wraps: Vec<WrapEntry>,
    skips: Vec<HookId>,
    action: Option<BoxedAction>,
}

/// Collects handlers and their hooks at startup.
///
/// Every method returns `self` so registrations chain. Order of registration
/// is order of execution.
#[derive(Default)]
pub struct Registry {
    drafts: HashMap<String, Draft>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the terminal action for `handler`, replacing any previous one.
    pub fn action(mut self, handler: &str, action: impl Action) -> Self {
        self.draft(handler).action = Some(action.into_boxed_action());
        self
    }

    /// Appends a pre-hook to `handler`.
    ///
    /// Registering the same hook twice makes it run twice.
    pub fn register_pre_hook<F, R>(mut self, handler: &str, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.draft(handler).pre.push(PreEntry::new(hook));
        self
    }

    /// Appends a pre-hook identified by `name` instead of by its type.
    ///
    /// Use this for hooks built by a factory (`require("auth_token")`) that
    /// must be skippable with [`skip_named_pre_hook`](Registry::skip_named_pre_hook).
    pub fn register_named_pre_hook<F, R>(
        mut self,
        handler: &str,
        name: &'static str,
        hook: F,
    ) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.draft(handler).pre.push(PreEntry::named(name, hook));
        self
    }

    /// Appends a wrapping-hook to `handler`. The first one registered is the
    /// outermost.
    pub fn register_wrapping_hook<F, Fut>(mut self, handler: &str, hook: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Handled> + Send + 'static,
    {
        self.draft(handler).wraps.push(WrapEntry::new(hook));
        self
    }

    /// Removes every occurrence of `hook` from `handler`'s pre-hooks when the
    /// registry is built. Naming a hook the handler never had is an error, and
    /// so is passing a closure that captures state: skip those by name.
    pub fn skip_pre_hook<F, R>(mut self, handler: &str, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + 'static,
    {
        self.draft(handler).skips.push(pre_hook_id(&hook));
        self
    }

    /// Removes every pre-hook registered under `name`.
    pub fn skip_named_pre_hook(mut self, handler: &str, name: &'static str) -> Self {
        self.draft(handler).skips.push(HookId::named(name));
        self
    }

    /// Registers every action of `controller` as `"<controller>#<action>"`,
    /// each with the controller's resolved hook lists.
    pub fn mount(mut self, controller: &Controller) -> Self {
        for (action, boxed) in controller.actions() {
            let draft = self.draft(&format!("{}#{action}", controller.name()));
            draft.pre.extend(controller.pre().iter().cloned());
            draft.wraps.extend(controller.wraps().iter().cloned());
            draft.skips.extend(controller.skips().iter().copied());
            draft.action = Some(Arc::clone(boxed));
        }
        self
    }

    /// Resolves skips, flags duplicate hooks and freezes the table.
    pub fn build(self) -> Result<Handlers, Error> {
        let mut table = HashMap::with_capacity(self.drafts.len());

        for (name, draft) in self.drafts {
            let Draft { mut pre, wraps, skips, action } = draft;
            let action = action.ok_or_else(|| Error::MissingAction(name.clone()))?;

            for skip in &skips {
                if skip.is_stateful() {
                    return Err(Error::StatefulSkip { handler: name, hook: skip.name() });
                }
                if !pre.iter().any(|e| e.id == *skip) {
                    return Err(Error::UnknownSkip { handler: name, hook: skip.name() });
                }
            }
            pre.retain(|e| !skips.contains(&e.id));

            let mut duplicates = count_duplicates(pre.iter().map(|e| e.id));
            duplicates.extend(count_duplicates(wraps.iter().map(|e| e.id)));
            for (id, count) in &duplicates {
                warn!(handler = %name, hook = id.name(), count, "hook registered more than once");
            }

            let handler = Handler::new(&name, pre, wraps, action, duplicates);
            table.insert(name, handler);
        }

        Ok(Handlers { table: Arc::new(table) })
    }

    fn draft(&mut self, handler: &str) -> &mut Draft {
        self.drafts.entry(handler.to_owned()).or_default()
    }
}

/// Hooks present more than once, with their counts, in first-seen order.
/// Duplicates are kept (the hook runs once per registration) but flagged.
fn count_duplicates(ids: impl Iterator<Item = HookId>) -> Vec<(HookId, usize)> {
    let mut seen: Vec<(HookId, usize)> = Vec::new();
    for id in ids {
        match seen.iter_mut().find(|(s, _)| *s == id) {
            Some((_, count)) => *count += 1,
            None => seen.push((id, 1)),
        }
    }
    seen.retain(|(_, count)| *count > 1);
    seen
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// The frozen handler table. Clone it freely; clones share one table.
#[derive(Clone, Debug)]
pub struct Handlers {
    table: Arc<HashMap<String, Handler>>,
}

impl Handlers {
    /// Runs `ctx` through the pipeline of the handler named `handler`.
    pub async fn handle(&self, handler: &str, ctx: Context) -> Handled {
        match self.table.get(handler) {
            Some(h) => h.handle(ctx).await,
            None => Err(Failure::unknown_handler(handler)),
        }
    }

    pub fn get(&self, handler: &str) -> Option<&Handler> {
        self.table.get(handler)
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.table.contains_key(handler)
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

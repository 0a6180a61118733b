//! Concerns and controllers: named bundles of hooks, composed at startup.
//!
//! A [`Concern`] is a reusable set of hooks (authentication gating, error
//! handling, …). A [`Controller`] groups actions that share hooks. It can
//! inherit another controller's hooks and include concerns:
//!
//! ```rust
//! use railyard::{middleware, Concern, Context, Controller, Registry, Response};
//!
//! fn auth_check(ctx: &mut Context) -> bool {
//!     ctx.param("auth_token") == Some("1")
//! }
//!
//! async fn index(_ctx: Context) -> Response { Response::text("pages") }
//!
//! let error_handling = Concern::new("ErrorHandling").around(middleware::catch_all(true));
//!
//! let application = Controller::new("application")
//!     .include(&error_handling)
//!     .before(auth_check);
//!
//! let pages = Controller::new("pages")
//!     .extends(&application)
//!     .action("index", index);
//!
//! let handlers = Registry::new().mount(&pages).build().unwrap();
//! assert!(handlers.contains("pages#index"));
//! ```
//!
//! Composition is explicit and happens once: declarations are copied in the
//! order they are written, so a concern included twice contributes its hooks
//! twice.

use std::future::Future;

use crate::action::{Action, BoxedAction, Handled};
use crate::context::Context;
use crate::hook::{Flow, HookId, Next, PreEntry, WrapEntry, pre_hook_id};

/// A named, reusable bundle of hooks.
#[derive(Clone)]
pub struct Concern {
    name: String,
    pre: Vec<PreEntry>,
    wraps: Vec<WrapEntry>,
}

impl Concern {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), pre: Vec::new(), wraps: Vec::new() }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Adds a pre-hook.
    pub fn before<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.pre.push(PreEntry::new(hook));
        self
    }

    /// Adds a pre-hook identified by `name`, so controllers can skip it with
    /// [`Controller::skip_before_named`].
    pub fn before_named<F, R>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.pre.push(PreEntry::named(name, hook));
        self
    }

    /// Adds a wrapping-hook.
    pub fn around<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Handled> + Send + 'static,
    {
        self.wraps.push(WrapEntry::new(hook));
        self
    }
}

/// A group of actions sharing one resolved hook chain.
#[derive(Clone)]
pub struct Controller {
    name: String,
    pre: Vec<PreEntry>,
    wraps: Vec<WrapEntry>,
    skips: Vec<HookId>,
    includes: Vec<String>,
    actions: Vec<(String, BoxedAction)>,
}

impl Controller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre: Vec::new(),
            wraps: Vec::new(),
            skips: Vec::new(),
            includes: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Inherits `parent`'s hooks, skips and included concerns. The parent's
    /// hooks run before anything this controller declares, wherever `extends`
    /// appears in the chain. Actions are not inherited.
    pub fn extends(mut self, parent: &Controller) -> Self {
        self.pre.splice(0..0, parent.pre.iter().cloned());
        self.wraps.splice(0..0, parent.wraps.iter().cloned());
        self.skips.splice(0..0, parent.skips.iter().copied());
        self.includes.splice(0..0, parent.includes.iter().cloned());
        self
    }

    /// Appends `concern`'s hooks at this point in the declaration order.
    pub fn include(mut self, concern: &Concern) -> Self {
        self.pre.extend(concern.pre.iter().cloned());
        self.wraps.extend(concern.wraps.iter().cloned());
        self.includes.push(concern.name.clone());
        self
    }

    pub fn before<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.pre.push(PreEntry::new(hook));
        self
    }

    /// Adds a pre-hook identified by `name` rather than by its type.
    pub fn before_named<F, R>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        self.pre.push(PreEntry::named(name, hook));
        self
    }

    pub fn around<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Handled> + Send + 'static,
    {
        self.wraps.push(WrapEntry::new(hook));
        self
    }

    /// Drops an inherited (or included) pre-hook from every action of this
    /// controller. `hook` must be a `fn` item or a non-capturing closure; a
    /// closure with captured state fails the build with
    /// [`Error::StatefulSkip`](crate::Error::StatefulSkip).
    pub fn skip_before<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + 'static,
    {
        self.skips.push(pre_hook_id(&hook));
        self
    }

    /// Drops every pre-hook registered under `name` with `before_named`.
    pub fn skip_before_named(mut self, name: &'static str) -> Self {
        self.skips.push(HookId::named(name));
        self
    }

    pub fn action(mut self, name: impl Into<String>, action: impl Action) -> Self {
        self.actions.push((name.into(), action.into_boxed_action()));
        self
    }

    pub fn name(&self) -> &str { &self.name }

    /// Names of included concerns, inherited ones first.
    pub fn includes(&self) -> &[String] { &self.includes }

    pub(crate) fn pre(&self) -> &[PreEntry] { &self.pre }
    pub(crate) fn wraps(&self) -> &[WrapEntry] { &self.wraps }
    pub(crate) fn skips(&self) -> &[HookId] { &self.skips }

    pub(crate) fn actions(&self) -> impl Iterator<Item = (&str, &BoxedAction)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action))
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("includes", &self.includes)
            .field("actions", &self.actions.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn auth_check(_: &mut Context) -> bool { true }
    fn get_page_number(ctx: &mut Context) -> bool {
        if let Some(index) = ctx.param("index").map(str::to_owned) {
            ctx.insert("page_index", index);
        }
        true
    }

    async fn index(_: Context) -> &'static str { "index" }
    async fn show(_: Context) -> &'static str { "show" }

    fn application() -> Controller {
        Controller::new("application").before(auth_check)
    }

    #[test]
    fn parent_hooks_come_first() {
        let pages = Controller::new("pages")
            .before(get_page_number)
            .extends(&application())
            .action("index", index);
        let handlers = Registry::new().mount(&pages).build().unwrap();
        assert_eq!(
            handlers.get("pages#index").unwrap().pre_hooks(),
            vec!["auth_check", "get_page_number"],
        );
    }

    #[test]
    fn every_action_is_mounted() {
        let pages = Controller::new("pages")
            .extends(&application())
            .action("index", index)
            .action("show", show);
        let handlers = Registry::new().mount(&pages).build().unwrap();
        assert_eq!(handlers.names(), vec!["pages#index", "pages#show"]);
    }

    #[test]
    fn skip_before_drops_inherited_hook() {
        let health = Controller::new("health")
            .extends(&application())
            .skip_before(auth_check)
            .action("index", index);
        let handlers = Registry::new().mount(&health).build().unwrap();
        assert!(handlers.get("health#index").unwrap().pre_hooks().is_empty());
    }

    #[test]
    fn concern_included_twice_runs_twice() {
        let auth = Concern::new("Auth").before(auth_check);
        let pages = Controller::new("pages")
            .include(&auth)
            .include(&auth)
            .action("index", index);
        assert_eq!(pages.includes(), ["Auth", "Auth"]);
        let handlers = Registry::new().mount(&pages).build().unwrap();
        assert_eq!(
            handlers.get("pages#index").unwrap().pre_hooks(),
            vec!["auth_check", "auth_check"],
        );
    }

    fn require(key: &'static str) -> impl Fn(&mut Context) -> bool + Send + Sync + 'static {
        move |ctx| ctx.contains(key)
    }

    #[test]
    fn skip_before_named_keeps_sibling_factory_guard() {
        let base = Controller::new("base")
            .before_named("auth_token", require("auth_token"))
            .before_named("tenant_id", require("tenant_id"));
        let child = Controller::new("child")
            .extends(&base)
            .skip_before_named("auth_token")
            .action("index", index);
        let handlers = Registry::new().mount(&child).build().unwrap();
        assert_eq!(handlers.get("child#index").unwrap().pre_hooks(), vec!["tenant_id"]);
    }

    #[test]
    fn skip_before_rejects_stateful_closure() {
        let base = Controller::new("base")
            .before(require("auth_token"))
            .before(require("tenant_id"));
        let child = Controller::new("child")
            .extends(&base)
            .skip_before(require("auth_token"))
            .action("index", index);
        let err = Registry::new().mount(&child).build().unwrap_err();
        assert!(matches!(err, crate::Error::StatefulSkip { .. }));
    }

    #[test]
    fn inherited_factory_guards_are_not_duplicates() {
        let base = Controller::new("base")
            .before(require("auth_token"))
            .before(require("tenant_id"));
        let child = Controller::new("child").extends(&base).action("index", index);
        let handlers = Registry::new().mount(&child).build().unwrap();
        let handler = handlers.get("child#index").unwrap();
        assert_eq!(handler.pre_hooks().len(), 2);
        assert!(handler.duplicate_hooks().is_empty());
    }

    #[test]
    fn actions_are_not_inherited() {
        let parent = Controller::new("application").action("index", index);
        let child = Controller::new("pages").extends(&parent);
        assert_eq!(child.actions().count(), 0);
        assert_eq!(parent.actions().count(), 1);
    }
}

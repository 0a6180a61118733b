//! Pre-hooks, wrapping-hooks and the [`Next`] continuation.
//!
//! A pre-hook is a guard: `Fn(&mut Context) -> Flow` (or `-> bool`). It runs
//! before anything else and may stop the request.
//!
//! A wrapping-hook surrounds the rest of the pipeline:
//!
//! ```rust
//! use railyard::{Context, Handled, Next};
//!
//! async fn stamp(mut ctx: Context, next: Next) -> Handled {
//!     ctx.insert("stamped", true);
//!     let outcome = next.run(ctx).await;
//!     // inspect, replace or pass through
//!     outcome
//! }
//! ```
//!
//! [`Next::run`] takes `self`, so a hook can delegate inward at most once.
//! Not calling it at all means substituting its own result.

use std::any::{TypeId, type_name};
use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::action::{BoxFuture, BoxedAction, Handled};
use crate::context::Context;
use crate::response::Response;

// ── Flow ──────────────────────────────────────────────────────────────────────

/// A pre-hook's verdict.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    /// Stop here. The terminal action will not run. The optional response is
    /// the halting hook's answer; `None` leaves the default to the caller.
    Halt(Option<Response>),
}

impl Flow {
    pub fn halt() -> Self { Self::Halt(None) }
    pub fn halt_with(res: Response) -> Self { Self::Halt(Some(res)) }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Continue } else { Self::Halt(None) }
    }
}

// ── Hook identity ─────────────────────────────────────────────────────────────

/// Identity of a registered hook.
///
/// - A hook without captured state (a `fn` item or a non-capturing closure)
///   is identified by its type. Registering `auth_check` twice registers the
///   same hook twice.
/// - A closure that captures state gets a fresh identity per registration.
///   `require("auth_token")` and `require("tenant_id")` never compare equal,
///   even though they share a type. Clones of a registered entry (through
///   [`Controller::extends`](crate::Controller::extends) or a concern
///   included twice) keep the identity of the original.
/// - A hook registered under an explicit name is identified by that name.
#[derive(Clone, Copy)]
pub struct HookId {
    key: Key,
    name: &'static str,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Key {
    Type(TypeId),
    Named(&'static str),
    Serial(u64),
}

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

impl HookId {
    pub(crate) fn of<F: 'static>() -> Self {
        let name = short_name(type_name::<F>());
        let key = if mem::size_of::<F>() == 0 {
            Key::Type(TypeId::of::<F>())
        } else {
            Key::Serial(NEXT_SERIAL.fetch_add(1, Ordering::Relaxed))
        };
        Self { key, name }
    }

    pub(crate) fn named(name: &'static str) -> Self {
        Self { key: Key::Named(name), name }
    }

    /// Display name, e.g. `auth_check`.
    pub fn name(&self) -> &'static str { self.name }

    /// Whether this identity is unique to one registration of a stateful
    /// closure. Such a hook can only be skipped by name.
    pub(crate) fn is_stateful(&self) -> bool {
        matches!(self.key, Key::Serial(_))
    }
}

impl PartialEq for HookId {
    fn eq(&self, other: &Self) -> bool { self.key == other.key }
}

impl Eq for HookId {}

impl fmt::Debug for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// `my_app::controllers::auth_check` → `auth_check`,
/// `my_app::has::<alloc::string::String>` → `has`. Closures keep their
/// enclosing path (`build_app::{{closure}}`), which is the most useful label
/// available for them.
fn short_name(full: &'static str) -> &'static str {
    if full.ends_with("}}") {
        return full;
    }
    let path = full.find('<').map_or(full, |i| &full[..i]);
    let path = path.strip_suffix("::").unwrap_or(path);
    path.rsplit("::").next().unwrap_or(path)
}

// ── Pre-hooks ─────────────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedPreHook {
    fn check(&self, ctx: &mut Context) -> Flow;
}

/// A registered pre-hook: identity plus erased function.
#[derive(Clone)]
pub(crate) struct PreEntry {
    pub(crate) id: HookId,
    pub(crate) hook: Arc<dyn ErasedPreHook + Send + Sync + 'static>,
}

impl PreEntry {
    pub(crate) fn new<F, R>(hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        Self { id: HookId::of::<F>(), hook: Arc::new(FnPreHook(hook)) }
    }

    pub(crate) fn named<F, R>(name: &'static str, hook: F) -> Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow> + 'static,
    {
        Self { id: HookId::named(name), hook: Arc::new(FnPreHook(hook)) }
    }
}

struct FnPreHook<F>(F);

impl<F, R> ErasedPreHook for FnPreHook<F>
where
    F: Fn(&mut Context) -> R,
    R: Into<Flow>,
{
    fn check(&self, ctx: &mut Context) -> Flow {
        (self.0)(ctx).into()
    }
}

/// The identity a pre-hook would be registered under. Used to name a hook
/// for skipping without registering it. For a stateful closure this is a
/// fresh identity that matches nothing.
pub(crate) fn pre_hook_id<F, R>(_: &F) -> HookId
where
    F: Fn(&mut Context) -> R + 'static,
{
    HookId::of::<F>()
}

// ── Wrapping-hooks ────────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedWrapHook {
    fn call(&self, ctx: Context, next: Next) -> BoxFuture;
}

/// A registered wrapping-hook.
#[derive(Clone)]
pub(crate) struct WrapEntry {
    pub(crate) id: HookId,
    pub(crate) hook: Arc<dyn ErasedWrapHook + Send + Sync + 'static>,
}

impl WrapEntry {
    pub(crate) fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Handled> + Send + 'static,
    {
        Self { id: HookId::of::<F>(), hook: Arc::new(FnWrapHook(hook)) }
    }
}

struct FnWrapHook<F>(F);

impl<F, Fut> ErasedWrapHook for FnWrapHook<F>
where
    F: Fn(Context, Next) -> Fut,
    Fut: Future<Output = Handled> + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> BoxFuture {
        Box::pin((self.0)(ctx, next))
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the pipeline, as seen from inside a wrapping-hook.
///
/// Layers nest in registration order: the first-registered wrapping-hook is
/// outermost and the terminal action is innermost.
pub struct Next {
    handler: Arc<str>,
    wraps: Arc<[WrapEntry]>,
    depth: usize,
    action: BoxedAction,
}

impl Next {
    pub(crate) fn new(handler: Arc<str>, wraps: Arc<[WrapEntry]>, action: BoxedAction) -> Self {
        Self { handler, wraps, depth: 0, action }
    }

    /// Name of the handler this run belongs to.
    pub fn handler(&self) -> &str { &self.handler }

    /// Runs the next inner layer and returns its result.
    pub async fn run(self, ctx: Context) -> Handled {
        let hook = self.wraps.get(self.depth).map(|entry| Arc::clone(&entry.hook));
        match hook {
            Some(hook) => {
                let inner = Self { depth: self.depth + 1, ..self };
                hook.call(ctx, inner).await
            }
            None => self.action.call(self.handler, ctx).await,
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("handler", &self.handler)
            .field("remaining", &self.wraps.get(self.depth..).unwrap_or_default())
            .finish()
    }
}

impl fmt::Debug for WrapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.id, f)
    }
}

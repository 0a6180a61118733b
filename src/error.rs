//! Error types.
//!
//! Two families live here and they never mix:
//!
//! - [`Error`] and [`ConfigError`] are infrastructure failures: a port that
//!   will not bind, a config file that will not parse, a registry that cannot
//!   be frozen. They surface at startup.
//! - [`Failure`] is what a pipeline run produces when the terminal action (or
//!   a hook) gives up on a request. Wrapping-hooks may intercept it and turn it
//!   into a [`Response`](crate::Response); otherwise it reaches the caller of
//!   [`Handlers::handle`](crate::Handlers::handle).

use std::backtrace::Backtrace;
use std::fmt;

/// The error type returned by railyard's fallible startup operations.
///
/// Application-level outcomes (404, 422, etc.) are expressed as
/// [`Response`](crate::Response) values and per-request failures as
/// [`Failure`]s, not as `Error`s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    /// Hooks were registered for a handler that never received an action.
    #[error("handler `{0}` has hooks but no action")]
    MissingAction(String),

    /// A skip named a pre-hook the handler never had.
    #[error("handler `{handler}` skips `{hook}`, which it does not have")]
    UnknownSkip { handler: String, hook: &'static str },

    /// A skip was given a closure that captures state. Each such closure is
    /// its own hook, so it cannot name one registered elsewhere.
    #[error("handler `{handler}` skips stateful closure `{hook}`; register it with a name and skip by name")]
    StatefulSkip { handler: String, hook: &'static str },
}

/// Failure to load or validate a [`ServerConfig`](crate::ServerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

// ── Failure ───────────────────────────────────────────────────────────────────

/// What went wrong during a pipeline run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The terminal action (or a hook) raised an unexpected error.
    Action,
    /// A lookup through a [`Store`](crate::Store) yielded no record.
    NotFound,
    /// `handle` was called with a handler name that was never registered.
    UnknownHandler,
}

/// Where a [`Failure`] was raised.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Action,
    Hook,
    Store,
    Pipeline,
}

/// A classified per-request error carrying a message and an origin marker.
///
/// A backtrace is captured on construction (subject to `RUST_BACKTRACE`, like
/// any [`Backtrace::capture`]) so that a catch-all hook can log it.
pub struct Failure {
    kind: FailureKind,
    origin: Origin,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    trace: Backtrace,
}

impl Failure {
    /// A failure raised by a terminal action.
    pub fn new(message: impl Into<String>) -> Self {
        Self::build(FailureKind::Action, Origin::Action, message.into())
    }

    /// A failure raised by a hook rather than by the terminal action.
    pub fn from_hook(message: impl Into<String>) -> Self {
        Self::build(FailureKind::Action, Origin::Hook, message.into())
    }

    /// A lookup for `entity` with id `id` found nothing.
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::build(
            FailureKind::NotFound,
            Origin::Store,
            format!("couldn't find {entity} with id={id}"),
        )
    }

    pub(crate) fn unknown_handler(name: &str) -> Self {
        Self::build(
            FailureKind::UnknownHandler,
            Origin::Pipeline,
            format!("no handler named `{name}`"),
        )
    }

    /// Wraps an arbitrary error raised inside a terminal action. The message
    /// is the error's `Display` output; the error itself becomes the source.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut failure = Self::new(err.to_string());
        failure.source = Some(Box::new(err));
        failure
    }

    fn build(kind: FailureKind, origin: Origin, message: String) -> Self {
        Self { kind, origin, message, source: None, trace: Backtrace::capture() }
    }

    pub fn kind(&self) -> FailureKind { self.kind }
    pub fn origin(&self) -> Origin { self.origin }
    pub fn message(&self) -> &str { &self.message }
    pub fn trace(&self) -> &Backtrace { &self.trace }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("message", &self.message)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_message_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let failure = Failure::wrap(io);
        assert_eq!(failure.message(), "disk on fire");
        assert_eq!(failure.kind(), FailureKind::Action);
        assert!(std::error::Error::source(&failure).is_some());
    }

    #[test]
    fn not_found_is_classified() {
        let failure = Failure::not_found("User", "7");
        assert_eq!(failure.kind(), FailureKind::NotFound);
        assert_eq!(failure.origin(), Origin::Store);
        assert_eq!(failure.to_string(), "couldn't find User with id=7");
    }

    #[test]
    fn hook_failures_carry_hook_origin() {
        assert_eq!(Failure::from_hook("nope").origin(), Origin::Hook);
        assert_eq!(Failure::new("nope").origin(), Origin::Action);
    }
}

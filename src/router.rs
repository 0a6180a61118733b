//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A route resolves to the
//! *name* of a handler in [`Handlers`](crate::Handlers); the hooks and action
//! live there, not here.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

/// The application router. Build it once at startup and pass it to
/// [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<str>>>,
    targets: Vec<Arc<str>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), targets: Vec::new() }
    }

    /// Routes `method` + `path` to the handler named `handler`. Returns `self`
    /// for chaining.
    ///
    /// Path parameters use `{name}` syntax and land in the request's
    /// [`Context`](crate::Context):
    ///
    /// ```rust
    /// # use http::Method;
    /// # use railyard::Router;
    /// Router::new()
    ///     .on(Method::GET, "/pages",           "pages#index")
    ///     .on(Method::GET, "/users/{user_id}", "users#show");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: &str) -> Self {
        let handler: Arc<str> = Arc::from(handler);
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::clone(&handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.targets.push(handler);
        self
    }

    /// Handler names this router can dispatch to, sorted and deduplicated.
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.iter().map(|t| &**t).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<str>, Vec<(String, String)>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

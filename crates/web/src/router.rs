//! First-match routing.
//!
//! A [`Router`] is an ordered list of [`Route`]s. A request is dispatched to the
//! first route whose pattern accepts its path; later routes are never consulted.

use std::fmt;
use std::sync::Arc;

use crate::view::{BoxError, View};

/// How a route pattern is compared with a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The path must equal the pattern.
    Exact,
    /// The path must start with the pattern.
    Prefix,
}

type ViewFactory = dyn Fn() -> Result<Box<dyn View>, BoxError> + Send + Sync;

/// Where a route gets its [`View`] from.
#[derive(Clone)]
pub enum ViewBinding {
    /// One instance shared by every request.
    Shared(Arc<dyn View>),
    /// A fresh instance per request.
    Factory(Arc<ViewFactory>),
}

impl ViewBinding {
    pub fn shared<V: View + 'static>(view: V) -> Self {
        Self::Shared(Arc::new(view))
    }

    pub fn factory<F, V>(factory: F) -> Self
    where
        F: Fn() -> Result<V, BoxError> + Send + Sync + 'static,
        V: View + 'static,
    {
        Self::Factory(Arc::new(move || factory().map(|view| Box::new(view) as Box<dyn View>)))
    }

    /// Returns the view that should serve the next request.
    pub fn resolve(&self) -> Result<Arc<dyn View>, BoxError> {
        match self {
            Self::Shared(view) => Ok(Arc::clone(view)),
            Self::Factory(factory) => factory().map(Arc::from),
        }
    }
}

impl fmt::Debug for ViewBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => f.write_str("Shared"),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// A path pattern bound to a view.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Option<String>,
    mode: MatchMode,
    binding: ViewBinding,
}

impl Route {
    pub fn new(pattern: Option<String>, mode: MatchMode, binding: ViewBinding) -> Self {
        Self { pattern, mode, binding }
    }

    /// Matches `path` exactly.
    pub fn exact(path: impl Into<String>, binding: ViewBinding) -> Self {
        Self::new(Some(path.into()), MatchMode::Exact, binding)
    }

    /// Matches every path starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>, binding: ViewBinding) -> Self {
        Self::new(Some(prefix.into()), MatchMode::Prefix, binding)
    }

    /// A route without pattern; it never matches a request path.
    pub fn unbound_pattern(binding: ViewBinding) -> Self {
        Self::new(None, MatchMode::Exact, binding)
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn binding(&self) -> &ViewBinding {
        &self.binding
    }

    pub fn matches(&self, path: &str) -> bool {
        match (&self.pattern, self.mode) {
            (None, _) => false,
            (Some(pattern), MatchMode::Exact) => path == pattern,
            (Some(pattern), MatchMode::Prefix) => path.starts_with(pattern.as_str()),
        }
    }
}

/// Ordered routes, searched front to back.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `route`. Adding the same route object twice has no effect.
    pub fn add_route(&mut self, route: Arc<Route>) {
        if !self.routes.iter().any(|r| Arc::ptr_eq(r, &route)) {
            self.routes.push(route);
        }
    }

    /// Removes `route`, returning whether it was registered.
    pub fn remove_route(&mut self, route: &Arc<Route>) -> bool {
        let before = self.routes.len();
        self.routes.retain(|r| !Arc::ptr_eq(r, route));
        self.routes.len() != before
    }

    /// The first route matching `path`.
    pub fn find(&self, path: &str) -> Option<Arc<Route>> {
        self.routes.iter().find(|route| route.matches(path)).cloned()
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

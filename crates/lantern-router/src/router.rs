//! High-level router API.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for registering and resolving routes.

use crate::error::RouteError;
use crate::method::Method;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;
use crate::pattern::Pattern;
use crate::{Lookup, RouteMatch};

/// A parameterized radix tree router.
///
/// `T` is whatever the caller binds to a route; the server binds shared
/// handler objects, tests usually bind plain strings.
///
/// # Example
///
/// ```rust
/// use lantern_router::{Lookup, Method, Router};
///
/// let mut router = Router::new();
/// router.insert(Method::Get, "/users", "listUsers").unwrap();
/// router.insert(Method::Get, "/users/:id", "getUser").unwrap();
///
/// match router.lookup(Method::Get, "/users/123") {
///     Lookup::Found(m) => {
///         assert_eq!(*m.handler, "getUser");
///         assert_eq!(m.params.get("id"), Some("123"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
///
/// # Route Priority
///
/// When multiple routes could match, the router prefers, segment by
/// segment from the root:
///
/// 1. **Static segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/:id`)
/// 3. **Wildcard segments** (e.g., `/files/*path`)
///
/// so `/users/me` wins over `/users/:id` for the path `/users/me`.
#[derive(Debug, Clone)]
pub struct Router<T> {
    /// Root node of the radix tree
    root: Node<T>,
    /// Registered (method, normalized pattern) pairs, in insertion order
    routes: Vec<(Method, String)>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Registers `handler` for `method` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidPattern`] if the pattern is malformed
    /// - [`RouteError::Conflict`] if the same method and pattern is already
    ///   registered, or a parameter or wildcard at the same position uses
    ///   a different name
    ///
    /// A failed insert leaves the router unchanged.
    pub fn insert(&mut self, method: Method, pattern: &str, handler: T) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        self.root.insert(&pattern, method, handler)?;
        self.routes.push((method, pattern.as_str().to_string()));
        Ok(())
    }

    /// Resolves a request.
    ///
    /// `path` is the raw (still percent-encoded) request path. Methods
    /// outside the routable set resolve to [`Lookup::MethodNotAllowed`]
    /// when the path exists and [`Lookup::NotFound`] otherwise.
    #[must_use]
    pub fn lookup_http(&self, method: &http::Method, path: &str) -> Lookup<'_, T> {
        match Method::try_from(method) {
            Ok(method) => self.lookup(method, path),
            Err(_) => self.path_only(path),
        }
    }

    /// Resolves a request for a routable method.
    #[must_use]
    pub fn lookup(&self, method: Method, path: &str) -> Lookup<'_, T> {
        let segments = split(path);
        let mut params = Params::new();
        let accept = |methods: &MethodRouter<T>| methods.contains(method);

        if let Some(node) = self.root.find(&segments, &mut params, &accept) {
            if let Some(handler) = node.methods().get(method) {
                return Lookup::Found(RouteMatch {
                    handler,
                    params,
                    pattern: node.pattern(),
                });
            }
        }

        self.path_only(path)
    }

    fn path_only(&self, path: &str) -> Lookup<'_, T> {
        let mut served = Vec::new();
        self.root.collect_allowed(&split(path), &mut served);

        if served.is_empty() {
            return Lookup::NotFound;
        }
        Lookup::MethodNotAllowed {
            allowed: Method::ALL
                .into_iter()
                .filter(|m| served.contains(m))
                .collect(),
        }
    }

    /// Returns the registered (method, pattern) pairs in insertion order.
    #[must_use]
    pub fn routes(&self) -> &[(Method, String)] {
        &self.routes
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

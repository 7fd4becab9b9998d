//! Parameterized radix tree router for Lantern.
//!
//! This crate maps an HTTP method and a URL path to whatever value was
//! registered for them, extracting named and wildcard segments on the way.
//!
//! # Features
//!
//! - **Path Parameters**: `/users/:id` captures one segment as `id`
//! - **Wildcards**: `/files/*path` captures the rest of the path
//! - **Precedence**: exact segments beat parameters beat wildcards,
//!   decided segment by segment from the root
//! - **Fail-fast registration**: malformed or conflicting patterns are
//!   rejected by [`Router::insert`], never at dispatch time
//! - **Distinct 405**: a path that matches only under other methods
//!   resolves to [`Lookup::MethodNotAllowed`] with the allowed set
//!
//! # Example
//!
//! ```rust
//! use lantern_router::{Lookup, Method, Router};
//!
//! let mut router = Router::new();
//! router.insert(Method::Get, "/users/me", "currentUser").unwrap();
//! router.insert(Method::Get, "/users/:id", "getUser").unwrap();
//! router.insert(Method::Get, "/static/*filepath", "asset").unwrap();
//!
//! let Lookup::Found(m) = router.lookup(Method::Get, "/users/me") else {
//!     panic!("no match");
//! };
//! assert_eq!(*m.handler, "currentUser");
//!
//! assert!(matches!(
//!     router.lookup(Method::Post, "/users/42"),
//!     Lookup::MethodNotAllowed { .. }
//! ));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "static"
//!              │               │
//!        ┌─────┴─────┐     "*filepath"
//!        │           │
//!       "me"       ":id"
//!      [GET]       [GET]
//! ```

mod error;
mod method;
mod method_router;
mod node;
mod params;
mod pattern;
mod router;

pub use error::{PatternIssue, RouteError};
pub use method::{Method, UnsupportedMethod};
pub use method_router::MethodRouter;
pub use params::Params;
pub use pattern::{Pattern, Segment};
pub use router::Router;

/// A successful route resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value bound to the matched route.
    pub handler: &'a T,
    /// Captured path parameters, percent-decoded.
    pub params: Params,
    /// The normalized pattern of the matched route.
    pub pattern: &'a str,
}

/// Outcome of [`Router::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a, T> {
    /// A route serves this method and path.
    Found(RouteMatch<'a, T>),
    /// The path matches a route, but not for the requested method.
    MethodNotAllowed {
        /// Methods served by any route matching the path, in canonical order.
        allowed: Vec<Method>,
    },
    /// Nothing matches the path.
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn handler_for(router: &Router<&'static str>, path: &str) -> Option<&'static str> {
        match router.lookup(Method::Get, path) {
            Lookup::Found(m) => Some(*m.handler),
            _ => None,
        }
    }

    proptest! {
        #[test]
        fn exact_beats_param_beats_wildcard(
            prefix in "[a-z]{1,8}",
            literal in "[a-z]{1,8}",
            other in "[a-z]{1,8}",
            tail in proptest::collection::vec("[a-z0-9]{1,6}", 1..4),
        ) {
            prop_assume!(literal != other);

            let mut router = Router::new();
            router.insert(Method::Get, &format!("/{prefix}/*rest"), "wildcard").unwrap();
            router.insert(Method::Get, &format!("/{prefix}/:id"), "param").unwrap();
            router.insert(Method::Get, &format!("/{prefix}/{literal}"), "exact").unwrap();

            prop_assert_eq!(handler_for(&router, &format!("/{prefix}/{literal}")), Some("exact"));
            prop_assert_eq!(handler_for(&router, &format!("/{prefix}/{other}")), Some("param"));

            let deep = format!("/{prefix}/{other}/{}", tail.join("/"));
            prop_assert_eq!(handler_for(&router, &deep), Some("wildcard"));
        }

        #[test]
        fn registration_order_does_not_change_resolution(
            names in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
        ) {
            let names: Vec<String> = names.into_iter().collect();

            let mut forward = Router::new();
            let mut backward = Router::new();
            forward.insert(Method::Get, "/:any", "param").unwrap();
            for name in &names {
                forward.insert(Method::Get, &format!("/{name}"), "exact").unwrap();
            }
            for name in names.iter().rev() {
                backward.insert(Method::Get, &format!("/{name}"), "exact").unwrap();
            }
            backward.insert(Method::Get, "/:any", "param").unwrap();

            for name in &names {
                let path = format!("/{name}");
                prop_assert_eq!(handler_for(&forward, &path), handler_for(&backward, &path));
            }
            prop_assert_eq!(handler_for(&forward, "/ZZZ"), Some("param"));
        }
    }
}

//! Registration errors.
//!
//! Both variants are caller bugs: they are reported when a route is
//! registered, never when a request is dispatched, and retrying the same
//! registration will always fail the same way.

use thiserror::Error;

use crate::method::Method;

/// Why a route pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternIssue {
    /// The pattern does not start with `/`.
    #[error("pattern must begin with '/'")]
    MissingLeadingSlash,

    /// A `:` or `*` segment has no name after the sigil.
    #[error("segment {index} has an empty name")]
    EmptyName {
        /// Zero-based segment index.
        index: usize,
    },

    /// A name contains characters outside `[A-Za-z0-9_-]`.
    #[error("segment name `{name}` contains invalid characters")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// A wildcard appears before the final segment.
    #[error("wildcard `*{name}` must be the final segment")]
    WildcardNotLast {
        /// The wildcard name.
        name: String,
    },

    /// The same parameter name appears twice.
    #[error("parameter name `{name}` is used more than once")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// Errors returned by [`Router::insert`](crate::Router::insert).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern is malformed.
    #[error("invalid route pattern `{pattern}`: {issue}")]
    InvalidPattern {
        /// The pattern as supplied by the caller.
        pattern: String,
        /// What is wrong with it.
        issue: PatternIssue,
    },

    /// The route collides with one that is already registered.
    #[error("route conflict for {method} `{pattern}`: {reason}")]
    Conflict {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        pattern: String,
        /// Human-readable explanation.
        reason: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, issue: PatternIssue) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            issue,
        }
    }

    /// Returns true for [`RouteError::Conflict`].
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns true for [`RouteError::InvalidPattern`].
    #[must_use]
    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self, Self::InvalidPattern { .. })
    }
}

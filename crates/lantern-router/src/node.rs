//! Radix tree node implementation.
//!
//! Each node represents one path segment. A node has any number of static
//! children (kept sorted for binary search), at most one parameter child
//! and at most one wildcard child.

use std::borrow::Cow;

use crate::error::RouteError;
use crate::method::Method;
use crate::method_router::MethodRouter;
use crate::params::Params;
use crate::pattern::{Pattern, Segment};

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    /// The segment this node matches
    kind: Segment,

    /// Normalized pattern of the routes ending at this node
    pattern: Option<String>,

    /// Handlers for routes ending at this node
    methods: MethodRouter<T>,

    /// Static children, sorted by segment for binary search
    static_children: Vec<Node<T>>,

    /// Parameter child (at most one per node)
    param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node, always a leaf)
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn new(kind: Segment) -> Self {
        Self {
            kind,
            pattern: None,
            methods: MethodRouter::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    pub(crate) fn root() -> Self {
        Self::new(Segment::Static(String::new()))
    }

    pub(crate) fn methods(&self) -> &MethodRouter<T> {
        &self.methods
    }

    pub(crate) fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or("/")
    }

    fn name(&self) -> &str {
        match &self.kind {
            Segment::Static(text) => text,
            Segment::Param(name) | Segment::Wildcard(name) => name,
        }
    }

    /// Inserts a route.
    ///
    /// Conflicts are detected before the tree is touched, so a failed
    /// insert leaves the tree exactly as it was.
    pub(crate) fn insert(
        &mut self,
        pattern: &Pattern,
        method: Method,
        handler: T,
    ) -> Result<(), RouteError> {
        self.check(pattern.segments(), pattern, method)?;

        let target = self.descend_or_create(pattern.segments());
        target.pattern = Some(pattern.as_str().to_string());
        target
            .methods
            .insert(method, handler)
            .map_err(|_| conflict(pattern, method, "route is already registered".to_string()))
    }

    fn check(
        &self,
        segments: &[Segment],
        pattern: &Pattern,
        method: Method,
    ) -> Result<(), RouteError> {
        let Some((first, rest)) = segments.split_first() else {
            if self.methods.contains(method) {
                return Err(conflict(
                    pattern,
                    method,
                    "route is already registered".to_string(),
                ));
            }
            return Ok(());
        };

        let child = match first {
            Segment::Static(text) => self.find_static_child(text),
            Segment::Param(name) | Segment::Wildcard(name) => {
                let existing = if matches!(first, Segment::Param(_)) {
                    self.param_child.as_deref()
                } else {
                    self.wildcard_child.as_deref()
                };
                if let Some(child) = existing {
                    if child.name() != name {
                        return Err(conflict(
                            pattern,
                            method,
                            format!("`{first}` conflicts with existing `{}`", child.kind),
                        ));
                    }
                }
                existing
            }
        };

        // A missing child means a fresh branch, which cannot conflict.
        child.map_or(Ok(()), |child| child.check(rest, pattern, method))
    }

    fn descend_or_create(&mut self, segments: &[Segment]) -> &mut Self {
        let Some((first, rest)) = segments.split_first() else {
            return self;
        };

        let child = match first {
            Segment::Static(text) => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.name().cmp(text.as_str()))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children.insert(index, Self::new(first.clone()));
                        index
                    }
                };
                &mut self.static_children[index]
            }
            Segment::Param(_) => &mut **self
                .param_child
                .get_or_insert_with(|| Box::new(Self::new(first.clone()))),
            Segment::Wildcard(_) => &mut **self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Self::new(first.clone()))),
        };
        child.descend_or_create(rest)
    }

    /// Finds the most specific node whose method table satisfies `accept`.
    ///
    /// At every depth a static child is tried before the parameter child,
    /// which is tried before the wildcard child. A branch that dead-ends
    /// is abandoned and its captures are discarded.
    pub(crate) fn find<'a, F>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
        accept: &F,
    ) -> Option<&'a Self>
    where
        F: Fn(&MethodRouter<T>) -> bool,
    {
        let Some((first, rest)) = segments.split_first() else {
            if accept(&self.methods) {
                return Some(self);
            }
            return self
                .wildcard_child
                .as_deref()
                .and_then(|child| child.capture(segments, params, accept));
        };

        if let Some(child) = self.find_static_child(first) {
            if let Some(found) = child.find(rest, params, accept) {
                return Some(found);
            }
        }

        if let Some(child) = self.param_child.as_deref() {
            let mark = params.len();
            params.push(child.name(), decode(first));
            if let Some(found) = child.find(rest, params, accept) {
                return Some(found);
            }
            params.truncate(mark);
        }

        self.wildcard_child
            .as_deref()
            .and_then(|child| child.capture(segments, params, accept))
    }

    /// Adds to `allowed` every method served by any route matching
    /// `segments`, across all branches.
    pub(crate) fn collect_allowed(&self, segments: &[&str], allowed: &mut Vec<Method>) {
        let Some((first, rest)) = segments.split_first() else {
            allowed.extend(self.methods.allowed_methods());
            if let Some(wildcard) = self.wildcard_child.as_deref() {
                allowed.extend(wildcard.methods.allowed_methods());
            }
            return;
        };

        if let Some(child) = self.find_static_child(first) {
            child.collect_allowed(rest, allowed);
        }
        if let Some(child) = self.param_child.as_deref() {
            child.collect_allowed(rest, allowed);
        }
        if let Some(wildcard) = self.wildcard_child.as_deref() {
            allowed.extend(wildcard.methods.allowed_methods());
        }
    }

    fn capture<'a, F>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
        accept: &F,
    ) -> Option<&'a Self>
    where
        F: Fn(&MethodRouter<T>) -> bool,
    {
        if !accept(&self.methods) {
            return None;
        }
        params.push(self.name(), decode(&segments.join("/")));
        Some(self)
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.name().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

fn conflict(pattern: &Pattern, method: Method, reason: String) -> RouteError {
    RouteError::Conflict {
        method,
        pattern: pattern.as_str().to_string(),
        reason,
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

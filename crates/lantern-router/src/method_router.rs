//! Per-path method table.
//!
//! A [`MethodRouter`] holds at most one handler for each routable
//! [`Method`] at a single node of the tree.

use crate::method::Method;

/// Maps HTTP methods to handlers for a single path.
///
/// # Example
///
/// ```rust
/// use lantern_router::{Method, MethodRouter};
///
/// let mut methods = MethodRouter::new();
/// assert!(methods.insert(Method::Get, "list").is_ok());
/// assert!(methods.insert(Method::Get, "again").is_err());
///
/// assert_eq!(methods.get(Method::Get), Some(&"list"));
/// assert_eq!(methods.allowed_methods(), vec![Method::Get]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    slots: [Option<T>; 7],
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            slots: [None, None, None, None, None, None, None],
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handler` for `method`.
    ///
    /// Returns the handler back if the slot is already taken; an existing
    /// registration is never replaced.
    pub fn insert(&mut self, method: Method, handler: T) -> Result<(), T> {
        let slot = &mut self.slots[method.index()];
        if slot.is_some() {
            return Err(handler);
        }
        *slot = Some(handler);
        Ok(())
    }

    /// Returns the handler registered for `method`.
    #[must_use]
    pub fn get(&self, method: Method) -> Option<&T> {
        self.slots[method.index()].as_ref()
    }

    /// Returns true if `method` has a handler.
    #[must_use]
    pub fn contains(&self, method: Method) -> bool {
        self.slots[method.index()].is_some()
    }

    /// Returns true if no method has a handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Returns the methods that have a handler, in [`Method::ALL`] order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.contains(*m))
            .collect()
    }
}

//! Captured path parameters.
//!
//! Routes rarely capture more than a few segments, so captures live
//! inline and only spill to the heap when there are many.

use smallvec::SmallVec;

/// Captures held without a heap allocation.
const INLINE_PARAMS: usize = 4;

/// Path parameters captured by a route match, in pattern order.
///
/// Values are already percent-decoded.
///
/// # Example
///
/// ```rust
/// use lantern_router::Params;
///
/// let mut params = Params::new();
/// params.push("greeting", "Namaste");
/// params.push("name", "Alice");
///
/// assert_eq!(params.get("name"), Some("Alice"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the decoded value captured as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find_map(|(captured, value)| (captured == name).then_some(value))
    }

    /// Returns true if the route captured nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates `(name, value)` in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Drops every parameter after the first `len`.
    ///
    /// Used when the matcher backtracks out of a branch.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = smallvec::IntoIter<[(String, String); INLINE_PARAMS]>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

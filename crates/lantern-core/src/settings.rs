//! Instance settings handed to the server at start time.
//!
//! Settings are string-keyed and hold arbitrary `Send + Sync` values; the
//! typical use is passing things the host application knows about (a
//! writable data directory, the signed-in account) to every handler
//! without global state.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable context value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Key prefix owned by the runtime.
///
/// Caller settings may not use it; see [`keys`](crate::keys).
pub const RESERVED_PREFIX: &str = "lantern.";

/// Returns true if `key` belongs to the runtime's namespace.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// String-keyed instance settings.
///
/// # Example
///
/// ```rust
/// use lantern_core::Settings;
///
/// let settings = Settings::new()
///     .with("greeting", "Namaste".to_string())
///     .with("max_items", 50_usize);
///
/// assert_eq!(settings.len(), 2);
/// assert!(settings.get("greeting").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Settings {
    entries: HashMap<String, Value>,
}

impl Settings {
    /// Creates an empty settings map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setting, returning `self` for chaining.
    #[must_use]
    pub fn with<V: Any + Send + Sync>(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a setting.
    pub fn insert<V: Any + Send + Sync>(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Adds or replaces a setting with an already shared value.
    pub fn insert_shared(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the number of settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the first key found in the reserved namespace, if any.
    #[must_use]
    pub fn reserved_key(&self) -> Option<&str> {
        self.keys().find(|k| is_reserved(k))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Settings").field("keys", &keys).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Settings
where
    K: Into<String>,
    V: Any + Send + Sync,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

//! Request context types.
//!
//! A [`Context`] is a persistent linked chain: each [`Context::with_value`]
//! call allocates one link pointing at its parent, and the chain always
//! ends at a [`Generation`]. Lookups walk from the newest link outward,
//! so a route parameter shadows a setting with the same name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::generation::Generation;
use crate::keys;
use crate::settings::Value;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it suitable for log correlation.
///
/// # Example
///
/// ```
/// use lantern_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only, request-scoped values plus the generation's cancellation.
///
/// Cloning is cheap (one reference count). Deriving never mutates the
/// parent, so any number of requests can overlay the same generation
/// concurrently.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lantern_core::{Generation, Settings};
///
/// let generation = Arc::new(
///     Generation::new(1, Settings::new().with("name", "from settings".to_string())).unwrap(),
/// );
/// let root = generation.root_context();
/// let request = root.with_value("name", "Alice".to_string());
///
/// assert_eq!(request.str_value("name"), Some("Alice"));
/// assert_eq!(root.str_value("name"), Some("from settings"));
/// ```
#[derive(Clone)]
pub struct Context {
    link: Arc<Link>,
}

enum Link {
    Root(Arc<Generation>),
    Value {
        key: String,
        value: Value,
        parent: Context,
    },
}

impl Context {
    /// Creates the root context of a generation.
    #[must_use]
    pub fn root(generation: Arc<Generation>) -> Self {
        Self {
            link: Arc::new(Link::Root(generation)),
        }
    }

    /// Returns a child context that additionally maps `key` to `value`.
    #[must_use]
    pub fn with_value<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) -> Self {
        self.with_shared_value(key, Arc::new(value))
    }

    /// Like [`with_value`](Self::with_value) for an already shared value.
    #[must_use]
    pub fn with_shared_value(&self, key: impl Into<String>, value: Value) -> Self {
        Self {
            link: Arc::new(Link::Value {
                key: key.into(),
                value,
                parent: self.clone(),
            }),
        }
    }

    /// Looks up `key`, innermost link first, ending at the generation.
    #[must_use]
    pub fn raw_value(&self, key: &str) -> Option<&Value> {
        let mut current = self;
        loop {
            match &*current.link {
                Link::Value {
                    key: k,
                    value,
                    parent,
                } => {
                    if k == key {
                        return Some(value);
                    }
                    current = parent;
                }
                Link::Root(generation) => return generation.get(key),
            }
        }
    }

    /// Looks up `key` and downcasts it to `T`.
    ///
    /// Returns `None` if the key is absent or holds another type.
    #[must_use]
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        let value: &(dyn Any + Send + Sync) = &**self.raw_value(key)?;
        value.downcast_ref::<T>()
    }

    /// Looks up a string value stored as `String` or `&'static str`.
    #[must_use]
    pub fn str_value(&self, key: &str) -> Option<&str> {
        let value: &(dyn Any + Send + Sync) = &**self.raw_value(key)?;
        value
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| value.downcast_ref::<&'static str>().copied())
    }

    /// Returns true if `key` resolves anywhere in the chain.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.raw_value(key).is_some()
    }

    /// Returns the number of links above the generation root.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Link::Value { parent, .. } = &*current.link {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Returns the generation at the root of this chain.
    #[must_use]
    pub fn generation(&self) -> &Arc<Generation> {
        let mut current = self;
        loop {
            match &*current.link {
                Link::Value { parent, .. } => current = parent,
                Link::Root(generation) => return generation,
            }
        }
    }

    /// Returns the id of the generation this context belongs to.
    #[must_use]
    pub fn generation_id(&self) -> u64 {
        self.generation().id()
    }

    /// Returns the request id, if the server assigned one.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.value::<RequestId>(keys::REQUEST_ID).copied()
    }

    /// Returns the server's root URL for this generation, if recorded.
    #[must_use]
    pub fn root_url(&self) -> Option<&str> {
        self.str_value(keys::ROOT_URL)
    }

    /// Returns the generation's cancellation signal.
    #[must_use]
    pub fn cancel_signal(&self) -> &CancelSignal {
        self.generation().signal()
    }

    /// Returns true once the server has begun stopping this generation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_signal().is_cancelled()
    }

    /// Completes when the generation is cancelled.
    ///
    /// Long-running handlers should race their work against this and
    /// return early when it fires.
    pub async fn cancelled(&self) {
        self.cancel_signal().cancelled().await;
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("generation", &self.generation_id())
            .field("depth", &self.depth())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::time::Duration;

    fn generation(settings: Settings) -> Arc<Generation> {
        Arc::new(Generation::new(7, settings).expect("valid settings"))
    }

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_lookup_walks_to_root() {
        let settings = Settings::new().with("greeting", "Namaste".to_string());
        let ctx = generation(settings).root_context().with_value("name", "Alice".to_string());

        assert_eq!(ctx.str_value("greeting"), Some("Namaste"));
        assert_eq!(ctx.str_value("name"), Some("Alice"));
        assert_eq!(ctx.str_value("missing"), None);
        assert!(!ctx.contains("missing"));
        let greeting = ctx.str_value("greeting").unwrap();
        let name = ctx.str_value("name").unwrap();
        assert_eq!(format!("{greeting}, {name}"), "Namaste, Alice");
    }

    #[test]
    fn test_innermost_value_shadows() {
        let root = generation(Settings::new().with("name", "setting".to_string())).root_context();
        let outer = root.with_value("name", "outer".to_string());
        let inner = outer.with_value("name", "inner".to_string());

        assert_eq!(inner.str_value("name"), Some("inner"));
        assert_eq!(outer.str_value("name"), Some("outer"));
        assert_eq!(root.str_value("name"), Some("setting"));
    }

    #[test]
    fn test_overlays_do_not_interfere() {
        let root = generation(Settings::new()).root_context();
        let a = root.with_value("id", "a".to_string());
        let b = root.with_value("id", "b".to_string());

        assert_eq!(a.str_value("id"), Some("a"));
        assert_eq!(b.str_value("id"), Some("b"));
        assert_eq!(root.depth(), 0);
        assert_eq!(a.depth(), 1);
        assert!(Arc::ptr_eq(a.generation(), b.generation()));
    }

    #[test]
    fn test_typed_lookup() {
        let root = generation(Settings::new().with("limit", 25_u32)).root_context();

        assert_eq!(root.value::<u32>("limit"), Some(&25));
        assert_eq!(root.value::<u64>("limit"), None);
        assert_eq!(root.str_value("limit"), None);
        assert_eq!(root.generation_id(), 7);
    }

    #[test]
    fn test_static_str_values() {
        let root = generation(Settings::new().with("mode", "offline")).root_context();
        assert_eq!(root.str_value("mode"), Some("offline"));
    }

    #[test]
    fn test_request_id_and_root_url() {
        let generation = Arc::new(
            Generation::new(1, Settings::new())
                .unwrap()
                .with_runtime_value("root_url", "http://127.0.0.1:9".to_string()),
        );
        let id = RequestId::new();
        let ctx = generation.root_context().with_value(keys::REQUEST_ID, id);

        assert_eq!(ctx.request_id(), Some(id));
        assert_eq!(ctx.root_url(), Some("http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn test_cancellation_reaches_derived_contexts() {
        let generation = generation(Settings::new());
        let ctx = generation.root_context().with_value("name", "Alice".to_string());
        assert!(!ctx.is_cancelled());

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };
        generation.cancel();

        assert!(ctx.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("derived context should observe cancellation")
            .unwrap();
    }

    #[test]
    fn test_debug_output() {
        let ctx = generation(Settings::new()).root_context().with_value("x", 1_u8);
        assert_eq!(
            format!("{ctx:?}"),
            "Context { generation: 7, depth: 1, cancelled: false }"
        );
    }
}

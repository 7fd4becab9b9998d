//! Settings generations.
//!
//! A [`Generation`] is the immutable bundle of settings and cancellation
//! signal that lives for one start/stop cycle of the server. Every request
//! served during that cycle shares it read-only; the next start builds a
//! fresh one instead of mutating it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelSignal;
use crate::context::Context;
use crate::error::{ContextError, ContextResult};
use crate::keys;
use crate::settings::{Settings, Value, RESERVED_PREFIX};

/// One immutable settings bundle plus its cancellation signal.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use lantern_core::{Generation, Settings};
///
/// let generation = Arc::new(
///     Generation::new(1, Settings::new().with("greeting", "Namaste".to_string())).unwrap(),
/// );
/// let ctx = generation.root_context();
///
/// assert_eq!(ctx.str_value("greeting"), Some("Namaste"));
/// assert_eq!(ctx.value::<u64>("lantern.generation"), Some(&1));
///
/// generation.cancel();
/// assert!(ctx.is_cancelled());
/// ```
pub struct Generation {
    id: u64,
    values: Settings,
    signal: CancelSignal,
    created_at: Instant,
}

impl Generation {
    /// Builds a generation from caller settings.
    ///
    /// The generation id is recorded under [`keys::GENERATION`].
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::ReservedKey`] if any setting uses the
    /// reserved `lantern.` namespace.
    pub fn new(id: u64, settings: Settings) -> ContextResult<Self> {
        if let Some(key) = settings.reserved_key() {
            return Err(ContextError::ReservedKey {
                key: key.to_string(),
            });
        }

        let mut values = settings;
        values.insert(keys::GENERATION, id);

        tracing::debug!(generation = id, settings = values.len(), "created settings generation");

        Ok(Self {
            id,
            values,
            signal: CancelSignal::new(),
            created_at: Instant::now(),
        })
    }

    /// Adds a runtime-owned value under `lantern.<name>`.
    ///
    /// Only the runtime calls this, while the generation is still being
    /// assembled and before it is shared.
    #[must_use]
    pub fn with_runtime_value<V: Any + Send + Sync>(mut self, name: &str, value: V) -> Self {
        self.values.insert(format!("{RESERVED_PREFIX}{name}"), value);
        self
    }

    /// Returns the generation id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Looks up a root value (caller setting or runtime value).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the number of root values, runtime values included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: every generation carries at least its id.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns this generation's cancellation signal.
    #[must_use]
    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    /// Cancels this generation. Idempotent.
    pub fn cancel(&self) {
        if self.signal.cancel() {
            tracing::debug!(generation = self.id, "cancelled settings generation");
        }
    }

    /// Returns true once the generation has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Returns how long ago the generation was created.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Returns the root of the context chain for this generation.
    #[must_use]
    pub fn root_context(self: &Arc<Self>) -> Context {
        Context::root(Arc::clone(self))
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("values", &self.values)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_copies_settings() {
        let mut settings = Settings::new().with("greeting", "hi".to_string());
        let generation = Generation::new(3, settings.clone()).unwrap();

        // Later changes to the caller's map are not observed.
        settings.insert("greeting", "bye".to_string());

        let value = generation.get("greeting").and_then(|v| v.downcast_ref::<String>());
        assert_eq!(value.map(String::as_str), Some("hi"));
        assert_eq!(generation.len(), 2);
        assert!(!generation.is_empty());
    }

    #[test]
    fn test_generation_rejects_reserved_keys() {
        let settings = Settings::new().with("lantern.root_url", "http://evil".to_string());
        let err = Generation::new(1, settings).unwrap_err();
        assert_eq!(
            err,
            ContextError::ReservedKey {
                key: "lantern.root_url".to_string()
            }
        );
    }

    #[test]
    fn test_runtime_values_use_reserved_namespace() {
        let generation = Generation::new(9, Settings::new())
            .unwrap()
            .with_runtime_value("root_url", "http://127.0.0.1:1234".to_string());

        assert!(generation.get(keys::ROOT_URL).is_some());
        assert_eq!(
            generation.get(keys::GENERATION).and_then(|v| v.downcast_ref::<u64>()),
            Some(&9)
        );
    }

    #[test]
    fn test_generations_have_independent_signals() {
        let first = Generation::new(1, Settings::new()).unwrap();
        let second = Generation::new(2, Settings::new()).unwrap();

        first.cancel();
        first.cancel();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}

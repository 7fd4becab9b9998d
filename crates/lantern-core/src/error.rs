//! Error types for the context chain.

use thiserror::Error;

use crate::settings::RESERVED_PREFIX;

/// Errors raised while building a settings generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A caller-supplied setting uses the runtime's reserved namespace.
    #[error("setting `{key}` uses the reserved `{}` namespace", RESERVED_PREFIX)]
    ReservedKey {
        /// The offending key.
        key: String,
    },
}

/// Result type alias using [`ContextError`].
pub type ContextResult<T> = Result<T, ContextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_key_display() {
        let err = ContextError::ReservedKey {
            key: "lantern.root_url".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "setting `lantern.root_url` uses the reserved `lantern.` namespace"
        );
    }
}

//! # Lantern Core
//!
//! Context plumbing shared by the Lantern router and server.
//!
//! - [`Settings`] - caller-supplied, string-keyed instance settings
//! - [`Generation`] - one immutable settings bundle per start/stop cycle
//! - [`Context`] - persistent request-scoped value chain rooted at a generation
//! - [`CancelSignal`] - broadcast-once cancellation observed by handlers
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/lantern-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cancel;
mod context;
mod error;
mod generation;
pub mod keys;
mod settings;

pub use cancel::CancelSignal;
pub use context::{Context, RequestId};
pub use error::{ContextError, ContextResult};
pub use generation::Generation;
pub use settings::{is_reserved, Settings, Value, RESERVED_PREFIX};

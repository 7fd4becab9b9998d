//! Well-known context keys written by the runtime.
//!
//! All of them live under [`RESERVED_PREFIX`](crate::RESERVED_PREFIX), so
//! caller settings can never shadow them at the generation root.

/// The server's root URL for the generation (`String`), e.g.
/// `http://127.0.0.1:8080`.
pub const ROOT_URL: &str = "lantern.root_url";

/// The generation id (`u64`).
pub const GENERATION: &str = "lantern.generation";

/// The per-request [`RequestId`](crate::RequestId).
pub const REQUEST_ID: &str = "lantern.request_id";

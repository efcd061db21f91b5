//! Authentication module
//!
//! Supports: API Key (header or query), Basic, Bearer, static headers.
//!
//! The strategy is chosen once from `TapConfig.auth` when the client is
//! built and applied to every outbound attempt.

mod types;

pub use types::{AuthConfig, AuthStrategy, Location};

//! Shared types, error helpers, and reply payloads used across all chatrelay crates.

pub mod error;
pub mod types;

pub use error::FromMessage;

//! Data models
//!
//! Shared between the settings server and its clients (via API).

pub mod settings;

// Re-exports
pub use settings::*;

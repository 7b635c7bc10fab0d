//! Shared types for the storefront settings service
//!
//! Types used by both the settings server and its clients: the settings
//! record model, the field catalogue, the merge resolver, and the unified
//! error/response structures.

pub mod error;
pub mod models;
pub mod settings;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use models::settings::{SettingValue, SettingsPatch, SettingsRecord};
pub use settings::merge::merge_settings;

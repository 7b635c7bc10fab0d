//! usmn-client - HTTP client and settings sync for the storefront
//!
//! Provides typed calls to the usmn-cloud settings API and a background
//! sync handle that keeps a local copy of the settings fresh.

pub mod config;
pub mod error;
pub mod http;
pub mod sync;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use sync::{SettingsSource, SettingsSync, SyncState};

// Re-export shared types for convenience
pub use shared::models::settings::{
    SaveSettingsResponse, SecretStatus, SettingValue, SettingsEnvelope, SettingsPatch,
    SettingsRecord,
};

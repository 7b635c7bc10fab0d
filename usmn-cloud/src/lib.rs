//! usmn-cloud — storefront settings service
//!
//! - Serves the admin settings record (secrets decrypted) and a public view
//! - Merges partial admin updates under the protected-field policy
//! - Encrypts secret fields at rest
//! - Persists through Redis, redb, or an in-memory development store

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;

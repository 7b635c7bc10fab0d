//! Settings server configuration

use std::time::Duration;

use thiserror::Error;

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_SETTINGS_KEY: &str = "site_settings";
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set in {environment} environment")]
    MissingSecret {
        name: &'static str,
        environment: String,
    },
}

/// Settings server configuration
#[derive(Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    /// Master secret for secret-field encryption (env: SETTINGS_ENCRYPTION_KEY)
    pub encryption_key: Option<String>,
    /// Primary KV store (env: REDIS_URL)
    pub redis_url: Option<String>,
    /// Key prefix inside Redis (env: KV_NAMESPACE)
    pub kv_namespace: Option<String>,
    /// Secondary embedded store file (env: REDB_PATH)
    pub redb_path: Option<String>,
    /// Key the settings record is stored under
    pub settings_key: String,
    /// Per-call backend timeout
    pub backend_timeout: Duration,
    /// Bearer token for the admin API (env: ADMIN_API_TOKEN)
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("http_port", &self.http_port)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<redacted>"))
            .field("kv_namespace", &self.kv_namespace)
            .field("redb_path", &self.redb_path)
            .field("settings_key", &self.settings_key)
            .field("backend_timeout", &self.backend_timeout)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());

        Ok(Self {
            http_port: var("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
            encryption_key: Self::require_secret(
                "SETTINGS_ENCRYPTION_KEY",
                var("SETTINGS_ENCRYPTION_KEY"),
                &environment,
            )?,
            redis_url: var("REDIS_URL"),
            kv_namespace: var("KV_NAMESPACE"),
            redb_path: var("REDB_PATH"),
            settings_key: var("SETTINGS_KEY").unwrap_or_else(|| DEFAULT_SETTINGS_KEY.into()),
            backend_timeout: Duration::from_millis(
                var("BACKEND_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS),
            ),
            admin_token: Self::require_secret(
                "ADMIN_API_TOKEN",
                var("ADMIN_API_TOKEN"),
                &environment,
            )?,
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Require a secret: must be set and non-empty outside development.
    fn require_secret(
        name: &'static str,
        value: Option<String>,
        environment: &str,
    ) -> Result<Option<String>, ConfigError> {
        match value {
            Some(v) => Ok(Some(v)),
            None if environment == "development" => Ok(None),
            None => Err(ConfigError::MissingSecret {
                name,
                environment: environment.to_string(),
            }),
        }
    }
}

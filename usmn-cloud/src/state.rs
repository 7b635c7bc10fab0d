//! Application state for usmn-cloud

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::crypto::SecretCodec;
use crate::store::{KvBackend, KvError, MemoryKv, RedbKv, RedisKv, SettingsStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const REDIS_POOL_SIZE: usize = 8;

/// Backend chain could not be built
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{backend} is configured but unavailable: {source}")]
    BackendUnavailable {
        backend: &'static str,
        #[source]
        source: KvError,
    },

    #[error("no persistent settings backend in {environment}, set REDIS_URL or REDB_PATH")]
    NoPersistentBackend { environment: String },
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Settings store (backend chain + secret codec)
    pub settings: SettingsStore,
    /// Admin API bearer token; `None` leaves admin routes open (development only)
    pub admin_token: Option<Arc<str>>,
    /// Environment: development | staging | production
    pub environment: String,
}

impl AppState {
    /// Create a new AppState, selecting the backend chain from configuration
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let codec = SecretCodec::from_secret(config.encryption_key.as_deref());

        let mut backends: Vec<Arc<dyn KvBackend>> = Vec::new();

        if let Some(url) = &config.redis_url {
            let connect = RedisKv::connect(url, config.kv_namespace.clone(), REDIS_POOL_SIZE);
            let connected = tokio::time::timeout(config.backend_timeout, connect)
                .await
                .unwrap_or(Err(KvError::Timeout));

            match connected {
                Ok(kv) => {
                    tracing::info!("Redis settings backend ready");
                    backends.push(Arc::new(kv));
                }
                // Outside development a configured primary must be reachable
                Err(source) if !config.is_development() => {
                    return Err(StartupError::BackendUnavailable {
                        backend: "redis",
                        source,
                    }
                    .into());
                }
                Err(e) => tracing::warn!(error = %e, "Redis unavailable, skipping backend"),
            }
        }

        if let Some(path) = &config.redb_path {
            let kv = RedbKv::open(path)?;
            tracing::info!(path = %path, "redb settings backend ready");
            backends.push(Arc::new(kv));
        }

        if config.is_development() {
            tracing::warn!("Using in-memory settings store, changes are lost on restart");
            backends.push(Arc::new(MemoryKv::new()));
        } else if backends.is_empty() {
            return Err(StartupError::NoPersistentBackend {
                environment: config.environment.clone(),
            }
            .into());
        }

        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN is not set, admin routes are unauthenticated");
        }

        let settings = SettingsStore::new(
            backends,
            Arc::new(codec),
            config.settings_key.clone(),
            config.backend_timeout,
        );
        tracing::info!(backends = ?settings.backend_names(), "Settings store ready");

        Ok(Self::from_parts(
            settings,
            config.admin_token.as_deref(),
            config.environment.clone(),
        ))
    }

    /// Assemble state from an already-built store
    pub fn from_parts(
        settings: SettingsStore,
        admin_token: Option<&str>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            admin_token: admin_token.map(Arc::from),
            environment: environment.into(),
        }
    }
}

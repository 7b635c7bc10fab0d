//! Settings store adapter
//!
//! Reads and writes the single settings record through an ordered chain of
//! key-value backends:
//!
//! - `read` tries every backend in order and never fails; with nothing
//!   stored anywhere it serves the cold-store defaults
//! - `write` encrypts secret fields and goes to the first backend only;
//!   failures propagate
//! - `save` is read → merge → write, guarded by the `_revision` counter;
//!   its read fails instead of falling back to defaults

pub mod kv;
pub mod memory;
pub mod redb;
pub mod redis;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shared::models::settings::{SecretStatus, SettingValue, SettingsPatch, SettingsRecord};
use shared::settings::{
    REMOVE_SUFFIX, REVISION_FIELD, SECRET_FIELDS, cold_store_defaults, merge_settings,
    revision_of,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::crypto::SecretCodec;

pub use self::kv::{KvBackend, KvError};
pub use self::memory::MemoryKv;
pub use self::redb::RedbKv;
pub use self::redis::RedisKv;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No settings backend configured")]
    NoBackend,

    #[error("{backend} backend failed: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: KvError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Revision conflict: expected {expected}, stored {actual}")]
    RevisionConflict { expected: u64, actual: u64 },
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub revision: u64,
}

#[derive(Clone)]
pub struct SettingsStore {
    backends: Vec<Arc<dyn KvBackend>>,
    codec: Arc<SecretCodec>,
    key: String,
    timeout: Duration,
    /// Serializes read-merge-write within this process
    save_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    pub fn new(
        backends: Vec<Arc<dyn KvBackend>>,
        codec: Arc<SecretCodec>,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backends,
            codec,
            key: key.into(),
            timeout,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Read the settings record
    ///
    /// With `decrypt_secrets == false` secret fields stay in their stored
    /// `encrypted:` form.
    pub async fn read(&self, decrypt_secrets: bool) -> SettingsRecord {
        let record = match self.read_stored().await {
            Some(record) => record,
            None => {
                tracing::debug!("No stored settings found, serving defaults");
                cold_store_defaults()
            }
        };

        if decrypt_secrets {
            self.codec.decrypt_fields(&record, &SECRET_FIELDS)
        } else {
            record
        }
    }

    async fn read_stored(&self) -> Option<SettingsRecord> {
        self.load(false).await.ok().flatten()
    }

    /// Walk the backend chain for the first non-empty record
    ///
    /// Lenient mode logs and skips a failing backend. Strict mode returns
    /// the failure, so a caller about to write back never mistakes an
    /// unreadable record for an empty one.
    async fn load(&self, strict: bool) -> Result<Option<SettingsRecord>, StoreError> {
        for backend in &self.backends {
            let bytes = match self.call(backend.get(&self.key)).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    tracing::debug!(backend = backend.name(), "No settings in backend");
                    continue;
                }
                Err(source) if strict => {
                    return Err(StoreError::Backend {
                        backend: backend.name(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "Settings read failed");
                    continue;
                }
            };

            match serde_json::from_slice::<SettingsRecord>(&bytes) {
                Ok(record) if !record.is_empty() => return Ok(Some(record)),
                Ok(_) => tracing::debug!(backend = backend.name(), "Stored settings are empty"),
                Err(e) if strict => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "Stored settings are not valid JSON")
                }
            }
        }
        Ok(None)
    }

    /// Persist a full record to the primary backend
    pub async fn write(&self, record: &SettingsRecord) -> Result<(), StoreError> {
        let primary = self.backends.first().ok_or(StoreError::NoBackend)?;

        let encrypted = self.codec.encrypt_fields(record, &SECRET_FIELDS);
        let bytes = serde_json::to_vec(&encrypted)?;

        self.call(primary.set(&self.key, &bytes))
            .await
            .map_err(|source| StoreError::Backend {
                backend: primary.name(),
                source,
            })?;

        tracing::info!(
            backend = primary.name(),
            revision = revision_of(record),
            "Settings written"
        );
        Ok(())
    }

    /// Apply an admin update to the stored record
    ///
    /// `expected_revision` rejects the save when someone else saved since
    /// the caller loaded; `None` keeps last-write-wins.
    pub async fn save(
        &self,
        patch: &SettingsPatch,
        expected_revision: Option<u64>,
    ) -> Result<SaveOutcome, StoreError> {
        let _guard = self.save_lock.lock().await;

        let current = self
            .load(true)
            .await?
            .unwrap_or_else(cold_store_defaults);
        let actual = revision_of(&current);
        if let Some(expected) = expected_revision
            && expected != actual
        {
            return Err(StoreError::RevisionConflict { expected, actual });
        }

        // The counter is server-owned
        let mut patch = patch.clone();
        patch.remove(REVISION_FIELD);
        patch.remove(&format!("{REVISION_FIELD}{REMOVE_SUFFIX}"));

        let mut merged = merge_settings(&current, &patch, &[]);
        let revision = actual + 1;
        merged.insert(REVISION_FIELD.to_string(), SettingValue::from(revision));

        self.write(&merged).await?;
        Ok(SaveOutcome { revision })
    }

    /// Report which integrations have credentials, without decrypting them
    pub async fn secret_status(&self) -> SecretStatus {
        let record = self.read(false).await;
        let configured = |field: &str| {
            record
                .get(field)
                .and_then(SettingValue::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        };

        SecretStatus {
            paypal_configured: configured("paypalClientId") && configured("paypalClientSecret"),
            telegram_configured: configured("telegramBotToken") && configured("telegramChatId"),
            using_development_key: self.codec.key_source()
                == crate::crypto::KeySource::DevelopmentFallback,
        }
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, KvError>>,
    ) -> Result<T, KvError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| KvError::Timeout)?
    }
}

/// Record as shown to anonymous storefront visitors
pub fn public_view(record: &SettingsRecord) -> SettingsRecord {
    let mut view = record.clone();
    for field in SECRET_FIELDS {
        view.remove(field);
    }
    view.remove(REVISION_FIELD);
    view
}

/// Split the server-owned revision counter out of a record
pub fn split_revision(mut record: SettingsRecord) -> (SettingsRecord, u64) {
    let revision = revision_of(&record);
    record.remove(REVISION_FIELD);
    (record, revision)
}

//! Key-value backend abstraction

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Opaque get/set store holding the serialized settings record
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;
}

//! redb backend (secondary, embedded file)

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::kv::{KvBackend, KvError};

/// Settings table: key = settings key, value = JSON bytes
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

#[derive(Clone)]
pub struct RedbKv {
    db: Arc<Database>,
}

impl RedbKv {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let db = Database::create(path).map_err(|e| KvError::Connection(e.to_string()))?;
        Self::init(db)
    }

    /// Open in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, KvError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| KvError::Connection(e.to_string()))?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, KvError> {
        let write_txn = db.begin_write().map_err(backend)?;
        {
            let _ = write_txn.open_table(SETTINGS_TABLE).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_blocking(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(SETTINGS_TABLE).map_err(backend)?;

        Ok(table
            .get(key)
            .map_err(backend)?
            .map(|guard| guard.value().to_vec()))
    }

    fn set_blocking(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(SETTINGS_TABLE).map_err(backend)?;
            table.insert(key, value).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;
        Ok(())
    }
}

fn backend(e: impl std::fmt::Display) -> KvError {
    KvError::Backend(e.to_string())
}

#[async_trait]
impl KvBackend for RedbKv {
    fn name(&self) -> &'static str {
        "redb"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.get_blocking(&key))
            .await
            .map_err(backend)?
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let this = self.clone();
        let key = key.to_string();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || this.set_blocking(&key, &value))
            .await
            .map_err(backend)?
    }
}

//! Redis/Valkey backend (primary)

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};

use super::kv::{KvBackend, KvError};

#[derive(Clone)]
pub struct RedisKv {
    pool: Pool,
    namespace: Option<String>,
}

impl RedisKv {
    /// Connect and verify the server answers PING
    pub async fn connect(
        url: &str,
        namespace: Option<String>,
        pool_size: usize,
    ) -> Result<Self, KvError> {
        let pool = Config::from_url(url)
            .builder()
            .map_err(|e| KvError::Connection(e.to_string()))?
            .max_size(pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        Ok(Self { pool, namespace })
    }

    fn prefixed_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        conn.get(self.prefixed_key(key))
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        conn.set::<_, _, ()>(self.prefixed_key(key), value)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running Redis at 127.0.0.1:6379"]
    async fn test_set_get() {
        let kv = RedisKv::connect("redis://127.0.0.1:6379", Some("usmn-test".to_string()), 2)
            .await
            .unwrap();

        kv.set("site_settings", b"{\"websiteName\":\"Shop\"}")
            .await
            .unwrap();
        let value = kv.get("site_settings").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"{\"websiteName\":\"Shop\"}"[..]));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on port 1
        let result = RedisKv::connect("redis://127.0.0.1:1", None, 1).await;
        assert!(matches!(result, Err(KvError::Connection(_))));
    }
}

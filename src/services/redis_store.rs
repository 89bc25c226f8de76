use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};

use crate::models::{AuthSession, OAuthResult};
use crate::services::session_store::{SessionStore, StoreError};

fn session_key(id: &str) -> String {
    format!("session:{}", id)
}

fn result_key(id: &str) -> String {
    format!("result:{}", id)
}

/// Networked backing for multi-instance deployments. Expiry is delegated to
/// the store (`SET .. EX`); `GETDEL` provides the single-key atomic take.
pub struct RedisStore {
    pool: Pool,
    ttl_seconds: u64,
}

impl RedisStore {
    pub fn new(url: &str, ttl_seconds: u64) -> Result<Self, StoreError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tracing::info!(
            "Redis session store initialized with TTL of {} seconds",
            ttl_seconds
        );
        Ok(Self { pool, ttl_seconds })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, self.ttl_seconds)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn save_session(&self, id: &str, session: AuthSession) -> Result<(), StoreError> {
        let json = serde_json::to_string(&session)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.set_with_ttl(&session_key(id), json).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<AuthSession>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(session_key(id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(session_key(id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn save_result(&self, id: &str, result: OAuthResult) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(&result).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.set_with_ttl(&result_key(id), json).await
    }

    async fn has_result(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        conn.exists(result_key(id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn take_result(&self, id: &str) -> Result<Option<OAuthResult>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = deadpool_redis::redis::cmd("GETDEL")
            .arg(result_key(id))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn sweep(&self) -> Result<u64, StoreError> {
        // Expiry is native to the backing store; nothing to purge here.
        Ok(0)
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

use crate::models::{AuthSession, OAuthResult};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Keyed, time-limited storage for in-flight authorization attempts and
/// their results. Sessions and results live in independent namespaces
/// addressed by the same session id; a result may outlive its session
/// record. Backing choice (process memory or a networked key-value store)
/// is a deployment decision and must not change this contract.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert, refreshing the TTL.
    async fn save_session(&self, id: &str, session: AuthSession) -> Result<(), StoreError>;

    /// Lookup. Must report absence once the entry is older than the TTL,
    /// even if the backing store has not physically evicted it yet.
    async fn get_session(&self, id: &str) -> Result<Option<AuthSession>, StoreError>;

    /// Idempotent removal.
    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;

    /// Upsert with TTL, independent namespace from sessions.
    async fn save_result(&self, id: &str, result: OAuthResult) -> Result<(), StoreError>;

    /// Existence check without consuming.
    async fn has_result(&self, id: &str) -> Result<bool, StoreError>;

    /// Atomic get-and-delete. Of two concurrent takers exactly one may
    /// observe a present result; this is what makes delivery at-most-once.
    async fn take_result(&self, id: &str) -> Result<Option<OAuthResult>, StoreError>;

    /// Explicit purge pass over expired entries. Returns the purged count.
    async fn sweep(&self) -> Result<u64, StoreError>;
}

struct StoredResult {
    result: OAuthResult,
    stored_at: DateTime<Utc>,
}

/// Single-process backing: two concurrent maps plus a periodic sweeper task.
pub struct MemoryStore {
    sessions: Arc<DashMap<String, AuthSession>>,
    results: Arc<DashMap<String, StoredResult>>,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new(ttl_seconds: u64) -> Self {
        let store = Self {
            sessions: Arc::new(DashMap::new()),
            results: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        };

        let sessions = store.sessions.clone();
        let results = store.results.clone();
        let ttl = store.ttl;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let purged = purge_expired(&sessions, &results, ttl);
                if purged > 0 {
                    tracing::info!(
                        purged,
                        sessions = sessions.len(),
                        results = results.len(),
                        "Swept expired store entries"
                    );
                }
            }
        });

        tracing::info!("Memory session store initialized with TTL of {} seconds", ttl_seconds);
        store
    }

    fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        let age = Utc::now()
            .signed_duration_since(created_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age >= self.ttl
    }
}

fn purge_expired(
    sessions: &DashMap<String, AuthSession>,
    results: &DashMap<String, StoredResult>,
    ttl: Duration,
) -> u64 {
    let now = Utc::now();
    let before = sessions.len() + results.len();
    let expired = |at: DateTime<Utc>| {
        now.signed_duration_since(at)
            .to_std()
            .unwrap_or(Duration::ZERO)
            >= ttl
    };
    sessions.retain(|_, session| !expired(session.created_at));
    results.retain(|_, stored| !expired(stored.stored_at));
    // Inserts may land mid-sweep; never report a negative purge count.
    before.saturating_sub(sessions.len() + results.len()) as u64
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, id: &str, session: AuthSession) -> Result<(), StoreError> {
        self.sessions.insert(id.to_string(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<AuthSession>, StoreError> {
        match self.sessions.get(id) {
            Some(session) if !self.is_expired(session.created_at) => Ok(Some(session.clone())),
            _ => Ok(None),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn save_result(&self, id: &str, result: OAuthResult) -> Result<(), StoreError> {
        self.results.insert(
            id.to_string(),
            StoredResult {
                result,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn has_result(&self, id: &str) -> Result<bool, StoreError> {
        match self.results.get(id) {
            Some(stored) if !self.is_expired(stored.stored_at) => Ok(true),
            _ => Ok(false),
        }
    }

    async fn take_result(&self, id: &str) -> Result<Option<OAuthResult>, StoreError> {
        // DashMap::remove is the atomicity point: concurrent takers race on
        // it and only one gets the entry.
        match self.results.remove(id) {
            Some((_, stored)) if !self.is_expired(stored.stored_at) => Ok(Some(stored.result)),
            _ => Ok(None),
        }
    }

    async fn sweep(&self) -> Result<u64, StoreError> {
        Ok(purge_expired(&self.sessions, &self.results, self.ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn session() -> AuthSession {
        AuthSession::new("state".to_string(), "verifier".to_string(), None)
    }

    fn result() -> OAuthResult {
        OAuthResult {
            tokens: json!({"access_token": "x"}),
            redirect_to: None,
        }
    }

    #[tokio::test]
    async fn absent_for_unknown_ids() {
        let store = MemoryStore::new(600);
        assert!(store.get_session("nope").await.unwrap().is_none());
        assert!(!store.has_result("nope").await.unwrap());
        assert!(store.take_result("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_get_delete_session() {
        let store = MemoryStore::new(600);
        store.save_session("id", session()).await.unwrap();
        let found = store.get_session("id").await.unwrap().unwrap();
        assert_eq!(found.state, "state");
        store.delete_session("id").await.unwrap();
        assert!(store.get_session("id").await.unwrap().is_none());
        // Deletion is idempotent.
        store.delete_session("id").await.unwrap();
    }

    #[tokio::test]
    async fn take_then_take_yields_exactly_once() {
        let store = MemoryStore::new(600);
        store.save_result("id", result()).await.unwrap();
        assert!(store.has_result("id").await.unwrap());

        let first = store.take_result("id").await.unwrap();
        assert_eq!(first.unwrap().tokens["access_token"], "x");

        assert!(store.take_result("id").await.unwrap().is_none());
        assert!(!store.has_result("id").await.unwrap());
    }

    #[tokio::test]
    async fn session_is_logically_expired_without_a_sweep() {
        let store = MemoryStore::new(600);
        let mut old = session();
        old.created_at = Utc::now() - ChronoDuration::seconds(601);
        store.save_session("old", old).await.unwrap();

        // No sweep has run, yet the read must report absence.
        assert!(store.get_session("old").await.unwrap().is_none());

        // And a sweep physically removes it.
        assert_eq!(store.sweep().await.unwrap(), 1);
        assert!(store.sessions.is_empty());
    }

    #[tokio::test]
    async fn sweep_purges_orphaned_results() {
        let store = MemoryStore::new(600);
        store.save_result("fresh", result()).await.unwrap();
        store.save_result("stale", result()).await.unwrap();
        store
            .results
            .get_mut("stale")
            .unwrap()
            .stored_at = Utc::now() - ChronoDuration::seconds(900);

        assert_eq!(store.sweep().await.unwrap(), 1);
        assert!(store.has_result("fresh").await.unwrap());
        assert!(!store.has_result("stale").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_takers_observe_at_most_one_result() {
        let store = Arc::new(MemoryStore::new(600));
        store.save_result("id", result()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.take_result("id").await.unwrap() },
            ));
        }

        let mut present = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                present += 1;
            }
        }
        assert_eq!(present, 1);
    }
}

//! Session management
//!
//! Sessions are opaque bearer tokens. The store maps the token digest to the
//! owning account ID with a TTL; revoking deletes the mapping, so the next
//! lookup misses immediately.

use anyhow::Result;
use async_trait::async_trait;
use common::cache::RedisPool;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::{
    credentials::CredentialVerifier,
    error::{AccountError, AccountResult},
    models::Account,
    repositories::AccountRepository,
    token,
};

/// Server-side session storage keyed by token digest
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Bind a token digest to an account for `ttl_seconds`
    async fn insert(&self, token_hash: &str, account_id: Uuid, ttl_seconds: u64) -> Result<()>;

    /// Account bound to a live token digest
    async fn lookup(&self, token_hash: &str) -> Result<Option<Uuid>>;

    /// Revoke one token; unknown digests are ignored.
    /// Returns the account the token belonged to, if any.
    async fn remove(&self, token_hash: &str) -> Result<Option<Uuid>>;

    /// Revoke every token of an account, returning how many were live
    async fn remove_all(&self, account_id: Uuid) -> Result<u64>;
}

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    fn session_key(token_hash: &str) -> String {
        format!("session:{}", token_hash)
    }

    fn index_key(account_id: Uuid) -> String {
        format!("account_sessions:{}", account_id)
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.redis_pool.health_check().await?)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, token_hash: &str, account_id: Uuid, ttl_seconds: u64) -> Result<()> {
        self.redis_pool
            .set_indexed(
                &Self::session_key(token_hash),
                &account_id.to_string(),
                ttl_seconds,
                &Self::index_key(account_id),
            )
            .await?;
        Ok(())
    }

    async fn lookup(&self, token_hash: &str) -> Result<Option<Uuid>> {
        let value = self.redis_pool.get(&Self::session_key(token_hash)).await?;

        value
            .map(|id| Uuid::parse_str(&id))
            .transpose()
            .map_err(|e| anyhow::anyhow!("Corrupt session entry: {}", e))
    }

    async fn remove(&self, token_hash: &str) -> Result<Option<Uuid>> {
        let key = Self::session_key(token_hash);

        match self.lookup(token_hash).await? {
            Some(account_id) => {
                self.redis_pool
                    .delete_indexed(&key, &Self::index_key(account_id))
                    .await?;
                Ok(Some(account_id))
            }
            None => {
                self.redis_pool.delete(&key).await?;
                Ok(None)
            }
        }
    }

    async fn remove_all(&self, account_id: Uuid) -> Result<u64> {
        Ok(self
            .redis_pool
            .delete_all_indexed(&Self::index_key(account_id))
            .await?)
    }
}

struct MemorySession {
    account_id: Uuid,
    expires_at: Instant,
}

/// In-process session store
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, MemorySession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token_hash: &str, account_id: Uuid, ttl_seconds: u64) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token_hash.to_string(),
            MemorySession {
                account_id,
                expires_at: now + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn lookup(&self, token_hash: &str) -> Result<Option<Uuid>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(token_hash)
            .filter(|session| session.expires_at > Instant::now())
            .map(|session| session.account_id))
    }

    async fn remove(&self, token_hash: &str) -> Result<Option<Uuid>> {
        let mut sessions = self.sessions.lock().await;
        Ok(sessions
            .remove(token_hash)
            .filter(|session| session.expires_at > Instant::now())
            .map(|session| session.account_id))
    }

    async fn remove_all(&self, account_id: Uuid) -> Result<u64> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.account_id != account_id);
        Ok((before - sessions.len()) as u64)
    }
}

/// Freshly issued session handed back to the client
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip)]
    pub account_id: Uuid,
}

/// Issues, resolves and revokes session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    verifier: CredentialVerifier,
    accounts: Arc<dyn AccountRepository>,
    store: Arc<dyn SessionStore>,
    ttl_seconds: u64,
}

impl SessionIssuer {
    pub fn new(
        verifier: CredentialVerifier,
        accounts: Arc<dyn AccountRepository>,
        store: Arc<dyn SessionStore>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            verifier,
            accounts,
            store,
            ttl_seconds,
        }
    }

    /// Verify credentials and mint a new token bound to the account
    pub async fn login(&self, username: &str, password: &str) -> AccountResult<IssuedSession> {
        let account = self.verifier.verify(username, password).await?;

        let token = token::generate();
        self.store
            .insert(&token::digest(&token), account.id, self.ttl_seconds)
            .await?;

        info!("Created session for account: {}", account.id);

        Ok(IssuedSession {
            token,
            token_type: "Bearer",
            expires_in: self.ttl_seconds,
            account_id: account.id,
        })
    }

    /// Resolve a bearer token to its live, active account
    pub async fn resolve(&self, token: &str) -> AccountResult<Account> {
        let account_id = self
            .store
            .lookup(&token::digest(token))
            .await?
            .ok_or(AccountError::Unauthenticated)?;

        match self.accounts.find_by_id(account_id).await? {
            Some(account) if account.is_active => Ok(account),
            _ => Err(AccountError::Unauthenticated),
        }
    }

    /// Revoke a token. Unknown or already revoked tokens are a no-op.
    pub async fn logout(&self, token: &str) -> AccountResult<Option<Uuid>> {
        let account_id = self.store.remove(&token::digest(token)).await?;

        if let Some(account_id) = account_id {
            info!("Revoked session for account: {}", account_id);
        }

        Ok(account_id)
    }

    /// Revoke every session of an account
    pub async fn revoke_all(&self, account_id: Uuid) -> AccountResult<u64> {
        let revoked = self.store.remove_all(account_id).await?;
        info!("Revoked {} session(s) for account: {}", revoked, account_id);
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_lookup_and_remove() {
        let store = MemorySessionStore::new();
        let account_id = Uuid::new_v4();

        store.insert("digest", account_id, 60).await.unwrap();
        assert_eq!(store.lookup("digest").await.unwrap(), Some(account_id));

        assert_eq!(store.remove("digest").await.unwrap(), Some(account_id));
        assert_eq!(store.lookup("digest").await.unwrap(), None);
        assert_eq!(store.remove("digest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_expires_entries() {
        let store = MemorySessionStore::new();
        store.insert("digest", Uuid::new_v4(), 0).await.unwrap();

        assert_eq!(store.lookup("digest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_remove_all_is_scoped_to_account() {
        let store = MemorySessionStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        store.insert("a", owner, 60).await.unwrap();
        store.insert("b", owner, 60).await.unwrap();
        store.insert("c", other, 60).await.unwrap();

        assert_eq!(store.remove_all(owner).await.unwrap(), 2);
        assert_eq!(store.lookup("a").await.unwrap(), None);
        assert_eq!(store.lookup("c").await.unwrap(), Some(other));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_redis_store_revocation_is_immediate() -> Result<()> {
        let config = common::cache::RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };
        let store = RedisSessionStore::new(RedisPool::new(&config).await?);
        let account_id = Uuid::new_v4();
        let digest = token::digest(&token::generate());

        store.insert(&digest, account_id, 60).await?;
        assert_eq!(store.lookup(&digest).await?, Some(account_id));

        store.remove(&digest).await?;
        assert_eq!(store.lookup(&digest).await?, None);
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config;
use crate::database::models::User;

/// Process-wide cache of resolved sessions, keyed by token hash.
pub static SESSION_CACHE: Lazy<SessionCache> = Lazy::new(|| {
    SessionCache::new(Duration::from_secs(
        config::config().security.session_cache_ttl_secs,
    ))
});

struct CacheEntry {
    user: User,
    cached_at: Instant,
    /// When the underlying session itself ends
    expires: DateTime<Utc>,
}

impl CacheEntry {
    fn is_live(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl && self.expires > Utc::now()
    }
}

/// Expiring map from session token hash to the user it resolved to.
///
/// An entry lives until the cache TTL or the session's own expiry, whichever
/// comes first. Entries are dropped lazily on read and in bulk by `purge_expired`; the
/// user-scoped eviction is what makes admin changes and password resets take
/// effect before the TTL runs out.
pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<User> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(self.ttl) => {
                    return Some(entry.user.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired
        self.entries.write().await.remove(key);
        None
    }

    pub async fn insert(&self, key: String, user: User, expires: DateTime<Utc>) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                user,
                cached_at: Instant::now(),
                expires,
            },
        );
    }

    pub async fn evict(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drop every cached session belonging to `user_id`
    pub async fn evict_user(&self, user_id: Uuid) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.user.id != user_id);
    }

    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.is_live(ttl));
        before - entries.len()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, UserStatus};

    fn later() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::hours(1)
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: None,
            email: "cached@example.com".to_string(),
            email_verified: None,
            image: None,
            password_hash: None,
            role: Role::User,
            status: UserStatus::Active,
            is_pro: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn returns_fresh_entries() {
        let cache = SessionCache::new(Duration::from_secs(60));
        let u = user();
        cache.insert("k".to_string(), u.clone(), later()).await;
        assert_eq!(cache.get("k").await.map(|c| c.id), Some(u.id));
        assert!(cache.get("other").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = SessionCache::new(Duration::from_millis(20));
        cache.insert("k".to_string(), user(), later()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn evicts_all_sessions_of_a_user() {
        let cache = SessionCache::new(Duration::from_secs(60));
        let a = user();
        let b = user();
        cache.insert("a1".to_string(), a.clone(), later()).await;
        cache.insert("a2".to_string(), a.clone(), later()).await;
        cache.insert("b1".to_string(), b.clone(), later()).await;

        cache.evict_user(a.id).await;
        assert!(cache.get("a1").await.is_none());
        assert!(cache.get("a2").await.is_none());
        assert!(cache.get("b1").await.is_some());
    }

    #[tokio::test]
    async fn session_expiry_beats_cache_ttl() {
        let cache = SessionCache::new(Duration::from_secs(60));
        let ending = Utc::now() + chrono::Duration::milliseconds(30);
        cache.insert("k".to_string(), user(), ending).await;
        assert!(cache.get("k").await.is_some());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache = SessionCache::new(Duration::ZERO);
        cache.insert("k".to_string(), user(), later()).await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn purge_counts_removed_entries() {
        let cache = SessionCache::new(Duration::from_millis(10));
        cache.insert("x".to_string(), user(), later()).await;
        cache.insert("y".to_string(), user(), later()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.purge_expired().await, 2);
    }
}

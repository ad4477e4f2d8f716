//! Cache — thin async wrapper over the `redis` crate, behind a `CacheStore`
//! trait so the rate limiter, usage meter, and catalog loader can be driven
//! by an in-memory fake in tests without a live Redis.
//!
//! Carries the generic get/set/ttl helpers the catalog and usage-meter caches
//! use, plus the sliding-window primitives the rate limiter needs. Every
//! operation returns `Result<_, CacheError>` — callers decide fail-open vs.
//! fall-through per the error design (this module never decides that itself).

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Outcome of a sliding-window rate-limit check (spec 4.E).
#[derive(Debug, Clone, Copy)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    pub remaining: u64,
    pub reset: i64,
    pub limit: u64,
}

/// The cache seam. `RedisCache` is the production backend; `InMemoryCache`
/// (test-only) backs pipeline tests that exercise the rate limiter and usage
/// meter without a live Redis.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_raw_ex(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), CacheError>;
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Sliding-window check per spec 4.E: evict stale members, read
    /// cardinality, deny if at/over `limit`, otherwise record `now` and
    /// extend the TTL.
    async fn sliding_window_check(
        &self,
        principal_id: &str,
        window_seconds: u64,
        limit: u64,
    ) -> Result<RateLimitOutcome, CacheError>;
}

/// JSON-typed convenience wrapper over `CacheStore::get_raw`. A free function
/// rather than a trait method since generic methods aren't object-safe.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// JSON-typed convenience wrapper over `CacheStore::set_raw_ex`.
pub async fn set_json_ex<T: Serialize + Sync>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl_seconds: u64,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set_raw_ex(key, raw, ttl_seconds).await
}

/// Pure sliding-window decision: given the window's current member count and
/// the oldest surviving member's timestamp, decide allow/deny and `reset`.
/// Split out from `RedisCache::sliding_window_check` so the windowing
/// algorithm itself is unit-testable without a live Redis connection.
fn evaluate_window(
    count: u64,
    limit: u64,
    oldest_existing_score: Option<i64>,
    now_secs: i64,
    window_seconds: u64,
) -> RateLimitOutcome {
    if count >= limit {
        let reset = reset_from_oldest(oldest_existing_score, now_secs, window_seconds);
        return RateLimitOutcome {
            allowed: false,
            remaining: 0,
            reset,
            limit,
        };
    }

    // Once admitted, the oldest member is whatever it was before (if the
    // window wasn't empty) or the entry we are about to add.
    let oldest_after_insert = oldest_existing_score.or(Some(now_secs));
    let reset = reset_from_oldest(oldest_after_insert, now_secs, window_seconds);
    RateLimitOutcome {
        allowed: true,
        remaining: limit.saturating_sub(count + 1),
        reset,
        limit,
    }
}

fn reset_from_oldest(oldest: Option<i64>, now_secs: i64, window_seconds: u64) -> i64 {
    oldest
        .map(|score| (score + window_seconds as i64) - now_secs)
        .unwrap_or(window_seconds as i64)
        .max(0)
}

/// Production cache backend.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_raw_ex(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn sliding_window_check(
        &self,
        principal_id: &str,
        window_seconds: u64,
        limit: u64,
    ) -> Result<RateLimitOutcome, CacheError> {
        let mut conn = self.conn.clone();
        let key = format!("rate:limit:{principal_id}:{window_seconds}");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let now_secs = now.as_secs() as i64;
        let now_nanos = now.as_nanos();
        let window_start = now_secs - window_seconds as i64;

        conn.zrembyscore::<_, i64, i64, ()>(&key, i64::MIN, window_start)
            .await?;
        let count: u64 = conn.zcard(&key).await?;
        let oldest: Vec<(String, f64)> = conn.zrange_withscores(&key, 0, 0).await?;
        let oldest_score = oldest.first().map(|(_, score)| *score as i64);

        let outcome = evaluate_window(count, limit, oldest_score, now_secs, window_seconds);

        if outcome.allowed {
            conn.zadd::<_, f64, _, ()>(&key, now_nanos.to_string(), now_secs as f64)
                .await?;
            conn.expire::<_, ()>(&key, window_seconds as i64).await?;
        }

        Ok(outcome)
    }
}

/// In-memory cache fake for tests: a plain mutex-guarded map plus a
/// timestamp-list simulation of the sliding-window sorted set, driven by the
/// same `evaluate_window` decision logic the production backend uses.
#[cfg(test)]
pub struct InMemoryCache {
    values: std::sync::Mutex<std::collections::HashMap<String, String>>,
    windows: std::sync::Mutex<std::collections::HashMap<String, Vec<i64>>>,
}

#[cfg(test)]
impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            values: std::sync::Mutex::new(std::collections::HashMap::new()),
            windows: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_raw_ex(&self, key: &str, value: String, _ttl_seconds: u64) -> Result<(), CacheError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn sliding_window_check(
        &self,
        principal_id: &str,
        window_seconds: u64,
        limit: u64,
    ) -> Result<RateLimitOutcome, CacheError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let now_secs = now.as_secs() as i64;
        let window_start = now_secs - window_seconds as i64;

        let mut windows = self.windows.lock().unwrap();
        let entry = windows.entry(principal_id.to_string()).or_default();
        entry.retain(|&t| t > window_start);

        let count = entry.len() as u64;
        let oldest_score = entry.iter().min().copied();
        let outcome = evaluate_window(count, limit, oldest_score, now_secs, window_seconds);

        if outcome.allowed {
            entry.push(now_secs);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_window_allows_under_limit() {
        let outcome = evaluate_window(3, 10, Some(1000), 1010, 60);
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 6);
    }

    #[test]
    fn test_evaluate_window_denies_at_limit() {
        let outcome = evaluate_window(10, 10, Some(1000), 1010, 60);
        assert!(!outcome.allowed);
        assert_eq!(outcome.remaining, 0);
        assert!(outcome.reset > 0);
    }

    #[test]
    fn test_evaluate_window_reset_counts_down_to_zero_floor() {
        // oldest member's window already expired relative to now: reset floors at 0.
        let outcome = evaluate_window(10, 10, Some(0), 1_000_000, 60);
        assert_eq!(outcome.reset, 0);
    }

    #[test]
    fn test_evaluate_window_empty_window_uses_just_inserted_entry() {
        let outcome = evaluate_window(0, 5, None, 1000, 60);
        assert!(outcome.allowed);
        assert_eq!(outcome.reset, 60);
    }

    #[tokio::test]
    async fn test_in_memory_cache_get_set_invalidate_round_trip() {
        let cache = InMemoryCache::new();
        set_json_ex(&cache, "k", &42i32, 60).await.unwrap();
        assert_eq!(get_json::<i32>(&cache, "k").await.unwrap(), Some(42));
        cache.invalidate("k").await.unwrap();
        assert_eq!(get_json::<i32>(&cache, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_cache_sliding_window_breach() {
        let cache = InMemoryCache::new();
        for _ in 0..3 {
            let outcome = cache.sliding_window_check("p1", 60, 3).await.unwrap();
            assert!(outcome.allowed);
        }
        let breach = cache.sliding_window_check("p1", 60, 3).await.unwrap();
        assert!(!breach.allowed);
        assert_eq!(breach.remaining, 0);
        assert!(breach.reset > 0);
    }

    #[tokio::test]
    async fn test_in_memory_cache_windows_are_independent_per_principal() {
        let cache = InMemoryCache::new();
        for _ in 0..3 {
            assert!(cache.sliding_window_check("p1", 60, 3).await.unwrap().allowed);
        }
        assert!(!cache.sliding_window_check("p1", 60, 3).await.unwrap().allowed);
        assert!(cache.sliding_window_check("p2", 60, 3).await.unwrap().allowed);
    }
}

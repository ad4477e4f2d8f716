//! The weekly free-tier usage counter: a genuine rolling 7-day window keyed
//! by `(principal_id, window_start)`, cache-fronted with a fall-through to
//! Postgres on cache miss or cache failure. Premium principals never touch
//! this module on the hot path.

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{self, CacheStore};
use crate::db::Database;
use crate::models::usage::UsageCounterRow;

fn cache_key(principal_id: Uuid) -> String {
    format!("user:usage:{principal_id}")
}

/// Fetches the current window's counter, creating one if none exists yet.
/// Cache read first; on miss or cache failure, falls through to the database.
pub async fn current(
    db: &dyn Database,
    cache: &dyn CacheStore,
    principal_id: Uuid,
    cache_ttl_seconds: u64,
) -> Result<UsageCounterRow, sqlx::Error> {
    let key = cache_key(principal_id);

    match cache::get_json::<UsageCounterRow>(cache, &key).await {
        Ok(Some(row)) => return Ok(row),
        Ok(None) => {}
        Err(e) => warn!(error = %e, %principal_id, "usage cache read failed, falling through to database"),
    }

    let row = fetch_or_create(db, principal_id).await?;

    if let Err(e) = cache::set_json_ex(cache, &key, &row, cache_ttl_seconds).await {
        warn!(error = %e, %principal_id, "usage cache populate failed");
    }

    Ok(row)
}

async fn fetch_or_create(db: &dyn Database, principal_id: Uuid) -> Result<UsageCounterRow, sqlx::Error> {
    if let Some(row) = db.usage_counter_lookup(principal_id).await? {
        return Ok(row);
    }

    let today = chrono::Utc::now().date_naive();
    db.usage_counter_create(principal_id, today).await
}

/// `true` once `row.count` has reached `limit`.
pub fn is_exceeded(row: &UsageCounterRow, limit: i64) -> bool {
    row.count >= limit
}

/// Unconditional increment of the current window's row, invalidating the
/// cache entry afterward. Best-effort: failures are logged, never surfaced,
/// since this runs after the response-bearing collision already succeeded.
pub async fn increment(db: &dyn Database, cache: &dyn CacheStore, principal_id: Uuid, window_start: NaiveDate) {
    match db.usage_counter_increment(principal_id, window_start).await {
        Ok(0) => {
            warn!(%principal_id, %window_start, "usage counter increment matched no row");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, %principal_id, "usage counter increment failed");
            return;
        }
    }

    if let Err(e) = cache.invalidate(&cache_key(principal_id)).await {
        warn!(error = %e, %principal_id, "usage cache invalidate failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::db::InMemoryDatabase;
    use chrono::Utc;

    fn row(count: i64) -> UsageCounterRow {
        UsageCounterRow {
            principal_id: Uuid::new_v4(),
            window_start: Utc::now().date_naive(),
            count,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_exceeded_at_limit() {
        assert!(is_exceeded(&row(5), 5));
        assert!(!is_exceeded(&row(4), 5));
    }

    #[test]
    fn test_is_exceeded_beyond_limit() {
        assert!(is_exceeded(&row(9), 5));
    }

    #[tokio::test]
    async fn test_current_creates_row_on_first_consult() {
        let db = InMemoryDatabase::new();
        let cache = InMemoryCache::new();
        let principal_id = Uuid::new_v4();

        let row = current(&db, &cache, principal_id, 300).await.unwrap();
        assert_eq!(row.count, 0);
        assert!(!is_exceeded(&row, 5));
    }

    #[tokio::test]
    async fn test_current_reads_through_cache_on_second_call() {
        let db = InMemoryDatabase::new();
        let cache = InMemoryCache::new();
        let principal_id = Uuid::new_v4();

        let first = current(&db, &cache, principal_id, 300).await.unwrap();
        increment(&db, &cache, principal_id, first.window_start).await;

        // Cache was invalidated by increment, so this re-reads the DB and
        // should reflect the increment.
        let second = current(&db, &cache, principal_id, 300).await.unwrap();
        assert_eq!(second.count, 1);
    }

    #[tokio::test]
    async fn test_seeded_usage_at_limit_is_exceeded() {
        let db = InMemoryDatabase::new();
        let cache = InMemoryCache::new();
        let principal_id = Uuid::new_v4();
        let today = Utc::now().date_naive();
        db.seed_usage(principal_id, today, 5);

        let row = current(&db, &cache, principal_id, 300).await.unwrap();
        assert!(is_exceeded(&row, 5));
    }

    #[tokio::test]
    async fn test_increment_on_missing_row_does_not_invalidate_cache() {
        let db = InMemoryDatabase::new();
        let cache = InMemoryCache::new();
        let principal_id = Uuid::new_v4();
        let key = cache_key(principal_id);
        cache::set_json_ex(&cache, &key, &row(2), 300).await.unwrap();

        increment(&db, &cache, principal_id, Utc::now().date_naive()).await;

        // No row existed in the DB to increment, so the stale cache entry is
        // left in place rather than being invalidated.
        assert!(cache::get_json::<UsageCounterRow>(&cache, &key)
            .await
            .unwrap()
            .is_some());
    }
}

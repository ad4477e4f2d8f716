//! Database access behind a `Database` trait so the pipeline, quota modules,
//! and auth extractor can be driven by an in-memory fake in tests without a
//! live Postgres.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::domain::Domain;
use crate::models::principal::Tier;
use crate::models::session::SessionRow;
use crate::models::usage::UsageCounterRow;

/// Creates and returns a PostgreSQL connection pool.
///
/// Caps follow the resource policy in the concurrency design: 25 open
/// connections, 5 kept idle, 5-minute max lifetime per connection.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(25)
        .min_connections(5)
        .max_lifetime(Duration::from_secs(300))
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// The persistence seam. `PgDatabase` is the production backend; `InMemoryDatabase`
/// (test-only) backs pipeline tests that exercise quota and persistence without
/// a live Postgres.
#[async_trait]
pub trait Database: Send + Sync {
    /// Resolves a principal's authoritative tier: the `principals` table is
    /// the source of truth, re-consulted on every request (component L)
    /// rather than trusted from the bearer token alone (component J), so a
    /// tier change takes effect without waiting for the token to expire. A
    /// principal seen for the first time is bootstrapped with the token's
    /// claimed tier.
    async fn resolve_principal_tier(&self, id: Uuid, claimed: Tier) -> Result<Tier, sqlx::Error>;

    async fn usage_counter_lookup(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<UsageCounterRow>, sqlx::Error>;

    async fn usage_counter_create(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<UsageCounterRow, sqlx::Error>;

    /// Returns the number of rows updated (0 or 1).
    async fn usage_counter_increment(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<u64, sqlx::Error>;

    async fn insert_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        request: Value,
        result: Value,
        created_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    async fn session_history(
        &self,
        principal_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SessionRow>, sqlx::Error>;

    /// Returns the number of rows updated (0 or 1).
    async fn rate_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        rating: i32,
        notes: Option<String>,
    ) -> Result<u64, sqlx::Error>;

    async fn load_domains(&self) -> Result<Vec<Domain>, sqlx::Error>;
}

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn resolve_principal_tier(&self, id: Uuid, claimed: Tier) -> Result<Tier, sqlx::Error> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT tier FROM principals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some((tier_str,)) = existing {
            return Ok(tier_str.parse().unwrap_or(Tier::Free));
        }

        sqlx::query(
            "INSERT INTO principals (id, tier) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(claimed.as_str())
        .execute(&self.pool)
        .await?;

        Ok(claimed)
    }

    async fn usage_counter_lookup(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<UsageCounterRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT principal_id, window_start, count, updated_at FROM usage_counters \
             WHERE principal_id = $1 AND window_start > (now() - interval '7 days')::date \
             ORDER BY window_start DESC LIMIT 1",
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn usage_counter_create(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<UsageCounterRow, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO usage_counters (principal_id, window_start, count, updated_at) \
             VALUES ($1, $2, 0, now()) \
             ON CONFLICT (principal_id, window_start) DO UPDATE SET principal_id = EXCLUDED.principal_id \
             RETURNING principal_id, window_start, count, updated_at",
        )
        .bind(principal_id)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
    }

    async fn usage_counter_increment(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE usage_counters SET count = count + 1, updated_at = now() \
             WHERE principal_id = $1 AND window_start = $2",
        )
        .bind(principal_id)
        .bind(window_start)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        request: Value,
        result: Value,
        created_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, principal_id, request, result, rating, notes, created_at) \
             VALUES ($1, $2, $3, $4, NULL, NULL, $5)",
        )
        .bind(id)
        .bind(principal_id)
        .bind(request)
        .bind(result)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn session_history(
        &self,
        principal_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, principal_id, request, result, rating, notes, created_at FROM sessions \
             WHERE principal_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(principal_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn rate_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        rating: i32,
        notes: Option<String>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET rating = $1, notes = $2 WHERE id = $3 AND principal_id = $4",
        )
        .bind(rating)
        .bind(notes)
        .bind(id)
        .bind(principal_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn load_domains(&self) -> Result<Vec<Domain>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, category, description, keywords, examples, intensities, tier \
             FROM domains ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// In-memory database fake for tests: no I/O, guarded by plain mutexes.
#[cfg(test)]
pub struct InMemoryDatabase {
    principals: std::sync::Mutex<std::collections::HashMap<Uuid, Tier>>,
    usage_counters: std::sync::Mutex<std::collections::HashMap<(Uuid, NaiveDate), UsageCounterRow>>,
    sessions: std::sync::Mutex<Vec<SessionRow>>,
    domains: std::sync::Mutex<Vec<Domain>>,
}

#[cfg(test)]
impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            principals: std::sync::Mutex::new(std::collections::HashMap::new()),
            usage_counters: std::sync::Mutex::new(std::collections::HashMap::new()),
            sessions: std::sync::Mutex::new(Vec::new()),
            domains: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_domains(domains: Vec<Domain>) -> Self {
        let db = Self::new();
        *db.domains.lock().unwrap() = domains;
        db
    }

    /// Test helper: seeds a usage-counter row directly, bypassing `current`'s
    /// create-on-miss path, so tests can start a principal already at or
    /// over quota.
    pub fn seed_usage(&self, principal_id: Uuid, window_start: NaiveDate, count: i64) {
        self.usage_counters.lock().unwrap().insert(
            (principal_id, window_start),
            UsageCounterRow {
                principal_id,
                window_start,
                count,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Database for InMemoryDatabase {
    async fn resolve_principal_tier(&self, id: Uuid, claimed: Tier) -> Result<Tier, sqlx::Error> {
        let mut principals = self.principals.lock().unwrap();
        Ok(*principals.entry(id).or_insert(claimed))
    }

    async fn usage_counter_lookup(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<UsageCounterRow>, sqlx::Error> {
        Ok(self
            .usage_counters
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.principal_id == principal_id)
            .max_by_key(|row| row.window_start)
            .cloned())
    }

    async fn usage_counter_create(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<UsageCounterRow, sqlx::Error> {
        let mut counters = self.usage_counters.lock().unwrap();
        let row = counters
            .entry((principal_id, window_start))
            .or_insert_with(|| UsageCounterRow {
                principal_id,
                window_start,
                count: 0,
                updated_at: Utc::now(),
            });
        Ok(row.clone())
    }

    async fn usage_counter_increment(
        &self,
        principal_id: Uuid,
        window_start: NaiveDate,
    ) -> Result<u64, sqlx::Error> {
        let mut counters = self.usage_counters.lock().unwrap();
        match counters.get_mut(&(principal_id, window_start)) {
            Some(row) => {
                row.count += 1;
                row.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        request: Value,
        result: Value,
        created_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        self.sessions.lock().unwrap().push(SessionRow {
            id,
            principal_id,
            request,
            result,
            rating: None,
            notes: None,
            created_at,
        });
        Ok(())
    }

    async fn session_history(
        &self,
        principal_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let mut rows: Vec<SessionRow> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.principal_id == principal_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn rate_session(
        &self,
        id: Uuid,
        principal_id: Uuid,
        rating: i32,
        notes: Option<String>,
    ) -> Result<u64, sqlx::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions
            .iter_mut()
            .find(|s| s.id == id && s.principal_id == principal_id)
        {
            Some(session) => {
                session.rating = Some(rating);
                session.notes = notes;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn load_domains(&self) -> Result<Vec<Domain>, sqlx::Error> {
        Ok(self.domains.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_principal_tier_bootstraps_on_first_sight() {
        let db = InMemoryDatabase::new();
        let id = Uuid::new_v4();
        assert_eq!(db.resolve_principal_tier(id, Tier::Pro).await.unwrap(), Tier::Pro);
    }

    #[tokio::test]
    async fn test_resolve_principal_tier_ignores_claimed_tier_once_recorded() {
        let db = InMemoryDatabase::new();
        let id = Uuid::new_v4();
        db.resolve_principal_tier(id, Tier::Pro).await.unwrap();
        // A later token claiming "free" (e.g. a stale/forged token) does not
        // override the tier already on record.
        assert_eq!(db.resolve_principal_tier(id, Tier::Free).await.unwrap(), Tier::Pro);
    }

    #[tokio::test]
    async fn test_usage_counter_increment_on_missing_row_reports_zero_rows() {
        let db = InMemoryDatabase::new();
        let affected = db
            .usage_counter_increment(Uuid::new_v4(), Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_usage_counter_create_then_increment_round_trip() {
        let db = InMemoryDatabase::new();
        let id = Uuid::new_v4();
        let today = Utc::now().date_naive();
        let row = db.usage_counter_create(id, today).await.unwrap();
        assert_eq!(row.count, 0);
        let affected = db.usage_counter_increment(id, today).await.unwrap();
        assert_eq!(affected, 1);
        let row = db.usage_counter_lookup(id).await.unwrap().unwrap();
        assert_eq!(row.count, 1);
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per principal per rolling 7-day window (design note (a)/(b): the
/// window is a genuine rolling window anchored at `window_start`, not an ISO
/// calendar week). Created lazily on first consult.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageCounterRow {
    pub principal_id: Uuid,
    pub window_start: NaiveDate,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Response body for `GET /collisions/usage`.
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub tier: String,
    pub used: i64,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    pub reset_at: Option<DateTime<Utc>>,
    pub unlimited: bool,
}

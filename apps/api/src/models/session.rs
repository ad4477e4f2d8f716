use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted generation: the request that produced it, the result, and any
/// rating/notes the owning principal later applied. Owned by the principal;
/// queryable in reverse-chronological order via `GET /collisions/history`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub request: Value,
    pub result: Value,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateSessionRequest {
    pub rating: i32,
    pub notes: Option<String>,
}

impl RateSessionRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_in_range_is_valid() {
        for r in 1..=5 {
            assert!(RateSessionRequest {
                rating: r,
                notes: None
            }
            .validate()
            .is_ok());
        }
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        assert!(RateSessionRequest {
            rating: 0,
            notes: None
        }
        .validate()
        .is_err());
        assert!(RateSessionRequest {
            rating: 6,
            notes: None
        }
        .validate()
        .is_err());
    }
}

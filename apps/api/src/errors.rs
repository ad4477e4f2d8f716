#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// `cache_error` and `llm_error` from the error design are deliberately absent here:
/// they never reach the client directly. A cache failure in the rate limiter fails
/// open, a cache failure in the usage meter falls through to the database, and an
/// LLM failure falls back to deterministic enrichment — all handled at the call site.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Usage limit exceeded")]
    UsageLimitExceeded,

    #[error("Rate limit exceeded")]
    RateLimitExceeded { remaining: u64, reset: i64, limit: u64 },

    #[error("Premium required")]
    PremiumRequired,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Collision generation failed: {0}")]
    CollisionGenerationFailed(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The kebab-case kind used in the error envelope and for log correlation.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_failed",
            AppError::Unauthorized => "unauthorized",
            AppError::UsageLimitExceeded => "usage_limit_exceeded",
            AppError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            AppError::PremiumRequired => "premium_required",
            AppError::Database(_) => "database_error",
            AppError::CollisionGenerationFailed(_) => "collision_generation_failed",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UsageLimitExceeded => StatusCode::PAYMENT_REQUIRED,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::PremiumRequired => StatusCode::PAYMENT_REQUIRED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::CollisionGenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::UsageLimitExceeded => {
                "Weekly usage limit exceeded for the free tier".to_string()
            }
            AppError::RateLimitExceeded { .. } => "Too many requests".to_string(),
            AppError::PremiumRequired => "This endpoint requires a pro or team tier".to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::CollisionGenerationFailed(msg) => {
                tracing::error!("Collision generation failed: {msg}");
                "Failed to generate a collision".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = status.as_u16();
        let kind = self.kind();
        let rate_limit_headers = if let AppError::RateLimitExceeded {
            remaining,
            reset,
            limit,
        } = &self
        {
            Some((*limit, *remaining, *reset))
        } else {
            None
        };
        let message = self.message();

        let body = Json(json!({
            "error": kind,
            "message": message,
            "code": code,
        }));

        let mut response = (status, body).into_response();
        if let Some((limit, remaining, reset)) = rate_limit_headers {
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limit.into());
            headers.insert("X-RateLimit-Remaining", remaining.into());
            headers.insert("X-RateLimit-Reset", reset.into());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_limit_exceeded_maps_to_402() {
        let err = AppError::UsageLimitExceeded;
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.kind(), "usage_limit_exceeded");
    }

    #[test]
    fn test_rate_limit_exceeded_maps_to_429() {
        let err = AppError::RateLimitExceeded {
            remaining: 0,
            reset: 42,
            limit: 10,
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.kind(), "rate_limit_exceeded");
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthorized.kind(), "unauthorized");
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = AppError::Validation("bad field".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "validation_failed");
    }

    #[test]
    fn test_premium_required_maps_to_402() {
        assert_eq!(
            AppError::PremiumRequired.status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(AppError::PremiumRequired.kind(), "premium_required");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::NotFound("session not found".to_string());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "not_found");
    }
}

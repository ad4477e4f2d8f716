use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::collision::CollisionRequest;
use crate::models::principal::Principal;
use crate::models::session::{RateSessionRequest, SessionRow};
use crate::models::usage::UsageResponse;
use crate::pipeline::{self, RateLimitHeaders};
use crate::quota::usage_meter;
use crate::state::AppState;

fn with_rate_limit_headers(rate_limit: &RateLimitHeaders, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from(rate_limit.limit),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from(rate_limit.remaining),
    );
    headers.insert("X-RateLimit-Reset", HeaderValue::from(rate_limit.reset));
    response
}

pub async fn generate(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CollisionRequest>,
) -> Result<Response, AppError> {
    request.validate().map_err(AppError::Validation)?;

    let outcome = pipeline::generate(&state, &principal, &request).await?;
    let response = Json(outcome.result).into_response();
    Ok(with_rate_limit_headers(&outcome.rate_limit, response))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<i64>,
}

pub async fn history(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SessionRow>>, AppError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let rows = state
        .db
        .session_history(principal.id, limit)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(rows))
}

pub async fn rate(
    State(state): State<AppState>,
    principal: Principal,
    Path(session_id): Path<Uuid>,
    Json(body): Json<RateSessionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    body.validate().map_err(AppError::Validation)?;

    let rows_affected = state
        .db
        .rate_session(session_id, principal.id, body.rating, body.notes.clone())
        .await
        .map_err(AppError::Database)?;

    if rows_affected == 0 {
        return Err(AppError::NotFound("session not found".to_string()));
    }

    Ok(Json(json!({ "message": "rating saved" })))
}

pub async fn usage(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UsageResponse>, AppError> {
    if principal.tier.is_premium() {
        return Ok(Json(UsageResponse {
            tier: principal.tier.as_str().to_string(),
            used: 0,
            limit: None,
            remaining: None,
            reset_at: None,
            unlimited: true,
        }));
    }

    let row = usage_meter::current(
        &state.db,
        &state.cache,
        principal.id,
        state.config.usage_cache_ttl_seconds,
    )
    .await
    .map_err(AppError::Database)?;

    let limit = state.config.weekly_usage_limit_free;
    let reset_at = row.window_start + chrono::Duration::days(7);

    Ok(Json(UsageResponse {
        tier: principal.tier.as_str().to_string(),
        used: row.count,
        limit: Some(limit),
        remaining: Some((limit - row.count).max(0)),
        reset_at: Some(reset_at.and_hms_opt(0, 0, 0).unwrap().and_utc()),
        unlimited: false,
    }))
}

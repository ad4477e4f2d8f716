use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::domain::{Domain, DomainTier};
use crate::models::principal::Principal;
use crate::state::AppState;

pub async fn basic(State(state): State<AppState>) -> Json<Vec<Domain>> {
    let snapshot = state.catalog.snapshot();
    Json(snapshot.by_tier(DomainTier::Basic).cloned().collect())
}

pub async fn premium(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Domain>>, AppError> {
    if !principal.tier.is_premium() {
        return Err(AppError::PremiumRequired);
    }

    let snapshot = state.catalog.snapshot();
    Ok(Json(snapshot.by_tier(DomainTier::Premium).cloned().collect()))
}

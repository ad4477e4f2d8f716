pub mod collisions;
pub mod domains;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/collisions/generate", post(collisions::generate))
        .route("/collisions/history", get(collisions::history))
        .route("/collisions/:id/rate", put(collisions::rate))
        .route("/collisions/usage", get(collisions::usage))
        .route("/domains/basic", get(domains::basic))
        .route("/domains/premium", get(domains::premium))
        .with_state(state)
}

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::db::Database;
use crate::engine::{CatalogHandle, EnrichmentLlm};

/// Shared application state injected into all route handlers via Axum extractors.
/// `db` and `cache` are trait objects rather than concrete `PgPool`/`RedisCache`
/// so the pipeline and quota modules can be exercised in tests against
/// in-memory fakes without a live Postgres/Redis.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub cache: Arc<dyn CacheStore>,
    pub config: Config,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub catalog: Arc<CatalogHandle>,
    pub enrichment_llm: Arc<dyn EnrichmentLlm>,
}

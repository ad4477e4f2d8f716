mod auth;
mod cache;
mod config;
mod db;
mod engine;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod quota;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::auth::{JwtVerifier, StaticTokenVerifier, TokenVerifier};
use crate::cache::{CacheStore, RedisCache};
use crate::config::Config;
use crate::db::{create_pool, Database, PgDatabase};
use crate::engine::catalog;
use crate::engine::{AnthropicEnrichmentLlm, EnrichmentLlm, NullEnrichmentLlm};
use crate::llm_client::LlmClient;
use crate::models::principal::{Principal, Tier};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting collision-api v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url).await?;
    let db: Arc<dyn Database> = Arc::new(PgDatabase::new(pool));

    let cache: Arc<dyn CacheStore> = Arc::new(RedisCache::connect(&config.cache_url).await?);
    info!("Cache connection established");

    let catalog_handle = catalog::load(&db, &cache, config.catalog_cache_ttl_seconds).await?;
    info!("Domain catalog loaded");

    let token_verifier: Arc<dyn TokenVerifier> = if config.auth_dev_mode {
        info!("auth_dev_mode enabled: accepting the fixed dev bearer token");
        Arc::new(StaticTokenVerifier {
            token: "dev-token".to_string(),
            principal: Principal {
                id: Uuid::nil(),
                tier: Tier::Free,
            },
        })
    } else {
        let secret = config
            .jwt_secret
            .clone()
            .expect("JwtVerifier requires jwt_secret when auth_dev_mode is false");
        Arc::new(JwtVerifier::new(secret))
    };

    let enrichment_llm: Arc<dyn EnrichmentLlm> = match &config.llm_api_key {
        Some(key) => {
            info!("LLM enrichment enabled (model: {})", llm_client::MODEL);
            Arc::new(AnthropicEnrichmentLlm::new(LlmClient::new(key.clone())))
        }
        None => {
            info!("No LLM_API_KEY configured; premium enrichment will fall back to templates");
            Arc::new(NullEnrichmentLlm)
        }
    };

    let state = AppState {
        db,
        cache,
        config: config.clone(),
        token_verifier,
        catalog: Arc::new(catalog_handle),
        enrichment_llm,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! The Request Pipeline: the layered contract that composes authentication,
//! quota, rate limiting, the collision engine, persistence, and optional
//! enrichment into one generation. This is the only place those components
//! are wired together — route handlers call `generate` and nothing else.

use chrono::Utc;
use rand::Rng;
use tracing::{error, warn};
use uuid::Uuid;

use crate::engine::{enricher, scorer, selector};
use crate::errors::AppError;
use crate::models::collision::{CollisionRequest, CollisionResult};
use crate::models::principal::Principal;
use crate::quota::{rate_limiter, usage_meter};
use crate::state::AppState;

/// Rate-limit bookkeeping the caller attaches to the HTTP response regardless
/// of whether the generation itself succeeded.
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    pub reset: i64,
}

pub struct GenerationOutcome {
    pub result: CollisionResult,
    pub rate_limit: RateLimitHeaders,
}

/// Runs steps 3-9 of the generation pipeline. Steps 1 (authenticate) and 2
/// (validate) happen at the route boundary, since they're axum-extractor and
/// request-shape concerns respectively, not engine concerns.
pub async fn generate(
    state: &AppState,
    principal: &Principal,
    request: &CollisionRequest,
) -> Result<GenerationOutcome, AppError> {
    // 3. Quota — free tier only. Keep the fetched row's `window_start`
    // around for the increment in step 7: it names the window actually in
    // effect, which may predate "today" if it was created earlier in the
    // 7-day span.
    let usage_window_start = if !principal.tier.is_premium() {
        let usage = usage_meter::current(
            &state.db,
            &state.cache,
            principal.id,
            state.config.usage_cache_ttl_seconds,
        )
        .await
        .map_err(AppError::Database)?;

        if usage_meter::is_exceeded(&usage, state.config.weekly_usage_limit_free) {
            return Err(AppError::UsageLimitExceeded);
        }
        Some(usage.window_start)
    } else {
        None
    };

    // 4. Rate limit — sliding window, skipped for premium+skip_premium.
    let decision = rate_limiter::check(&state.cache, principal, &state.config).await;
    if !decision.allowed {
        return Err(AppError::RateLimitExceeded {
            remaining: decision.remaining,
            reset: decision.reset,
            limit: decision.limit,
        });
    }

    // 5. Engine — selector -> scorer -> deterministic enrichment.
    let snapshot = state.catalog.snapshot();
    let selection = selector::select(&snapshot, request);

    let noise = rand::thread_rng().gen_range(-2.5..=2.5);
    let quality_score = scorer::quality(
        selection.project_relevance,
        selection.novelty,
        &request.project,
        &selection.collision_domain,
        noise,
    );

    let mut connection = selection.connection.clone();
    let mut spark_questions = enricher::spark_questions(&selection.collision_domain, &request.project);
    let mut examples = enricher::examples(&selection.collision_domain);
    let mut next_steps =
        enricher::next_steps(&selection.collision_domain, &request.project, request.intensity);

    // 8. Premium enrichment — inline, errors swallowed.
    if principal.tier.is_premium() {
        enrich_inline(
            state,
            &selection.collision_domain,
            &request.project,
            &mut connection,
            &mut spark_questions,
            &mut examples,
            &mut next_steps,
        )
        .await;
    }

    let result = CollisionResult {
        id: Uuid::new_v4(),
        primary_domain: selection.primary_domain,
        collision_domain: selection.collision_domain.name,
        connection,
        spark_questions,
        examples,
        next_steps,
        quality_score,
        generated_at: Utc::now(),
    };

    // 6. Persist session — best-effort.
    persist_session(state, principal.id, request, &result).await;

    // 7. Meter increment — free tier only, best-effort.
    if let Some(window_start) = usage_window_start {
        usage_meter::increment(&state.db, &state.cache, principal.id, window_start).await;
    }

    Ok(GenerationOutcome {
        result,
        rate_limit: RateLimitHeaders {
            limit: decision.limit,
            remaining: decision.remaining,
            reset: decision.reset,
        },
    })
}

#[allow(clippy::too_many_arguments)]
async fn enrich_inline(
    state: &AppState,
    domain: &crate::models::domain::Domain,
    project: &str,
    connection: &mut String,
    spark_questions: &mut Vec<String>,
    examples: &mut Vec<String>,
    next_steps: &mut Vec<String>,
) {
    match state.enrichment_llm.produce_connection(domain, project).await {
        Ok(text) => *connection = text,
        Err(e) => warn!(error = %e, "llm connection enrichment fell back to template"),
    }
    match state.enrichment_llm.produce_questions(domain, project).await {
        Ok(items) => *spark_questions = items,
        Err(e) => warn!(error = %e, "llm spark-question enrichment fell back to template"),
    }
    match state.enrichment_llm.produce_examples(domain, project).await {
        Ok(items) => *examples = items,
        Err(e) => warn!(error = %e, "llm example enrichment fell back to template"),
    }
    match state.enrichment_llm.produce_next_steps(domain, project).await {
        Ok(items) => *next_steps = items,
        Err(e) => warn!(error = %e, "llm next-step enrichment fell back to template"),
    }
}

async fn persist_session(
    state: &AppState,
    principal_id: Uuid,
    request: &CollisionRequest,
    result: &CollisionResult,
) {
    let request_json = match serde_json::to_value(request) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "failed to serialize request for session persistence");
            return;
        }
    };
    let result_json = match serde_json::to_value(result) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "failed to serialize result for session persistence");
            return;
        }
    };

    let insert = state
        .db
        .insert_session(result.id, principal_id, request_json, result_json, result.generated_at)
        .await;

    if let Err(e) = insert {
        error!(error = %e, session_id = %result.id, "failed to persist session");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::auth::StaticTokenVerifier;
    use crate::cache::InMemoryCache;
    use crate::config::Config;
    use crate::db::InMemoryDatabase;
    use crate::engine::catalog::{CatalogHandle, CatalogSnapshot};
    use crate::engine::NullEnrichmentLlm;
    use crate::models::collision::{Intensity, ProjectType};
    use crate::models::domain::Domain;
    use crate::models::principal::Tier;

    fn domain(name: &str, intensities: &[&str]) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "Science".to_string(),
            description: "desc".to_string(),
            keywords: vec!["evolution".to_string()],
            examples: vec!["A flocking system coordinates without a leader".to_string()],
            intensities: intensities.iter().map(|s| s.to_string()).collect(),
            tier: "basic".to_string(),
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            cache_url: String::new(),
            llm_api_key: None,
            jwt_secret: None,
            auth_dev_mode: true,
            rate_limit_window_seconds: 60,
            rate_limit_max_requests: 10,
            rate_limit_skip_premium: true,
            weekly_usage_limit_free: 5,
            catalog_cache_ttl_seconds: 1800,
            usage_cache_ttl_seconds: 300,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }

    /// Builds an `AppState` over in-memory fakes, returning the concrete
    /// `InMemoryDatabase` alongside so tests can seed/inspect it directly —
    /// `AppState.db` itself is a `dyn Database` trait object.
    fn test_state(domains: Vec<Domain>, config: Config) -> (AppState, Arc<InMemoryDatabase>) {
        let db = Arc::new(InMemoryDatabase::new());
        let state = AppState {
            db: db.clone(),
            cache: Arc::new(InMemoryCache::new()),
            config,
            token_verifier: Arc::new(StaticTokenVerifier {
                token: "dev-token".to_string(),
                principal: Principal {
                    id: Uuid::nil(),
                    tier: Tier::Free,
                },
            }),
            catalog: Arc::new(CatalogHandle::new(CatalogSnapshot::new(domains))),
            enrichment_llm: Arc::new(NullEnrichmentLlm),
        };
        (state, db)
    }

    fn request() -> CollisionRequest {
        CollisionRequest {
            interests: vec!["biology".to_string(), "evolution".to_string()],
            project: "AI recommendation system".to_string(),
            project_type: ProjectType::Product,
            intensity: Intensity::Moderate,
        }
    }

    fn principal(tier: Tier) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            tier,
        }
    }

    fn catalog_domains() -> Vec<Domain> {
        vec![
            domain("Biomimicry", &["gentle", "moderate"]),
            domain("Quantum Physics", &["gentle", "moderate", "radical"]),
        ]
    }

    // S1: free-tier, under quota.
    #[tokio::test]
    async fn test_generate_free_tier_under_quota_succeeds_and_meters_usage() {
        let (state, _db) = test_state(catalog_domains(), test_config());
        let p = principal(Tier::Free);

        let outcome = generate(&state, &p, &request()).await.unwrap();
        assert!(outcome.result.quality_score >= 0.0 && outcome.result.quality_score <= 100.0);
        assert!(outcome.result.spark_questions.len() >= 3);

        let usage = usage_meter::current(state.db.as_ref(), state.cache.as_ref(), p.id, 300)
            .await
            .unwrap();
        assert_eq!(usage.count, 1);
    }

    // S2: free-tier, at quota.
    #[tokio::test]
    async fn test_generate_free_tier_at_quota_is_rejected() {
        let config = test_config();
        let (state, db) = test_state(catalog_domains(), config.clone());
        let p = principal(Tier::Free);
        let today = Utc::now().date_naive();

        db.seed_usage(p.id, today, config.weekly_usage_limit_free);

        let err = generate(&state, &p, &request()).await.unwrap_err();
        assert!(matches!(err, AppError::UsageLimitExceeded));
        assert_eq!(db.session_count(), 0);
    }

    // S3: rate limit breach, through the real pipeline.
    #[tokio::test]
    async fn test_generate_breaches_rate_limit_after_max_requests() {
        let mut config = test_config();
        config.rate_limit_skip_premium = false;
        config.rate_limit_max_requests = 3;
        let (state, _db) = test_state(catalog_domains(), config);
        let p = principal(Tier::Pro);

        for _ in 0..3 {
            generate(&state, &p, &request()).await.unwrap();
        }

        let err = generate(&state, &p, &request()).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimitExceeded { .. }));
    }

    // S5: empty catalog, through the real pipeline.
    #[tokio::test]
    async fn test_generate_empty_catalog_falls_back_to_sentinel() {
        let (state, _db) = test_state(Vec::new(), test_config());
        let p = principal(Tier::Free);

        let outcome = generate(&state, &p, &request()).await.unwrap();
        assert_eq!(outcome.result.collision_domain, "Innovation");
    }

    // S6: LLM outage, through the real pipeline. Premium principals invoke
    // enrichment inline; `NullEnrichmentLlm` always errs, so every field
    // should fall back to its deterministic template.
    #[tokio::test]
    async fn test_generate_premium_llm_outage_falls_back_to_templates() {
        let (state, _db) = test_state(catalog_domains(), test_config());
        let p = principal(Tier::Pro);

        let outcome = generate(&state, &p, &request()).await.unwrap();
        assert!(!outcome.result.connection.is_empty());
        assert!(!outcome.result.spark_questions.is_empty());
        assert!(!outcome.result.next_steps.is_empty());
    }
}

//! Sliding-window rate limiting on top of `Cache::sliding_window_check`.
//! Fails open on cache failure (the request is allowed through, logged as
//! degraded) and is bypassable entirely for premium principals when the
//! `rate_limit_skip_premium` policy is set.

use tracing::warn;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::principal::Principal;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u64,
    pub reset: i64,
    pub limit: u64,
}

pub async fn check(cache: &dyn CacheStore, principal: &Principal, config: &Config) -> RateLimitDecision {
    if principal.tier.is_premium() && config.rate_limit_skip_premium {
        return RateLimitDecision {
            allowed: true,
            remaining: config.rate_limit_max_requests,
            reset: 0,
            limit: config.rate_limit_max_requests,
        };
    }

    let outcome = cache
        .sliding_window_check(
            &principal.id.to_string(),
            config.rate_limit_window_seconds,
            config.rate_limit_max_requests,
        )
        .await;

    match outcome {
        Ok(o) => RateLimitDecision {
            allowed: o.allowed,
            remaining: o.remaining,
            reset: o.reset,
            limit: o.limit,
        },
        Err(e) => {
            warn!(error = %e, principal_id = %principal.id, "rate limiter cache failure, failing open");
            RateLimitDecision {
                allowed: true,
                remaining: config.rate_limit_max_requests,
                reset: 0,
                limit: config.rate_limit_max_requests,
            }
        }
    }
}

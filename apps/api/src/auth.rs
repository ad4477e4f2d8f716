//! Principal extraction from `Authorization: Bearer <token>`.
//!
//! JWT signature-verification depth is explicitly out of scope for this
//! service's spec, so the extractor is built around a small `TokenVerifier`
//! trait rather than hand-rolling crypto here: `JwtVerifier` is the production
//! default (HMAC-SHA256 via `jsonwebtoken`), and `StaticTokenVerifier` is a
//! fixed-token/fixed-principal stand-in for local dev and tests. Both yield
//! the same `Principal` the rest of the pipeline consumes.

use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::principal::{Principal, Tier};
use crate::state::AppState;

/// JWT claims this service expects. `sub` carries the principal id, `tier`
/// carries the freemium tier. Deeper claim validation (audience, custom
/// scopes, key rotation) is left to the issuing auth service.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    tier: Tier,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, AppError>;
}

/// Production verifier: HMAC-SHA256 JWT, shared-secret keyed.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AppError> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        let data: TokenData<Claims> = jsonwebtoken::decode(token, &key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AppError::Unauthorized
            })?;

        Ok(Principal {
            id: data.claims.sub,
            tier: data.claims.tier,
        })
    }
}

/// Dev-mode verifier: accepts one fixed bearer token and always yields the
/// same free-tier principal. Mirrors the project's existing dev-identity
/// escape hatch; only wired up when `auth_dev_mode` is set.
pub struct StaticTokenVerifier {
    pub token: String,
    pub principal: Principal,
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AppError> {
        if token == self.token {
            Ok(self.principal)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?
            .trim();

        let claimed = state.token_verifier.verify(token)?;

        // Tier is looked up from durable state on every request rather than
        // trusted from the token alone, so a tier change in `principals`
        // takes effect immediately instead of waiting for the token to expire.
        let tier = match state.db.resolve_principal_tier(claimed.id, claimed.tier).await {
            Ok(tier) => tier,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    principal_id = %claimed.id,
                    "principal tier lookup failed, using token-claimed tier"
                );
                claimed.tier
            }
        };

        Ok(Principal {
            id: claimed.id,
            tier,
        })
    }
}

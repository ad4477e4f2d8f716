use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub cache_url: String,
    pub llm_api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub auth_dev_mode: bool,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u64,
    pub rate_limit_skip_premium: bool,
    pub weekly_usage_limit_free: i64,
    pub catalog_cache_ttl_seconds: u64,
    pub usage_cache_ttl_seconds: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let auth_dev_mode = bool_env("AUTH_DEV_MODE", false)?;
        let jwt_secret = std::env::var("JWT_SECRET").ok();

        if jwt_secret.is_none() && !auth_dev_mode {
            anyhow::bail!("Either JWT_SECRET must be set or AUTH_DEV_MODE must be true");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            cache_url: require_env("CACHE_URL")?,
            llm_api_key: std::env::var("LLM_API_KEY").ok(),
            jwt_secret,
            auth_dev_mode,
            rate_limit_window_seconds: u64_env("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            rate_limit_max_requests: u64_env("RATE_LIMIT_MAX_REQUESTS", 10)?,
            rate_limit_skip_premium: bool_env("RATE_LIMIT_SKIP_PREMIUM", true)?,
            weekly_usage_limit_free: i64_env("WEEKLY_USAGE_LIMIT_FREE", 5)?,
            catalog_cache_ttl_seconds: u64_env("CATALOG_CACHE_TTL_SECONDS", 1800)?,
            usage_cache_ttl_seconds: u64_env("USAGE_CACHE_TTL_SECONDS", 300)?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn u64_env(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

fn i64_env(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<i64>()
            .with_context(|| format!("{key} must be an integer")),
        Err(_) => Ok(default),
    }
}

fn bool_env(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_env_defaults_when_unset() {
        std::env::remove_var("TEST_BOOL_FLAG_UNSET");
        assert!(bool_env("TEST_BOOL_FLAG_UNSET", true).unwrap());
        assert!(!bool_env("TEST_BOOL_FLAG_UNSET", false).unwrap());
    }

    #[test]
    fn test_bool_env_parses_truthy_values() {
        std::env::set_var("TEST_BOOL_FLAG_TRUE", "true");
        assert!(bool_env("TEST_BOOL_FLAG_TRUE", false).unwrap());
        std::env::set_var("TEST_BOOL_FLAG_TRUE", "1");
        assert!(bool_env("TEST_BOOL_FLAG_TRUE", false).unwrap());
        std::env::remove_var("TEST_BOOL_FLAG_TRUE");
    }

    #[test]
    fn test_bool_env_rejects_garbage() {
        std::env::set_var("TEST_BOOL_FLAG_BAD", "maybe");
        assert!(bool_env("TEST_BOOL_FLAG_BAD", false).is_err());
        std::env::remove_var("TEST_BOOL_FLAG_BAD");
    }

    #[test]
    fn test_require_env_missing_errors() {
        std::env::remove_var("TEST_REQUIRED_VAR_ABSENT");
        assert!(require_env("TEST_REQUIRED_VAR_ABSENT").is_err());
    }
}

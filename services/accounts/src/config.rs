//! Service configuration
//!
//! Values come from built-in defaults overridden by `ACCOUNTS_*` environment
//! variables, e.g. `ACCOUNTS_SESSION_TTL_SECONDS=3600`.

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

/// Where account, reset, activity and payment rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL for rows, Redis for sessions
    Postgres,
    /// Everything in process memory; lost on restart
    Memory,
}

/// Account service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Storage backend
    pub storage: StorageBackend,
    /// Lifetime of a session token in seconds (default: 7 days)
    pub session_ttl_seconds: u64,
    /// Lifetime of a password reset token in minutes (default: 60)
    pub reset_token_ttl_minutes: i64,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count
    pub argon2_iterations: u32,
    /// Argon2 lanes
    pub argon2_parallelism: u32,
    /// Login attempts allowed per username inside one window
    pub login_max_attempts: u32,
    /// Login rate limit window in seconds
    pub login_window_seconds: u64,
    /// Ban duration in seconds once the limit is hit
    pub login_ban_seconds: u64,
    /// Relay endpoint for outbound messages; logged only when unset
    pub delivery_webhook_url: Option<String>,
    /// Stripe secret key; payments are disabled when unset
    pub stripe_secret_key: Option<String>,
    /// Stripe API base URL
    pub stripe_api_base: String,
    /// ISO currency code charged by the payment endpoint
    pub payment_currency: String,
}

impl AppConfig {
    /// Load the configuration from defaults and the environment
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .set_default("listen_addr", "0.0.0.0:3000")?
            .set_default("storage", "postgres")?
            .set_default("session_ttl_seconds", 604_800)?
            .set_default("reset_token_ttl_minutes", 60)?
            .set_default("request_timeout_seconds", 10)?
            .set_default("argon2_memory_kib", 19_456)?
            .set_default("argon2_iterations", 2)?
            .set_default("argon2_parallelism", 1)?
            .set_default("login_max_attempts", 5)?
            .set_default("login_window_seconds", 300)?
            .set_default("login_ban_seconds", 900)?
            .set_default("stripe_api_base", "https://api.stripe.com")?
            .set_default("payment_currency", "usd")?
            .add_source(Environment::with_prefix("ACCOUNTS").try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;

        if config.reset_token_ttl_minutes <= 0 {
            anyhow::bail!("ACCOUNTS_RESET_TOKEN_TTL_MINUTES must be positive");
        }
        if config.session_ttl_seconds == 0 {
            anyhow::bail!("ACCOUNTS_SESSION_TTL_SECONDS must be positive");
        }
        if config.payment_currency.len() != 3
            || !config
                .payment_currency
                .chars()
                .all(|c| c.is_ascii_alphabetic())
        {
            anyhow::bail!("ACCOUNTS_PAYMENT_CURRENCY must be a three-letter ISO code");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "ACCOUNTS_STORAGE",
        "ACCOUNTS_RESET_TOKEN_TTL_MINUTES",
        "ACCOUNTS_STRIPE_SECRET_KEY",
        "ACCOUNTS_SESSION_TTL_SECONDS",
        "ACCOUNTS_PAYMENT_CURRENCY",
    ];

    fn clear() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.session_ttl_seconds, 604_800);
        assert_eq!(config.reset_token_ttl_minutes, 60);
        assert_eq!(config.login_max_attempts, 5);
        assert!(config.stripe_secret_key.is_none());
        assert!(config.delivery_webhook_url.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear();
        unsafe {
            std::env::set_var("ACCOUNTS_STORAGE", "memory");
            std::env::set_var("ACCOUNTS_RESET_TOKEN_TTL_MINUTES", "15");
            std::env::set_var("ACCOUNTS_STRIPE_SECRET_KEY", "sk_test_123");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.reset_token_ttl_minutes, 15);
        assert_eq!(config.stripe_secret_key.as_deref(), Some("sk_test_123"));

        clear();
    }

    #[test]
    #[serial]
    fn test_non_positive_reset_ttl_is_rejected() {
        clear();
        unsafe {
            std::env::set_var("ACCOUNTS_RESET_TOKEN_TTL_MINUTES", "0");
        }

        assert!(AppConfig::from_env().is_err());

        clear();
    }

    #[test]
    #[serial]
    fn test_malformed_currency_is_rejected() {
        for currency in ["usdx", "us", "u5d"] {
            clear();
            unsafe {
                std::env::set_var("ACCOUNTS_PAYMENT_CURRENCY", currency);
            }

            assert!(AppConfig::from_env().is_err(), "{}", currency);
        }

        unsafe {
            std::env::set_var("ACCOUNTS_PAYMENT_CURRENCY", "eur");
        }
        assert_eq!(AppConfig::from_env().unwrap().payment_currency, "eur");

        clear();
    }
}

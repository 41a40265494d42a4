use anyhow::Result;
use sqlx::migrate::Migrator;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use accounts::{
    AppState,
    config::{AppConfig, StorageBackend},
    delivery::{Delivery, LogDelivery, WebhookDelivery},
    lifecycle::{AccountService, AccountServiceParts},
    password::PasswordHasher,
    payments::{PaymentGateway, PaymentService, StripeGateway},
    rate_limiter::RateLimiterConfig,
    repositories::{
        MemoryStore, PgAccountRepository, PgActivityRepository, PgPaymentRepository,
        PgResetRepository,
    },
    routes,
    session::{MemorySessionStore, RedisSessionStore},
};
use common::{
    cache::{RedisConfig, RedisPool},
    database,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting account service");

    let config = AppConfig::from_env()?;

    let hasher = PasswordHasher::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
    )?;

    let delivery: Arc<dyn Delivery> = match &config.delivery_webhook_url {
        Some(url) => Arc::new(WebhookDelivery::new(url.clone())?),
        None => {
            warn!("No delivery relay configured, outbound messages are only logged");
            Arc::new(LogDelivery)
        }
    };

    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeGateway::new(
            key.clone(),
            config.stripe_api_base.clone(),
        )?)),
        None => {
            warn!("No Stripe key configured, payments are disabled");
            None
        }
    };

    let login_limits = RateLimiterConfig {
        max_attempts: config.login_max_attempts,
        window_seconds: config.login_window_seconds,
        ban_duration_seconds: config.login_ban_seconds,
    };
    let reset_token_ttl = chrono::Duration::minutes(config.reset_token_ttl_minutes);

    let state = match config.storage {
        StorageBackend::Postgres => {
            // Initialize database connection pool
            let db_config = database::DatabaseConfig::from_env()?;
            let pool = database::init_pool(&db_config).await?;

            // Check database connectivity
            if database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            database::run_migrations(&pool, &MIGRATOR).await?;

            // Initialize Redis connection pool
            let redis_config = RedisConfig::from_env()?;
            let redis_pool = RedisPool::new(&redis_config).await?;
            let sessions = RedisSessionStore::new(redis_pool);
            if !sessions.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }

            let activity = Arc::new(PgActivityRepository::new(pool.clone()));
            let accounts = AccountService::new(AccountServiceParts {
                accounts: Arc::new(PgAccountRepository::new(pool.clone())),
                resets: Arc::new(PgResetRepository::new(pool.clone())),
                activity: activity.clone(),
                sessions: Arc::new(sessions),
                delivery,
                hasher,
                session_ttl_seconds: config.session_ttl_seconds,
                reset_token_ttl,
                login_limits,
            });
            let payments = PaymentService::new(
                gateway,
                Arc::new(PgPaymentRepository::new(pool)),
                activity,
                config.payment_currency.clone(),
            );

            AppState { accounts, payments }
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, all data is lost on restart");

            let store = MemoryStore::new();
            let accounts = AccountService::new(AccountServiceParts {
                accounts: Arc::new(store.clone()),
                resets: Arc::new(store.clone()),
                activity: Arc::new(store.clone()),
                sessions: Arc::new(MemorySessionStore::new()),
                delivery,
                hasher,
                session_ttl_seconds: config.session_ttl_seconds,
                reset_token_ttl,
                login_limits,
            });
            let payments = PaymentService::new(
                gateway,
                Arc::new(store.clone()),
                Arc::new(store),
                config.payment_currency.clone(),
            );

            AppState { accounts, payments }
        }
    };

    state.accounts.purge_expired_resets().await?;

    info!("Account service initialized successfully");

    // Start the web server
    let app = routes::create_router(
        state,
        Duration::from_secs(config.request_timeout_seconds),
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Account service listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

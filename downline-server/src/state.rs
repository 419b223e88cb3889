//! Application state

use sqlx::SqlitePool;

use crate::config::Config;
use crate::network::cache::QueryCache;
use crate::rate_limit::RateLimiter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// Service configuration
    pub config: Config,
    /// Rate limiter for the hierarchy read surface
    pub rate_limiter: RateLimiter,
    /// Short-lived response cache for hierarchy reads
    pub query_cache: QueryCache,
}

impl AppState {
    /// Create a new AppState: connect the pool and run migrations.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = SqlitePool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            config: config.clone(),
            rate_limiter: RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_secs,
            ),
            query_cache: QueryCache::new(std::time::Duration::from_secs(config.cache_ttl_secs)),
        })
    }
}

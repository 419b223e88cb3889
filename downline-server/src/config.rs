//! Server configuration

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Day of month the settlement period closes on (clamped to month
    /// length; 31 means calendar months).
    pub cutoff_day: u32,
    /// Max in-flight per-member settlement writes.
    pub settlement_concurrency: usize,
    /// Deepest level the hierarchy query service will expand.
    pub max_query_depth: i64,
    /// Fixed-window rate limit for the read surface: requests per window.
    pub rate_limit_max_requests: u32,
    /// Fixed-window length in seconds.
    pub rate_limit_window_secs: u64,
    /// Response cache TTL in seconds (0 disables caching).
    pub cache_ttl_secs: u64,
    /// Environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults for
    /// everything except DATABASE_URL.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT", 8080),
            cutoff_day: env_parse("SETTLEMENT_CUTOFF_DAY", 31).clamp(1, 31),
            settlement_concurrency: env_parse("SETTLEMENT_CONCURRENCY", 8).max(1),
            max_query_depth: env_parse("MAX_QUERY_DEPTH", 10).max(1),
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 60),
            rate_limit_window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 60),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", 30),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

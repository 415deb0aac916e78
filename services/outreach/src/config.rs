/// Outreach service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3210). Env var: `OUTREACH_PORT`.
    pub outreach_port: u16,
    /// Delivery provider endpoint (e.g. "https://mail.example.com/send").
    pub transport_url: String,
    /// Optional bearer token for the delivery provider.
    pub transport_api_key: Option<String>,
    /// Seconds between worker poll ticks (default 30).
    pub worker_poll_secs: u64,
    /// Max queue entries claimed per tick (default 25).
    pub worker_batch_limit: u64,
    /// Seconds between reconciliation sweeps (default 300).
    pub reconcile_interval_secs: u64,
    /// Base retry backoff in seconds; attempt n waits n * backoff (default 120).
    pub retry_backoff_secs: u64,
    /// Hard cap on generated occurrences per series (default 100).
    pub hard_cap: u32,
}

impl OutreachConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            outreach_port: env_or("OUTREACH_PORT", 3210),
            transport_url: std::env::var("TRANSPORT_URL").expect("TRANSPORT_URL"),
            transport_api_key: std::env::var("TRANSPORT_API_KEY").ok(),
            worker_poll_secs: env_or("WORKER_POLL_SECS", 30),
            worker_batch_limit: env_or("WORKER_BATCH_LIMIT", 25),
            reconcile_interval_secs: env_or("RECONCILE_INTERVAL_SECS", 300),
            retry_backoff_secs: env_or("RETRY_BACKOFF_SECS", 120),
            hard_cap: env_or("HARD_CAP", touchbase_domain::cadence::DEFAULT_HARD_CAP),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the external market-data API.
    pub api_base_url: String,

    // =========================
    // Scheduling configuration
    // =========================
    /// How often the poll cycle samples the instrument universe.
    pub poll_interval: Duration,

    /// How often expired alerts are pruned from the registry.
    ///
    /// Much longer than the poll interval on purpose: cleanup only has
    /// to keep up with the rolling window, not with price movement.
    pub cleanup_interval: Duration,

    /// Rolling look-back used both to trim price history and to age
    /// alerts out of the registry.
    pub window: Duration,

    // =========================
    // Upstream rate limiting
    // =========================
    /// Minimum spacing between consecutive outbound API calls,
    /// enforced process-wide across all callers.
    pub min_fetch_interval: Duration,

    /// Cooldown before the single retry after an HTTP 429.
    pub rate_limit_cooldown: Duration,

    /// Page size for the cursor-paginated instrument listing.
    /// The upstream caps this; larger values are clamped there.
    pub page_limit: u32,

    /// Aggregation period requested for historical candles, minutes.
    pub candle_period_minutes: u32,

    /// Per-subscriber alert queue capacity. A subscriber that falls this
    /// far behind starts losing deliveries rather than stalling the
    /// broadcast path.
    pub subscriber_queue_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_or("MARKET_API_URL", "https://api.example-exchange.com/v1"),

            poll_interval: Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 30)),
            cleanup_interval: Duration::from_secs(env_parse("CLEANUP_INTERVAL_SECS", 3_600)),
            window: Duration::from_secs(env_parse::<u64>("WINDOW_HOURS", 12) * 3_600),

            min_fetch_interval: Duration::from_millis(env_parse("MIN_FETCH_INTERVAL_MS", 600)),
            rate_limit_cooldown: Duration::from_millis(env_parse("RATE_LIMIT_COOLDOWN_MS", 2_000)),
            page_limit: env_parse("PAGE_LIMIT", 200),
            candle_period_minutes: 60,

            subscriber_queue_capacity: 64,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

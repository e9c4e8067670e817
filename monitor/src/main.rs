use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use common::logger::init_logger;
use monitor::{
    bootstrap,
    config::AppConfig,
    engine::{self, Engine},
    fetch::{HttpSender, RateLimitedFetcher},
    market::HttpMarketClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger("volatility-monitor");

    let cfg = AppConfig::from_env();
    info!(
        api = %cfg.api_base_url,
        poll_secs = cfg.poll_interval.as_secs(),
        window_hours = cfg.window.as_secs() / 3_600,
        "starting volatility monitor"
    );

    let fetcher = RateLimitedFetcher::new(
        HttpSender::new()?,
        cfg.min_fetch_interval,
        cfg.rate_limit_cooldown,
    );
    let client = Arc::new(HttpMarketClient::new(
        fetcher,
        cfg.api_base_url.clone(),
        cfg.page_limit,
        cfg.candle_period_minutes,
    ));

    let engine = Engine::new(client, &cfg);

    // A failed bootstrap starts the monitor cold; the poll cycles build
    // the window back up on their own.
    match bootstrap::run(engine.as_ref()).await {
        Ok(report) => info!(
            seeded = report.seeded,
            alerts = report.alerts_fired,
            "startup bootstrap finished"
        ),
        Err(e) => warn!(error = %e, "bootstrap failed, starting with empty state"),
    }

    tokio::spawn(engine::run_poller(engine.clone(), cfg.poll_interval));
    tokio::spawn(engine::run_cleanup(engine.clone(), cfg.cleanup_interval));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping cycles");
    Ok(())
}

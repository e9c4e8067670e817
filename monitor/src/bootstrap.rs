//! One-shot startup seeding of history and alerts.
//!
//! Runs before the first poll cycle so a process restarted mid-window
//! does not silently lose a movement that already happened.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::history::PriceSample;
use crate::market::{Candle, Market, MarketApi, price_from_hundredths};
use crate::time::now_ms;

/// Aggregate counts for observability; logged once at the end.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootstrapReport {
    pub seeded: usize,
    pub alerts_fired: usize,
    pub skipped: usize,
}

/// Seed every tradable instrument, then classify and register exactly as
/// a poll cycle would. One instrument's missing history never affects
/// the others.
pub async fn run<C: MarketApi>(engine: &Engine<C>) -> Result<BootstrapReport> {
    let _cycle = engine.lock_cycle().await;
    let now = now_ms();

    let markets = engine
        .client()
        .active_markets()
        .await
        .context("fetch instrument universe for bootstrap")?;

    info!(listed = markets.len(), "bootstrap started");

    let mut report = BootstrapReport::default();
    for market in &markets {
        if !market.is_tradable() {
            report.skipped += 1;
            continue;
        }

        let fired = seed_one(engine, market, now).await;
        report.seeded += 1;
        if fired {
            report.alerts_fired += 1;
        }
    }

    info!(
        seeded = report.seeded,
        alerts = report.alerts_fired,
        skipped = report.skipped,
        "bootstrap complete"
    );
    Ok(report)
}

async fn seed_one<C: MarketApi>(engine: &Engine<C>, market: &Market, now: u64) -> bool {
    let window_ms = engine.window_ms();
    let start_s = (now.saturating_sub(window_ms) / 1_000) as i64;
    let end_s = (now / 1_000) as i64;

    // A failed candle fetch degrades to the listing fallback; it is not
    // an instrument failure.
    let candles = match engine.client().candles(&market.ticker, start_s, end_s).await {
        Ok(candles) => candles,
        Err(e) => {
            warn!(ticker = %market.ticker, error = %e, "candle fetch failed, using listing fallback");
            Vec::new()
        }
    };

    let current = market.last_price_frac();
    let mut samples = candle_samples(&candles, now, window_ms);

    if !samples.is_empty() {
        samples.push(PriceSample {
            price: current,
            ts_ms: now,
        });
    } else {
        let prior = market.previous_price_frac();
        if market.previous_price > 0 && prior != current {
            // Synthetic 2-point window from the listing's prior price.
            samples = vec![
                PriceSample {
                    price: prior,
                    ts_ms: now.saturating_sub(window_ms),
                },
                PriceSample {
                    price: current,
                    ts_ms: now,
                },
            ];
        } else {
            // No usable history; no alert is possible until a second
            // observation arrives.
            debug!(ticker = %market.ticker, "no history, seeding single sample");
            samples = vec![PriceSample {
                price: current,
                ts_ms: now,
            }];
        }
    }

    engine.seed_series(&market.ticker, samples).await;
    engine.evaluate(&market.ticker, &market.title, now).await
}

/// Candles inside the window as fractional samples, oldest first.
fn candle_samples(candles: &[Candle], now: u64, window_ms: u64) -> Vec<PriceSample> {
    let mut samples: Vec<PriceSample> = candles
        .iter()
        .map(|c| PriceSample {
            price: price_from_hundredths(c.close_price),
            ts_ms: c.ts.max(0) as u64 * 1_000,
        })
        .filter(|s| now.saturating_sub(s.ts_ms) <= window_ms && s.ts_ms <= now)
        .collect();
    samples.sort_by_key(|s| s.ts_ms);
    samples
}

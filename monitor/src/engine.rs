//! Monitoring engine: shared state plus the poll and cleanup cycles.
//!
//! Data flow per poll tick:
//! listing → HistoryStore.record → window_stats → classify →
//! registry insert-if-absent → hub broadcast.
//!
//! History and registry are the only shared mutable state. Mutation
//! happens in the poll cycle, the cleanup cycle and the bootstrapper,
//! which are serialized by `cycle_lock`; reporting reads go through the
//! registry read lock and always see whole tier maps, never torn ones.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::detector::classify;
use crate::history::{HistoryStore, PriceSample};
use crate::hub::{SubscriberHub, Subscription};
use crate::market::{Market, MarketApi};
use crate::registry::{Alert, AlertRegistry, AlertSnapshot};
use crate::time::now_ms;

/// Counters for one poll cycle, logged when the cycle completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleReport {
    pub polled: usize,
    pub skipped: usize,
    pub alerts_fired: usize,
}

pub struct Engine<C> {
    client: Arc<C>,
    window_ms: u64,

    history: Mutex<HistoryStore>,
    registry: RwLock<AlertRegistry>,
    hub: SubscriberHub,

    /// Serializes poll, cleanup and bootstrap so none of them observes a
    /// half-updated registry.
    cycle_lock: Mutex<()>,
}

impl<C: MarketApi> Engine<C> {
    pub fn new(client: Arc<C>, cfg: &AppConfig) -> Arc<Self> {
        Arc::new(Self {
            client,
            window_ms: cfg.window_ms(),
            history: Mutex::new(HistoryStore::new(cfg.window_ms())),
            registry: RwLock::new(AlertRegistry::new()),
            hub: SubscriberHub::new(cfg.subscriber_queue_capacity),
            cycle_lock: Mutex::new(()),
        })
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    pub(crate) async fn lock_cycle(&self) -> MutexGuard<'_, ()> {
        self.cycle_lock.lock().await
    }

    /// One poll pass over the active universe, stamping samples with
    /// `now`. A universe fetch failure aborts only this pass.
    pub async fn poll_cycle_at(&self, now: u64) -> Result<CycleReport> {
        let _cycle = self.lock_cycle().await;

        let markets = self
            .client
            .active_markets()
            .await
            .context("fetch instrument universe")?;

        let mut report = CycleReport::default();
        for market in &markets {
            if !market.is_tradable() {
                report.skipped += 1;
                continue;
            }

            report.polled += 1;
            if self.observe(market, market.last_price_frac(), now).await {
                report.alerts_fired += 1;
            }
        }

        Ok(report)
    }

    pub async fn poll_cycle(&self) -> Result<CycleReport> {
        self.poll_cycle_at(now_ms()).await
    }

    /// Record one observation, then classify and fire. Returns whether a
    /// new alert was registered.
    pub(crate) async fn observe(&self, market: &Market, price: f64, now: u64) -> bool {
        {
            let mut history = self.history.lock().await;
            history.record(&market.ticker, PriceSample { price, ts_ms: now });
        }
        self.evaluate(&market.ticker, &market.title, now).await
    }

    /// Classify the current window and register a new alert unless that
    /// (ticker, tier) is already live. Insert and broadcast run under
    /// the registry write lock, so a concurrent subscriber sees the
    /// alert in its snapshot or its stream, never neither.
    pub(crate) async fn evaluate(&self, ticker: &str, title: &str, now: u64) -> bool {
        let stats = self.history.lock().await.window_stats(ticker);
        let Some(stats) = stats else {
            return false;
        };
        let Some(c) = classify(stats.newest, stats.oldest) else {
            return false;
        };

        let mut registry = self.registry.write().await;
        if registry.contains(c.tier, ticker) {
            // Sticky until expiry; no re-fire, no push.
            return false;
        }

        let alert = Alert {
            ticker: ticker.to_string(),
            title: title.to_string(),
            current_price: stats.newest,
            reference_price: stats.oldest,
            percent_change: c.percent_change,
            direction: c.direction,
            min_price: stats.min,
            max_price: stats.max,
            fired_at_ms: now,
            tier: c.tier,
        };

        info!(
            ticker = %alert.ticker,
            tier = %alert.tier,
            direction = ?alert.direction,
            percent_change = alert.percent_change,
            "volatility alert fired"
        );

        registry.insert(alert.clone());
        self.hub.broadcast(&alert).await;
        true
    }

    /// Replace a ticker's history wholesale. Bootstrap only.
    pub async fn seed_series(&self, ticker: &str, samples: Vec<PriceSample>) {
        self.history.lock().await.seed(ticker, samples);
    }

    /// Expire alerts older than the window. Returns the number removed.
    pub async fn cleanup_at(&self, now: u64) -> usize {
        let _cycle = self.lock_cycle().await;

        let removed = self.registry.write().await.cleanup(now, self.window_ms);
        if removed > 0 {
            info!(removed, "expired alerts pruned");
        }
        removed
    }

    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(now_ms()).await
    }

    /// Registry snapshot in reporting order.
    pub async fn snapshot(&self) -> AlertSnapshot {
        self.registry.read().await.snapshot()
    }

    /// Attach a live subscriber: current snapshot, then every alert
    /// fired after it, FIFO.
    pub async fn subscribe(&self) -> Subscription {
        let registry = self.registry.read().await;
        self.hub.subscribe(registry.snapshot()).await
    }
}

/// Drive poll cycles at a fixed interval, forever. Failures are logged
/// and the next tick retries independently.
pub async fn run_poller<C: MarketApi + 'static>(engine: Arc<Engine<C>>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(every_ms = every.as_millis() as u64, "market poller started");

    loop {
        ticker.tick().await;

        match engine.poll_cycle().await {
            Ok(report) => info!(
                polled = report.polled,
                skipped = report.skipped,
                alerts = report.alerts_fired,
                "poll cycle complete"
            ),
            Err(e) => warn!(error = %e, "poll cycle failed, retrying next tick"),
        }
    }
}

/// Drive registry cleanup on its own, much longer period.
pub async fn run_cleanup<C: MarketApi + 'static>(engine: Arc<Engine<C>>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(every_ms = every.as_millis() as u64, "cleanup cycle started");

    loop {
        ticker.tick().await;
        engine.cleanup().await;
    }
}

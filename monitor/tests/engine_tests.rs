use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use monitor::config::AppConfig;
use monitor::detector::{Direction, Tier};
use monitor::engine::Engine;
use monitor::error::FetchError;
use monitor::history::PriceSample;
use monitor::market::{Candle, Market, MarketApi};

const HOUR_MS: u64 = 3_600_000;

struct MockMarketApi {
    markets: Mutex<Vec<Market>>,
    fail_next_listing: AtomicBool,
}

impl MockMarketApi {
    fn new(markets: Vec<Market>) -> Arc<Self> {
        Arc::new(Self {
            markets: Mutex::new(markets),
            fail_next_listing: AtomicBool::new(false),
        })
    }

    async fn set_price(&self, ticker: &str, hundredths: u32) {
        let mut markets = self.markets.lock().await;
        for m in markets.iter_mut() {
            if m.ticker == ticker {
                m.last_price = hundredths;
            }
        }
    }
}

#[async_trait]
impl MarketApi for MockMarketApi {
    async fn active_markets(&self) -> Result<Vec<Market>, FetchError> {
        if self.fail_next_listing.swap(false, Ordering::SeqCst) {
            return Err(FetchError::Transport("connection reset".into()));
        }
        Ok(self.markets.lock().await.clone())
    }

    async fn candles(
        &self,
        _ticker: &str,
        _start_ts: i64,
        _end_ts: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        Ok(Vec::new())
    }
}

fn market(ticker: &str, last_price: u32, volume: u64) -> Market {
    Market {
        ticker: ticker.to_string(),
        title: format!("{ticker} market"),
        last_price,
        previous_price: 0,
        volume,
    }
}

fn engine_with(api: Arc<MockMarketApi>) -> Arc<Engine<MockMarketApi>> {
    Engine::new(api, &AppConfig::from_env())
}

#[tokio::test]
async fn spike_fires_once_then_sticks() {
    let api = MockMarketApi::new(vec![market("X", 50, 10)]);
    let engine = engine_with(api.clone());

    let now = 100 * HOUR_MS;
    engine
        .seed_series(
            "X",
            vec![PriceSample {
                price: 0.40,
                ts_ms: now - 11 * HOUR_MS,
            }],
        )
        .await;

    let mut sub = engine.subscribe().await;
    assert!(sub.initial.tier20.is_empty());

    // 0.40 -> 0.50 is +25%: tier 20, up, exactly one push.
    let report = engine.poll_cycle_at(now).await.unwrap();
    assert_eq!(report.polled, 1);
    assert_eq!(report.alerts_fired, 1);

    let alert = sub.alerts.try_recv().unwrap();
    assert_eq!(alert.ticker, "X");
    assert_eq!(alert.tier, Tier::T20);
    assert_eq!(alert.direction, Direction::Up);
    assert!((alert.percent_change - 25.0).abs() < 1e-9);
    assert_eq!(alert.reference_price, 0.40);
    assert_eq!(alert.current_price, 0.50);
    assert_eq!(alert.fired_at_ms, now);

    // Price unchanged next cycle: the live entry suppresses any re-fire.
    let report = engine.poll_cycle_at(now + 30_000).await.unwrap();
    assert_eq!(report.alerts_fired, 0);
    assert!(sub.alerts.try_recv().is_err());

    // fired_at of the registered alert is untouched.
    let snap = engine.snapshot().await;
    assert_eq!(snap.tier20.len(), 1);
    assert_eq!(snap.tier20[0].fired_at_ms, now);
}

#[tokio::test]
async fn tiers_accumulate_independently_across_cycles() {
    let api = MockMarketApi::new(vec![market("X", 43, 10)]);
    let engine = engine_with(api.clone());

    let now = 100 * HOUR_MS;
    engine
        .seed_series(
            "X",
            vec![PriceSample {
                price: 0.40,
                ts_ms: now - 11 * HOUR_MS,
            }],
        )
        .await;

    // +7.5% first: tier 5 only.
    let report = engine.poll_cycle_at(now).await.unwrap();
    assert_eq!(report.alerts_fired, 1);

    // +25% next cycle: tier 20 fires while tier 5 stays registered.
    api.set_price("X", 50).await;
    let report = engine.poll_cycle_at(now + 30_000).await.unwrap();
    assert_eq!(report.alerts_fired, 1);

    let snap = engine.snapshot().await;
    assert_eq!(snap.tier5.len(), 1);
    assert!(snap.tier10.is_empty());
    assert_eq!(snap.tier20.len(), 1);
    assert_eq!(snap.tier5[0].ticker, "X");
    assert_eq!(snap.tier20[0].ticker, "X");
}

#[tokio::test]
async fn untradable_listings_are_skipped_entirely() {
    let api = MockMarketApi::new(vec![
        market("NOVOL", 50, 0),
        market("NOPRICE", 0, 10),
        market("OK", 50, 10),
    ]);
    let engine = engine_with(api);

    let report = engine.poll_cycle_at(100 * HOUR_MS).await.unwrap();
    assert_eq!(report.polled, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.alerts_fired, 0);
}

#[tokio::test]
async fn listing_failure_aborts_only_the_current_cycle() {
    let api = MockMarketApi::new(vec![market("X", 50, 10)]);
    let engine = engine_with(api.clone());

    api.fail_next_listing.store(true, Ordering::SeqCst);
    assert!(engine.poll_cycle_at(100 * HOUR_MS).await.is_err());

    // No side effects from the failed cycle; the next one proceeds.
    assert_eq!(engine.snapshot().await.tier20.len(), 0);
    let report = engine.poll_cycle_at(100 * HOUR_MS + 30_000).await.unwrap();
    assert_eq!(report.polled, 1);
}

#[tokio::test]
async fn cleanup_expires_aged_alerts() {
    let api = MockMarketApi::new(vec![market("X", 50, 10)]);
    let engine = engine_with(api);

    let now = 100 * HOUR_MS;
    let window = engine.window_ms();
    engine
        .seed_series(
            "X",
            vec![PriceSample {
                price: 0.40,
                ts_ms: now - 11 * HOUR_MS,
            }],
        )
        .await;
    engine.poll_cycle_at(now).await.unwrap();
    assert_eq!(engine.snapshot().await.tier20.len(), 1);

    // Still inside the window: nothing removed.
    assert_eq!(engine.cleanup_at(now + window).await, 0);
    // One ms past: exactly the aged alert goes.
    assert_eq!(engine.cleanup_at(now + window + 1).await, 1);
    assert!(engine.snapshot().await.tier20.is_empty());
}

#[tokio::test]
async fn late_subscriber_gets_alert_in_snapshot_not_stream() {
    let api = MockMarketApi::new(vec![market("X", 50, 10)]);
    let engine = engine_with(api);

    let now = 100 * HOUR_MS;
    engine
        .seed_series(
            "X",
            vec![PriceSample {
                price: 0.40,
                ts_ms: now - 11 * HOUR_MS,
            }],
        )
        .await;
    engine.poll_cycle_at(now).await.unwrap();

    let mut sub = engine.subscribe().await;
    assert_eq!(sub.initial.tier20.len(), 1);
    assert_eq!(sub.initial.tier20[0].ticker, "X");
    assert!(sub.alerts.try_recv().is_err());
}

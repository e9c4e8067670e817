//! Per-instrument price history trimmed to a rolling time window.

use std::collections::{HashMap, VecDeque};

/// A single observed price. Immutable once recorded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceSample {
    /// Fractional price in [0, 1].
    pub price: f64,
    /// Observation time, ms since epoch.
    pub ts_ms: u64,
}

/// Aggregate of one instrument's retained window.
#[derive(Clone, Copy, Debug)]
pub struct WindowStats {
    /// Earliest retained price; the window's reference price.
    pub oldest: f64,
    /// Most recent price.
    pub newest: f64,
    pub min: f64,
    pub max: f64,
}

/// Ordered-by-time price series per ticker, covering at most the rolling
/// window. Samples arrive in non-decreasing time order, so eviction only
/// ever removes from the front.
pub struct HistoryStore {
    series: HashMap<String, VecDeque<PriceSample>>,
    window_ms: u64,
}

impl HistoryStore {
    pub fn new(window_ms: u64) -> Self {
        Self {
            series: HashMap::new(),
            window_ms,
        }
    }

    /// Append a sample, then drop everything that has aged out of the
    /// window relative to the sample's own timestamp.
    pub fn record(&mut self, ticker: &str, sample: PriceSample) {
        let series = self.series.entry(ticker.to_string()).or_default();
        series.push_back(sample);
        evict_old(series, sample.ts_ms, self.window_ms);
    }

    /// Replace a ticker's series wholesale. Bootstrap only; live series
    /// grow through `record`.
    pub fn seed(&mut self, ticker: &str, samples: Vec<PriceSample>) {
        let mut series: VecDeque<PriceSample> = samples.into();
        if let Some(newest) = series.back().copied() {
            evict_old(&mut series, newest.ts_ms, self.window_ms);
        }
        self.series.insert(ticker.to_string(), series);
    }

    /// Window aggregate for a ticker, or `None` when no window-relative
    /// change can be computed: fewer than two retained samples, or a
    /// reference price of exactly zero (division guard).
    pub fn window_stats(&self, ticker: &str) -> Option<WindowStats> {
        let series = self.series.get(ticker)?;
        if series.len() < 2 {
            return None;
        }

        let oldest = series.front()?.price;
        if oldest == 0.0 {
            return None;
        }
        let newest = series.back()?.price;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for s in series {
            min = min.min(s.price);
            max = max.max(s.price);
        }

        Some(WindowStats {
            oldest,
            newest,
            min,
            max,
        })
    }

    pub fn series_len(&self, ticker: &str) -> usize {
        self.series.get(ticker).map_or(0, VecDeque::len)
    }
}

fn evict_old(series: &mut VecDeque<PriceSample>, now_ms: u64, window_ms: u64) {
    while let Some(front) = series.front() {
        if now_ms.saturating_sub(front.ts_ms) > window_ms {
            series.pop_front();
        } else {
            break;
        }
    }
}

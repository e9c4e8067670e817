//! Active-alert registry: at most one live alert per (instrument, tier).

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::detector::{Direction, Tier};

/// A fired volatility alert. Immutable once constructed; a newer alert
/// replaces an older one in the registry after expiry, never in place.
#[derive(Clone, Debug, Serialize)]
pub struct Alert {
    pub ticker: String,
    pub title: String,
    pub current_price: f64,
    /// Price at the start of the window, the percent-change denominator.
    pub reference_price: f64,
    /// Signed, reference-relative, in percent.
    pub percent_change: f64,
    pub direction: Direction,
    pub min_price: f64,
    pub max_price: f64,
    pub fired_at_ms: u64,
    pub tier: Tier,
}

/// Point-in-time copy of the registry, each tier sorted by descending
/// absolute percent change. Every reporting surface uses this ordering.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AlertSnapshot {
    pub tier5: Vec<Alert>,
    pub tier10: Vec<Alert>,
    pub tier20: Vec<Alert>,
}

/// Three independent ticker-keyed maps, one per tier. An instrument may
/// be live in several tiers at once; each tier is recorded on its own
/// crossing and expires on its own `fired_at_ms`.
#[derive(Default)]
pub struct AlertRegistry {
    tier5: HashMap<String, Alert>,
    tier10: HashMap<String, Alert>,
    tier20: HashMap<String, Alert>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier_map(&self, tier: Tier) -> &HashMap<String, Alert> {
        match tier {
            Tier::T5 => &self.tier5,
            Tier::T10 => &self.tier10,
            Tier::T20 => &self.tier20,
        }
    }

    fn tier_map_mut(&mut self, tier: Tier) -> &mut HashMap<String, Alert> {
        match tier {
            Tier::T5 => &mut self.tier5,
            Tier::T10 => &mut self.tier10,
            Tier::T20 => &mut self.tier20,
        }
    }

    /// Whether `ticker` already has a live alert in `tier`. Live entries
    /// are sticky: they suppress re-fires until cleanup expires them,
    /// even if the magnitude keeps changing.
    pub fn contains(&self, tier: Tier, ticker: &str) -> bool {
        self.tier_map(tier).contains_key(ticker)
    }

    /// Register an alert in its tier. Callers check `contains` first;
    /// overwriting a live entry would reset its age.
    pub fn insert(&mut self, alert: Alert) {
        self.tier_map_mut(alert.tier)
            .insert(alert.ticker.clone(), alert);
    }

    /// Drop every alert whose `fired_at_ms` precedes `now - window`.
    /// Returns the number removed.
    pub fn cleanup(&mut self, now_ms: u64, window_ms: u64) -> usize {
        let mut removed = 0;
        for tier in Tier::ALL {
            let map = self.tier_map_mut(tier);
            let before = map.len();
            map.retain(|_, a| now_ms.saturating_sub(a.fired_at_ms) <= window_ms);
            removed += before - map.len();
        }
        removed
    }

    pub fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            tier5: sorted_by_magnitude(&self.tier5),
            tier10: sorted_by_magnitude(&self.tier10),
            tier20: sorted_by_magnitude(&self.tier20),
        }
    }

    pub fn active_total(&self) -> usize {
        self.tier5.len() + self.tier10.len() + self.tier20.len()
    }
}

fn sorted_by_magnitude(map: &HashMap<String, Alert>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = map.values().cloned().collect();
    alerts.sort_by(|a, b| {
        b.percent_change
            .abs()
            .partial_cmp(&a.percent_change.abs())
            .unwrap_or(Ordering::Equal)
    });
    alerts
}

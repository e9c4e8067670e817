//! Wire shapes of the external market-data API.
//!
//! Prices arrive as integers in hundredths of a unit and are converted
//! to fractional prices in [0, 1] at this boundary.

use serde::Deserialize;

/// Convert an integer price in hundredths of a unit to a fraction.
pub fn price_from_hundredths(hundredths: u32) -> f64 {
    f64::from(hundredths) / 100.0
}

/// One page of the cursor-paginated active-market listing.
#[derive(Debug, Deserialize)]
pub struct MarketsPage {
    pub markets: Vec<Market>,

    /// Opaque continuation token; absent or empty on the last page.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A tradable instrument as listed upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    pub ticker: String,
    pub title: String,

    /// Last traded price, hundredths of a unit.
    pub last_price: u32,

    /// Prior-session price from the listing itself. Bootstrap fallback
    /// when no historical candles exist.
    #[serde(default)]
    pub previous_price: u32,

    #[serde(default)]
    pub volume: u64,
}

impl Market {
    pub fn last_price_frac(&self) -> f64 {
        price_from_hundredths(self.last_price)
    }

    pub fn previous_price_frac(&self) -> f64 {
        price_from_hundredths(self.previous_price)
    }

    /// Universe filter: listings with zero traded volume or a zero last
    /// price are skipped entirely, never recorded into history.
    pub fn is_tradable(&self) -> bool {
        self.volume > 0 && self.last_price > 0
    }
}

#[derive(Debug, Deserialize)]
pub struct CandlesResponse {
    pub candles: Vec<Candle>,
}

/// One aggregated historical sample.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Candle {
    /// Period end, seconds since epoch.
    pub ts: i64,

    /// Closing price, hundredths of a unit.
    pub close_price: u32,
}

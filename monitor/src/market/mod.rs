pub mod client;
pub mod types;

pub use client::{HttpMarketClient, MarketApi};
pub use types::{Candle, Market, MarketsPage, price_from_hundredths};

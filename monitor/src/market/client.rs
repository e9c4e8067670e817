//! HTTP client for the external market-data API.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::{HttpSend, RateLimitedFetcher};
use crate::market::types::{Candle, CandlesResponse, Market, MarketsPage};

/// Hard bound on listing pages per universe fetch, so a misbehaving
/// cursor cannot loop the poll cycle forever.
const MAX_PAGES: u32 = 50;

/// Market-data access as the engine sees it. Tests substitute a mock;
/// production uses [`HttpMarketClient`].
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Full universe of active markets, fully paginated.
    async fn active_markets(&self) -> Result<Vec<Market>, FetchError>;

    /// Aggregated historical samples for one market over
    /// `[start_ts, end_ts]` (seconds since epoch).
    async fn candles(&self, ticker: &str, start_ts: i64, end_ts: i64)
    -> Result<Vec<Candle>, FetchError>;
}

pub struct HttpMarketClient<S> {
    fetcher: RateLimitedFetcher<S>,
    base_url: String,
    page_limit: u32,
    candle_period_minutes: u32,
}

impl<S: HttpSend> HttpMarketClient<S> {
    pub fn new(
        fetcher: RateLimitedFetcher<S>,
        base_url: String,
        page_limit: u32,
        candle_period_minutes: u32,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_limit,
            candle_period_minutes,
        }
    }
}

#[async_trait]
impl<S: HttpSend> MarketApi for HttpMarketClient<S> {
    async fn active_markets(&self) -> Result<Vec<Market>, FetchError> {
        let mut markets = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 0..MAX_PAGES {
            let mut url = format!(
                "{}/markets?status=active&limit={}",
                self.base_url, self.page_limit
            );
            if let Some(c) = &cursor {
                url.push_str("&cursor=");
                url.push_str(c);
            }

            let body = self.fetcher.fetch(&url).await?;
            let page: MarketsPage = serde_json::from_str(&body)?;

            debug!(page = page_no, listed = page.markets.len(), "markets page fetched");
            markets.extend(page.markets);

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(markets),
            }
        }

        warn!(
            pages = MAX_PAGES,
            listed = markets.len(),
            "market listing did not terminate, truncating universe"
        );
        Ok(markets)
    }

    async fn candles(
        &self,
        ticker: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!(
            "{}/markets/{}/candles?start_ts={}&end_ts={}&period_minutes={}",
            self.base_url, ticker, start_ts, end_ts, self.candle_period_minutes
        );

        let body = self.fetcher.fetch(&url).await?;
        let resp: CandlesResponse = serde_json::from_str(&body)?;

        Ok(resp.candles)
    }
}

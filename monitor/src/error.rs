use thiserror::Error;

/// Failure modes of a single outbound market-data call.
///
/// An empty or too-short price window is not represented here: it is a
/// valid detector-input state and surfaces as `None` from
/// `HistoryStore::window_stats`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Upstream throttled the call and the single retry was throttled too.
    #[error("rate limited by upstream after retry")]
    RateLimited,

    /// Non-throttling, non-success HTTP response. Never retried.
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    /// Connectivity-level failure. Never retried here; the poll cycle
    /// simply picks the instrument up again on its next tick.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Upstream body did not match the expected wire shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

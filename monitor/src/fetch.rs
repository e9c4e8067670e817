//! Rate-limited outbound HTTP.
//!
//! All market-data calls funnel through one `RateLimitedFetcher`, which
//! enforces a process-wide minimum spacing between consecutive calls and
//! retries exactly once on upstream throttling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use crate::error::FetchError;

const TOO_MANY_REQUESTS: u16 = 429;

/// Status + body of a completed HTTP exchange, as seen by the retry policy.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Transport seam. Production uses [`HttpSender`]; tests substitute a mock.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

pub struct HttpSender {
    http: Client,
}

impl HttpSender {
    pub fn new() -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpSend for HttpSender {
    async fn send(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(HttpResponse { status, body })
    }
}

/// Two-state retry policy: one initial attempt, at most one retry, and
/// only throttling earns the retry.
#[derive(Clone, Copy, Debug)]
enum Attempt {
    First,
    RetryOnce,
}

pub struct RateLimitedFetcher<S> {
    sender: S,
    min_interval: Duration,
    cooldown: Duration,

    /// Completion instant of the most recent outbound call, shared by
    /// every caller in the process.
    last_call: Mutex<Option<Instant>>,
}

impl<S: HttpSend> RateLimitedFetcher<S> {
    pub fn new(sender: S, min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            sender,
            min_interval,
            cooldown,
            last_call: Mutex::new(None),
        }
    }

    /// Suspend until `min_interval` has elapsed since the previous call,
    /// then claim the slot. Holding the lock across the sleep serializes
    /// concurrent callers, so spacing holds process-wide.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(prev) = *last {
            let due = prev + self.min_interval;
            if Instant::now() < due {
                sleep_until(due).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// GET `url`, returning the response body on 2xx.
    ///
    /// Throttling (429) waits one cooldown and retries once; a second 429
    /// surfaces as `RateLimited`. Any other non-2xx surfaces immediately
    /// as `Upstream` and is never retried.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        for attempt in [Attempt::First, Attempt::RetryOnce] {
            self.pace().await;

            let resp = self.sender.send(url).await?;
            match resp.status {
                200..=299 => {
                    debug!(url, status = resp.status, "fetch ok");
                    return Ok(resp.body);
                }
                TOO_MANY_REQUESTS => match attempt {
                    Attempt::First => {
                        warn!(
                            url,
                            cooldown_ms = self.cooldown.as_millis() as u64,
                            "upstream throttled, retrying once"
                        );
                        sleep(self.cooldown).await;
                    }
                    Attempt::RetryOnce => return Err(FetchError::RateLimited),
                },
                status => return Err(FetchError::Upstream { status }),
            }
        }

        // Both attempts throttled; unreachable fall-through kept for the
        // type checker.
        Err(FetchError::RateLimited)
    }
}

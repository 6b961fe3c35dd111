//! HTTP access to EDGAR: rate-limited fetching, Atom feed discovery, and
//! filing-folder document resolution.

pub mod feed;
pub mod resolver;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{RETRY_AFTER, USER_AGENT};
use reqwest::Client;

use radar_core::{Fetch, FetchError, RadarConfig};

/// Compute the exponential backoff delay for a retry attempt (0-based),
/// doubling from `base_ms` and capped at `ceiling_ms`. Monotone
/// non-decreasing in `attempt`.
pub fn backoff_delay(attempt: u32, base_ms: u64, ceiling_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let ms = base_ms.saturating_mul(factor).min(ceiling_ms);
    Duration::from_millis(ms)
}

/// Delay before the next retry attempt. A server-supplied `Retry-After`
/// hint wins over the computed backoff; both are capped at the ceiling.
/// The hint comes off the wire, so the arithmetic must saturate rather
/// than overflow on absurd values.
pub fn retry_delay(
    attempt: u32,
    retry_after_secs: Option<u64>,
    base_ms: u64,
    ceiling_ms: u64,
) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_millis(secs.saturating_mul(1_000).min(ceiling_ms)),
        None => backoff_delay(attempt, base_ms, ceiling_ms),
    }
}

/// Resilient EDGAR HTTP client. Every request waits a randomized jitter
/// first (SEC asks automated clients to stay under ~10 req/s), carries the
/// mandatory identifying User-Agent, and retries 429/5xx/network failures
/// with capped exponential backoff. This is the only component that sleeps.
pub struct EdgarClient {
    client: Client,
    user_agent: String,
    jitter_min_ms: u64,
    jitter_max_ms: u64,
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_ceiling_ms: u64,
}

impl EdgarClient {
    pub fn new(config: &RadarConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            user_agent: config.user_agent.clone(),
            jitter_min_ms: config.jitter_min_ms,
            jitter_max_ms: config.jitter_max_ms.max(config.jitter_min_ms),
            max_attempts: config.max_attempts.max(1),
            backoff_base_ms: config.backoff_base_ms,
            backoff_ceiling_ms: config.backoff_ceiling_ms,
        }
    }

    /// Pre-request pacing delay.
    async fn jitter_wait(&self) {
        let ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.jitter_min_ms..=self.jitter_max_ms)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Wait before the next retry. Computed backoff gets a small random
    /// jitter so concurrent deployments do not resynchronize; a server's
    /// `Retry-After` hint is applied as-is (capped).
    async fn backoff_wait(&self, attempt: u32, retry_after_secs: Option<u64>) {
        let mut delay = retry_delay(
            attempt,
            retry_after_secs,
            self.backoff_base_ms,
            self.backoff_ceiling_ms,
        );
        if retry_after_secs.is_none() {
            let jitter_ms = {
                let mut rng = rand::thread_rng();
                rng.gen_range(0..250u64)
            };
            delay += Duration::from_millis(jitter_ms);
        }
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl Fetch for EdgarClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut last = String::new();

        for attempt in 0..self.max_attempts {
            self.jitter_wait().await;

            match self
                .client
                .get(url)
                .header(USER_AGENT, &self.user_agent)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .text()
                            .await
                            .map_err(|e| FetchError::Network(e.to_string()));
                    }

                    let code = status.as_u16();
                    if code != 429 && !status.is_server_error() {
                        return Err(FetchError::Status {
                            status: code,
                            url: url.to_string(),
                        });
                    }

                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok());

                    last = format!("HTTP {} for {}", code, url);
                    tracing::warn!(
                        "EDGAR {} (attempt {}/{}), backing off",
                        last,
                        attempt + 1,
                        self.max_attempts
                    );
                    if attempt + 1 < self.max_attempts {
                        self.backoff_wait(attempt, retry_after).await;
                    }
                }
                Err(e) => {
                    last = e.to_string();
                    tracing::warn!(
                        "EDGAR request error (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_attempts,
                        last
                    );
                    if attempt + 1 < self.max_attempts {
                        self.backoff_wait(attempt, None).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}

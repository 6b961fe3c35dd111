//! Price-history enrichment: trailing-range percentile, drawdown, daily
//! change and volume ratio for a ticker, derived from daily aggregates.
//!
//! The pipeline treats this as a best-effort collaborator: every failure
//! path (no API key, HTTP error, thin history, delisted symbol) collapses to
//! `None` and the structural filter decides what that means.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use radar_core::{EnrichmentMetrics, PriceEnrichment};

const BASE_URL: &str = "https://api.polygon.io";

/// Trailing window of daily bars used for the derived metrics.
const TRAILING_DAYS: i64 = 180;

/// One daily bar, oldest-first ordering expected by [`derive_metrics`].
#[derive(Debug, Clone, Copy)]
pub struct DailyBar {
    pub close: f64,
    pub volume: f64,
}

/// Derive enrichment metrics from a trailing series of daily bars. Each
/// metric is computed independently; any that cannot be derived is left
/// absent rather than defaulted.
pub fn derive_metrics(bars: &[DailyBar]) -> Option<EnrichmentMetrics> {
    let last = bars.last()?;

    let high = bars.iter().map(|b| b.close).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.close).fold(f64::MAX, f64::min);

    let range_percentile = (high > low).then(|| (last.close - low) / (high - low));
    let drawdown = (high > 0.0).then(|| (high - last.close) / high);

    let daily_change_pct = if bars.len() >= 2 {
        let prev = bars[bars.len() - 2].close;
        (prev > 0.0).then(|| (last.close - prev) / prev * 100.0)
    } else {
        None
    };

    let volume_ratio = if bars.len() >= 2 {
        let trailing = &bars[..bars.len() - 1];
        let avg = trailing.iter().map(|b| b.volume).sum::<f64>() / trailing.len() as f64;
        (avg > 0.0).then(|| last.volume / avg)
    } else {
        None
    };

    Some(EnrichmentMetrics {
        range_percentile,
        drawdown,
        daily_change_pct,
        volume_ratio,
    })
}

/// Daily-aggregates client backed by the Polygon API.
pub struct MarketDataClient {
    api_key: String,
    client: Client,
}

impl MarketDataClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { api_key, client }
    }

    /// Construct from `POLYGON_API_KEY` when present.
    pub fn from_env() -> Option<Self> {
        std::env::var("POLYGON_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(Self::new)
    }

    async fn fetch_daily_bars(&self, ticker: &str) -> Result<Vec<DailyBar>, reqwest::Error> {
        let to = Utc::now();
        let from = to - Duration::days(TRAILING_DAYS);
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            BASE_URL,
            ticker,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "400"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: AggregateResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .map(|r| DailyBar {
                close: r.c,
                volume: r.v,
            })
            .collect())
    }
}

#[async_trait]
impl PriceEnrichment for MarketDataClient {
    async fn metrics(&self, ticker: &str) -> Option<EnrichmentMetrics> {
        match self.fetch_daily_bars(ticker).await {
            Ok(bars) => derive_metrics(&bars),
            Err(e) => {
                tracing::debug!("Enrichment unavailable for {}: {}", ticker, e);
                None
            }
        }
    }
}

/// Enrichment stand-in when no market-data credentials are configured.
pub struct NoEnrichment;

#[async_trait]
impl PriceEnrichment for NoEnrichment {
    async fn metrics(&self, _ticker: &str) -> Option<EnrichmentMetrics> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    c: f64,
    v: f64,
}

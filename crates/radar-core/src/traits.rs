use async_trait::async_trait;

use crate::error::{FetchError, RadarError};
use crate::types::EnrichmentMetrics;

/// HTTP retrieval seam. The production implementation rate-limits, retries
/// and backs off; tests substitute canned bodies.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Price-history enrichment collaborator. Unavailable data collapses to
/// `None` rather than an error; callers must tolerate absence.
#[async_trait]
pub trait PriceEnrichment: Send + Sync {
    async fn metrics(&self, ticker: &str) -> Option<EnrichmentMetrics>;
}

/// Outbound notification seam. Takes a finished plain-text payload; delivery
/// retries are the sink's concern, not the pipeline's.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), RadarError>;
    fn name(&self) -> &str;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CandidateFailure;

/// One filing discovered from the feed. The accession number is derived from
/// feed content alone; it stays valid even if the filing later fails to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingCandidate {
    /// Stable unique identifier (EDGAR accession number).
    pub accession: String,
    /// Filing folder URL (document manifest lives at `<base_url>index.json`).
    pub base_url: String,
    /// When this entry was seen in the feed.
    pub discovered_at: DateTime<Utc>,
}

/// Insider role flags, extracted once per document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsiderRole {
    pub is_officer: bool,
    pub is_director: bool,
    pub is_ten_percent_owner: bool,
    pub officer_title: Option<String>,
}

/// One non-derivative insider transaction. Only materialized when ticker,
/// shares and price all parsed as positive numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub ticker: String,
    pub owner: String,
    pub role: InsiderRole,
    /// Raw transaction code ("P" = open-market purchase).
    pub code: String,
    pub shares: f64,
    pub price: f64,
    /// Transaction date as reported (YYYY-MM-DD).
    pub date: String,
    /// Accession number of the originating filing.
    pub accession: String,
}

/// The open-market purchase code on Form 4.
pub const PURCHASE_CODE: &str = "P";

impl TransactionRecord {
    /// Dollar value of the transaction.
    pub fn value(&self) -> f64 {
        self.shares * self.price
    }

    pub fn is_purchase(&self) -> bool {
        self.code == PURCHASE_CODE
    }
}

/// Derived price-position metrics from the enrichment collaborator.
/// Every field is optional; absence never raises.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentMetrics {
    /// Where the latest close sits in its trailing range, 0.0 = at the low,
    /// 1.0 = at the high.
    pub range_percentile: Option<f64>,
    /// Fraction below the trailing high, 0.0 = at the high.
    pub drawdown: Option<f64>,
    /// Latest day-over-day percent change.
    pub daily_change_pct: Option<f64>,
    /// Latest volume versus trailing average volume.
    pub volume_ratio: Option<f64>,
}

/// A transaction that passed the filter, ready for the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredAlert {
    pub record: TransactionRecord,
    pub metrics: Option<EnrichmentMetrics>,
    pub score: f64,
    pub role_weight: f64,
}

/// Counters and per-candidate failures for one run. Failures are advisory;
/// they never abort the run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub candidates_discovered: usize,
    pub skipped_seen: usize,
    pub documents_fetched: usize,
    pub records_extracted: usize,
    pub alerts_accepted: usize,
    pub failures: Vec<(String, CandidateFailure)>,
    /// Set when the dedup store could not be saved after the run.
    pub persist_failed: bool,
}

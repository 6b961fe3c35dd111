//! Filtering and scoring of extracted transactions.
//!
//! The score is a transparent, deterministic function of the record and its
//! enrichment metrics:
//!
//!   score = role weight + value tier bonus + structural bonus
//!
//! Role weight: 3.0 for CEO/CFO/president-level officers, 2.0 for other
//! officers, 1.5 for directors, 1.0 otherwise, +0.5 when the filer is a
//! ten-percent owner. Value tier bonus: +0.5 per configured breakpoint the
//! transaction value exceeds. Structural bonus: (1 - range percentile) +
//! drawdown, each term present only when the metric is. More insider
//! conviction and a cheaper relative price strictly raise the score.

use radar_core::{EnrichmentMetrics, RadarConfig, ScoredAlert, TransactionRecord};

/// Outcome of evaluating one transaction.
#[derive(Debug)]
pub enum Evaluation {
    Accepted(Box<ScoredAlert>),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Transaction code is not an open-market purchase.
    NotPurchase,
    /// Value below the configured minimum.
    BelowThreshold,
    /// Structural filter enabled and neither price-position condition held.
    StructuralFilter,
}

pub struct AlertEvaluator {
    min_value_usd: f64,
    min_value_inclusive: bool,
    structural_filter: bool,
    range_percentile_ceiling: f64,
    drawdown_floor: f64,
    value_tiers: Vec<f64>,
}

impl AlertEvaluator {
    pub fn new(config: &RadarConfig) -> Self {
        let mut value_tiers = config.value_tiers.clone();
        value_tiers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            min_value_usd: config.min_value_usd,
            min_value_inclusive: config.min_value_inclusive,
            structural_filter: config.structural_filter,
            range_percentile_ceiling: config.range_percentile_ceiling,
            drawdown_floor: config.drawdown_floor,
            value_tiers,
        }
    }

    /// Apply the rejection cascade, then score. Rejection is the expected
    /// outcome for most records and is silent.
    pub fn evaluate(
        &self,
        record: &TransactionRecord,
        metrics: Option<&EnrichmentMetrics>,
    ) -> Evaluation {
        if !record.is_purchase() {
            return Evaluation::Rejected(RejectReason::NotPurchase);
        }

        let value = record.value();
        let passes_threshold = if self.min_value_inclusive {
            value >= self.min_value_usd
        } else {
            value > self.min_value_usd
        };
        if !passes_threshold {
            return Evaluation::Rejected(RejectReason::BelowThreshold);
        }

        if self.structural_filter && !self.structural_pass(metrics) {
            return Evaluation::Rejected(RejectReason::StructuralFilter);
        }

        let role_weight = role_weight(record);
        let score = role_weight + self.value_tier_bonus(value) + structural_bonus(metrics);

        Evaluation::Accepted(Box::new(ScoredAlert {
            record: record.clone(),
            metrics: metrics.cloned(),
            score,
            role_weight,
        }))
    }

    /// Either structural condition passes: price at or below the percentile
    /// ceiling of its trailing range, or drawn down at least the floor from
    /// its trailing high. Missing metrics fail closed.
    fn structural_pass(&self, metrics: Option<&EnrichmentMetrics>) -> bool {
        let Some(m) = metrics else { return false };
        let percentile_ok = m
            .range_percentile
            .map(|p| p <= self.range_percentile_ceiling)
            .unwrap_or(false);
        let drawdown_ok = m
            .drawdown
            .map(|d| d >= self.drawdown_floor)
            .unwrap_or(false);
        percentile_ok || drawdown_ok
    }

    fn value_tier_bonus(&self, value: f64) -> f64 {
        self.value_tiers.iter().filter(|&&tier| value > tier).count() as f64 * 0.5
    }
}

const EXECUTIVE_TITLE_MARKERS: &[&str] = &[
    "ceo",
    "chief executive",
    "cfo",
    "chief financial",
    "president",
];

fn role_weight(record: &TransactionRecord) -> f64 {
    let title = record
        .role
        .officer_title
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let executive = EXECUTIVE_TITLE_MARKERS.iter().any(|m| title.contains(m));

    let base = if executive {
        3.0
    } else if record.role.is_officer {
        2.0
    } else if record.role.is_director {
        1.5
    } else {
        1.0
    };

    if record.role.is_ten_percent_owner {
        base + 0.5
    } else {
        base
    }
}

fn structural_bonus(metrics: Option<&EnrichmentMetrics>) -> f64 {
    let Some(m) = metrics else { return 0.0 };
    let percentile_term = m
        .range_percentile
        .map(|p| (1.0 - p).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let drawdown_term = m.drawdown.map(|d| d.clamp(0.0, 1.0)).unwrap_or(0.0);
    percentile_term + drawdown_term
}

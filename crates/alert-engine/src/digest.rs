//! Rendering of one run's accepted alerts into a single outbound message.

use chrono::{DateTime, Utc};

use radar_core::{RadarConfig, RunSummary, ScoredAlert};

/// Build the digest text. Alerts are ordered by score descending; the sort
/// is stable so equal scores keep their feed discovery order. At most
/// `max_digest_alerts` lines are rendered, the rest become a summary count.
/// An empty run produces a heartbeat so an operator can tell "ran, nothing
/// matched" apart from "did not run".
pub fn build_digest(
    config: &RadarConfig,
    alerts: &[ScoredAlert],
    summary: &RunSummary,
    now: DateTime<Utc>,
) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M UTC");

    let mut lines: Vec<String> = Vec::new();

    if alerts.is_empty() {
        lines.push(format!("Insider radar checked {}", stamp));
        lines.push("No new insider purchases matched the filter".to_string());
    } else {
        let mut ranked: Vec<&ScoredAlert> = alerts.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        lines.push(format!("Insider radar {}", stamp));
        lines.push(format!(
            "{} purchases above {} USD",
            alerts.len(),
            format_usd(config.min_value_usd)
        ));
        lines.push(String::new());

        for alert in ranked.iter().take(config.max_digest_alerts) {
            let r = &alert.record;
            let owner = if r.owner.is_empty() {
                "owner n/a"
            } else {
                r.owner.as_str()
            };
            lines.push(format!(
                "{} | {} | {} | {} USD | {:.0} @ {:.2} (score {:.1})",
                r.ticker,
                owner,
                r.date,
                format_usd(r.value()),
                r.shares,
                r.price,
                alert.score
            ));
        }

        if ranked.len() > config.max_digest_alerts {
            lines.push(String::new());
            lines.push(format!(
                "{} more purchases not shown",
                ranked.len() - config.max_digest_alerts
            ));
        }
    }

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} candidate(s) could not be processed this run",
            summary.failures.len()
        ));
    }

    lines.join("\n")
}

/// Format a dollar amount with thousands separators, no fraction.
fn format_usd(value: f64) -> String {
    let whole = value.round().abs() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 {
        format!("-{}", out)
    } else {
        out
    }
}

use crate::error::RadarError;

/// What uniquely identifies a processed filing in the dedup store.
/// Source data offers three workable granularities; this is a deployment
/// choice, not something the pipeline should hardcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupKeyMode {
    /// Accession number alone.
    #[default]
    Accession,
    /// Full URL of the primary document.
    DocumentUrl,
    /// Accession number plus primary document file name.
    AccessionAndDocument,
}

/// Immutable run configuration, built once at startup and passed into every
/// component. No process-wide globals.
#[derive(Debug, Clone)]
pub struct RadarConfig {
    /// Identifying User-Agent sent on every request. SEC requires a contact
    /// address; a value without one is a fatal configuration error.
    pub user_agent: String,
    /// EDGAR current-filings Atom feed URL template (`{count}` placeholder).
    pub feed_url: String,
    /// Minimum transaction value in USD.
    pub min_value_usd: f64,
    /// When true, a value exactly at the threshold passes. Default is the
    /// strict comparison (`>`).
    pub min_value_inclusive: bool,
    /// Enable the price-position structural filter.
    pub structural_filter: bool,
    /// Structural pass: latest close at or below this trailing-range percentile.
    pub range_percentile_ceiling: f64,
    /// Structural pass: drawdown from trailing high at or above this fraction.
    pub drawdown_floor: f64,
    /// Value breakpoints; each one crossed adds a scoring increment.
    pub value_tiers: Vec<f64>,
    /// Hard cap on candidates inspected per run.
    pub max_candidates: usize,
    /// Maximum alerts rendered into one digest.
    pub max_digest_alerts: usize,
    /// Pre-request jitter bounds in milliseconds.
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// Retry policy for the fetcher.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_ceiling_ms: u64,
    /// Dedup store bounds and persistence.
    pub dedup_capacity: usize,
    pub dedup_key: DedupKeyMode,
    pub state_path: String,
}

const DEFAULT_FEED_URL: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&type=4&count={count}&output=atom";

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            min_value_usd: 100_000.0,
            min_value_inclusive: false,
            structural_filter: false,
            range_percentile_ceiling: 0.5,
            drawdown_floor: 0.2,
            value_tiers: vec![250_000.0, 1_000_000.0, 5_000_000.0],
            max_candidates: 120,
            max_digest_alerts: 25,
            jitter_min_ms: 150,
            jitter_max_ms: 600,
            max_attempts: 4,
            backoff_base_ms: 1_000,
            backoff_ceiling_ms: 30_000,
            dedup_capacity: 5_000,
            dedup_key: DedupKeyMode::default(),
            state_path: "insider_db.json".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl RadarConfig {
    /// Load from environment variables. Fails (before any network activity)
    /// when the required identity string is missing or carries no contact.
    pub fn from_env() -> Result<Self, RadarError> {
        let defaults = Self::default();

        let user_agent = std::env::var("SEC_USER_AGENT")
            .unwrap_or_default()
            .trim()
            .to_string();
        if user_agent.is_empty() || !user_agent.contains('@') {
            return Err(RadarError::Config(
                "SEC_USER_AGENT must be set to a real identity with a contact email \
                 (e.g. \"Jane Doe jane@example.com\")"
                    .to_string(),
            ));
        }

        let dedup_key = match std::env::var("RADAR_DEDUP_KEY").unwrap_or_default().as_str() {
            "document-url" => DedupKeyMode::DocumentUrl,
            "accession+document" => DedupKeyMode::AccessionAndDocument,
            _ => DedupKeyMode::Accession,
        };

        Ok(Self {
            user_agent,
            feed_url: std::env::var("RADAR_FEED_URL").unwrap_or(defaults.feed_url),
            min_value_usd: env_parse("RADAR_MIN_USD", defaults.min_value_usd),
            min_value_inclusive: env_parse("RADAR_MIN_USD_INCLUSIVE", defaults.min_value_inclusive),
            structural_filter: env_parse("RADAR_STRUCTURAL_FILTER", defaults.structural_filter),
            range_percentile_ceiling: env_parse(
                "RADAR_RANGE_PERCENTILE_CEILING",
                defaults.range_percentile_ceiling,
            ),
            drawdown_floor: env_parse("RADAR_DRAWDOWN_FLOOR", defaults.drawdown_floor),
            value_tiers: defaults.value_tiers,
            max_candidates: env_parse("RADAR_MAX_CANDIDATES", defaults.max_candidates),
            max_digest_alerts: env_parse("RADAR_MAX_DIGEST_ALERTS", defaults.max_digest_alerts),
            jitter_min_ms: env_parse("RADAR_JITTER_MIN_MS", defaults.jitter_min_ms),
            jitter_max_ms: env_parse("RADAR_JITTER_MAX_MS", defaults.jitter_max_ms),
            max_attempts: env_parse("RADAR_MAX_ATTEMPTS", defaults.max_attempts),
            backoff_base_ms: env_parse("RADAR_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            backoff_ceiling_ms: env_parse("RADAR_BACKOFF_CEILING_MS", defaults.backoff_ceiling_ms),
            dedup_capacity: env_parse("RADAR_DEDUP_CAPACITY", defaults.dedup_capacity),
            dedup_key,
            state_path: std::env::var("RADAR_STATE_PATH").unwrap_or(defaults.state_path),
        })
    }

    /// Feed URL with the result-count query parameter applied.
    pub fn feed_url_for(&self, count: usize) -> String {
        self.feed_url.replace("{count}", &count.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url_count_substitution() {
        let config = RadarConfig {
            user_agent: "test test@example.com".to_string(),
            ..Default::default()
        };
        let url = config.feed_url_for(120);
        assert!(url.contains("count=120"));
        assert!(!url.contains("{count}"));
    }

    #[test]
    fn test_default_threshold_is_strict() {
        let config = RadarConfig::default();
        assert!(!config.min_value_inclusive);
        assert_eq!(config.min_value_usd, 100_000.0);
    }
}

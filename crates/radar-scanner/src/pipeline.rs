//! One scan: discover candidates, resolve and fetch documents, extract
//! transactions, filter, score, notify, persist.
//!
//! Candidates are processed strictly in feed order, one at a time; that
//! order fixes scoring tie-breaks and digest truncation. A malformed
//! document or a dead link never aborts the run — failures accumulate in the
//! run summary and surface as one advisory line in the digest.

use std::collections::HashMap;

use chrono::Utc;

use alert_engine::{build_digest, AlertEvaluator, Evaluation};
use dedup_store::DedupStore;
use edgar_client::{feed, resolver};
use radar_core::{
    CandidateFailure, DedupKeyMode, EnrichmentMetrics, Fetch, FilingCandidate,
    NotificationSink, PriceEnrichment, RadarConfig, RadarError, RunSummary, ScoredAlert,
};

/// Execute one full run. Returns an error only when the feed itself cannot
/// be retrieved (nothing was inspected, so nothing is lost by failing).
pub async fn run(
    config: &RadarConfig,
    fetcher: &dyn Fetch,
    enrichment: &dyn PriceEnrichment,
    sink: Option<&dyn NotificationSink>,
    store: &mut DedupStore,
) -> Result<RunSummary, RadarError> {
    let mut summary = RunSummary::default();
    let evaluator = AlertEvaluator::new(config);

    let feed_body = fetcher.fetch(&config.feed_url_for(config.max_candidates)).await?;
    let candidates = feed::discover(&feed_body, config.max_candidates);
    summary.candidates_discovered = candidates.len();
    tracing::info!("Feed yielded {} candidates", candidates.len());

    let mut alerts: Vec<ScoredAlert> = Vec::new();
    let mut metrics_cache: HashMap<String, Option<EnrichmentMetrics>> = HashMap::new();

    for candidate in &candidates {
        process_candidate(
            config,
            fetcher,
            enrichment,
            &evaluator,
            store,
            candidate,
            &mut alerts,
            &mut metrics_cache,
            &mut summary,
        )
        .await;
    }

    summary.alerts_accepted = alerts.len();

    let digest = build_digest(config, &alerts, &summary, Utc::now());
    match sink {
        Some(sink) => {
            if let Err(e) = sink.send(&digest).await {
                tracing::error!("Digest delivery via {} failed: {}", sink.name(), e);
            }
        }
        None => tracing::info!("No notification sink configured; digest:\n{}", digest),
    }

    // The digest is already out; a failed save only degrades the next run's
    // dedup accuracy, so it is reported rather than raised.
    if let Err(e) = store.persist() {
        tracing::error!("Could not persist dedup store: {}", e);
        summary.persist_failed = true;
    }

    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
async fn process_candidate(
    config: &RadarConfig,
    fetcher: &dyn Fetch,
    enrichment: &dyn PriceEnrichment,
    evaluator: &AlertEvaluator,
    store: &mut DedupStore,
    candidate: &FilingCandidate,
    alerts: &mut Vec<ScoredAlert>,
    metrics_cache: &mut HashMap<String, Option<EnrichmentMetrics>>,
    summary: &mut RunSummary,
) {
    // Resolve the primary document first; two of the dedup key modes need
    // its name.
    let doc_url = match resolver::resolve(fetcher, candidate).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            // Inspected, nothing to extract; do not revisit. The advisory is
            // only raised the first time (record is first-write-wins).
            if store.record(&candidate.accession, false, Utc::now()) {
                summary
                    .failures
                    .push((candidate.accession.clone(), CandidateFailure::NoDocument));
            } else {
                summary.skipped_seen += 1;
            }
            return;
        }
        Err(RadarError::Parse(e)) => {
            if store.record(&candidate.accession, false, Utc::now()) {
                summary
                    .failures
                    .push((candidate.accession.clone(), CandidateFailure::Parse(e)));
            } else {
                summary.skipped_seen += 1;
            }
            return;
        }
        Err(e) => {
            // Manifest unreachable: no dedup entry, so the next run retries.
            summary
                .failures
                .push((candidate.accession.clone(), CandidateFailure::Fetch(e.to_string())));
            return;
        }
    };

    let key = dedup_key(config.dedup_key, candidate, &doc_url);
    if store.seen(&key) {
        summary.skipped_seen += 1;
        return;
    }

    let body = match fetcher.fetch(&doc_url).await {
        Ok(body) => body,
        Err(e) => {
            summary
                .failures
                .push((candidate.accession.clone(), CandidateFailure::Fetch(e.to_string())));
            return;
        }
    };
    summary.documents_fetched += 1;

    let doc = match form4_parser::extract(&body, &candidate.accession) {
        Ok(doc) => doc,
        Err(e) => {
            store.record(&key, false, Utc::now());
            summary
                .failures
                .push((candidate.accession.clone(), CandidateFailure::Parse(e.to_string())));
            return;
        }
    };

    if doc.ticker.is_none() {
        store.record(&key, false, Utc::now());
        summary
            .failures
            .push((candidate.accession.clone(), CandidateFailure::NoTicker));
        return;
    }

    summary.records_extracted += doc.transactions.len();

    let mut matched = false;
    for record in &doc.transactions {
        // Enrichment is only worth a network call for purchases; everything
        // else is rejected before the metrics are consulted.
        let metrics = if record.is_purchase() {
            lookup_metrics(enrichment, metrics_cache, &record.ticker).await
        } else {
            None
        };

        match evaluator.evaluate(record, metrics.as_ref()) {
            Evaluation::Accepted(alert) => {
                matched = true;
                alerts.push(*alert);
            }
            Evaluation::Rejected(reason) => {
                tracing::debug!(
                    "{} {} rejected: {:?}",
                    record.ticker,
                    candidate.accession,
                    reason
                );
            }
        }
    }

    store.record(&key, matched, Utc::now());
}

fn dedup_key(mode: DedupKeyMode, candidate: &FilingCandidate, doc_url: &str) -> String {
    match mode {
        DedupKeyMode::Accession => candidate.accession.clone(),
        DedupKeyMode::DocumentUrl => doc_url.to_string(),
        DedupKeyMode::AccessionAndDocument => {
            let doc_name = doc_url.rsplit('/').next().unwrap_or(doc_url);
            format!("{}::{}", candidate.accession, doc_name)
        }
    }
}

/// One enrichment lookup per ticker per run.
async fn lookup_metrics(
    enrichment: &dyn PriceEnrichment,
    cache: &mut HashMap<String, Option<EnrichmentMetrics>>,
    ticker: &str,
) -> Option<EnrichmentMetrics> {
    if let Some(cached) = cache.get(ticker) {
        return cached.clone();
    }
    let metrics = enrichment.metrics(ticker).await;
    cache.insert(ticker.to_string(), metrics.clone());
    metrics
}

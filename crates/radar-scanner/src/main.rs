//! radar-scanner: poll the EDGAR current-filings feed for Form 4 insider
//! purchases, filter and score them, and deliver one digest per run.
//!
//! Required environment: SEC_USER_AGENT (identity with a contact email).
//! Optional: TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID for delivery,
//! POLYGON_API_KEY for price-position enrichment, RADAR_* overrides for the
//! thresholds and retry policy.
//!
//! One invocation is one run; external scheduling (cron, CI) must not start
//! two runs against the same state file concurrently.

mod pipeline;

use dedup_store::DedupStore;
use edgar_client::EdgarClient;
use market_data::{MarketDataClient, NoEnrichment};
use radar_core::{NotificationSink, PriceEnrichment, RadarConfig};
use telegram_notifier::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radar_scanner=info,edgar_client=info".into()),
        )
        .init();

    // Missing identity is fatal before any network activity.
    let config = match RadarConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let fetcher = EdgarClient::new(&config);

    let enrichment: Box<dyn PriceEnrichment> = match MarketDataClient::from_env() {
        Some(client) => {
            tracing::info!("Price enrichment enabled");
            Box::new(client)
        }
        None => {
            tracing::info!("POLYGON_API_KEY not set; structural metrics unavailable");
            Box::new(NoEnrichment)
        }
    };

    let sink = TelegramNotifier::from_env();
    if sink.is_none() {
        tracing::warn!(
            "TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set; digest will only be logged"
        );
    }

    let mut store = DedupStore::load(&config.state_path, config.dedup_capacity);
    tracing::info!(
        "Loaded dedup store from {} ({} entries)",
        config.state_path,
        store.len()
    );

    let summary = pipeline::run(
        &config,
        &fetcher,
        enrichment.as_ref(),
        sink.as_ref().map(|s| s as &dyn NotificationSink),
        &mut store,
    )
    .await?;

    tracing::info!(
        "Run complete: {} candidates, {} already seen, {} documents fetched, \
         {} records extracted, {} alerts, {} failures",
        summary.candidates_discovered,
        summary.skipped_seen,
        summary.documents_fetched,
        summary.records_extracted,
        summary.alerts_accepted,
        summary.failures.len()
    );
    for (accession, failure) in &summary.failures {
        tracing::warn!("{}: {}", accession, failure);
    }

    Ok(())
}

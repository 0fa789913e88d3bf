//! Pipeline Runtime
//!
//! This binary wires the sighting pipeline:
//! - Loads configuration and the rule table
//! - Builds the PipelineContext (job-id cache, trackers, dispatcher)
//! - Spawns background tasks (job-id refresh, status report, ingestion)
//! - Reads JSON-lines event batches from stdin into the ingestion channel
//!
//! Usage:
//!   cargo run --release --bin pipeline_runtime
//!
//! Environment variables: see `PipelineConfig::from_env`.

use dotenv::dotenv;
use log::{error, info};
use sightline::pipeline::{
    config::PipelineConfig,
    ingestion::{forward_json_lines, start_batch_ingestion},
    roblox::RobloxServerSource,
    scheduler::{job_refresh_task, status_report_task},
    Classifier, CounterAggregator, Dispatcher, DiscordWebhookClient, EventBatch, JobIdCache,
    PipelineContext, PresenceTracker,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

const INGEST_CHANNEL_BUFFER: usize = 1_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Sightline Pipeline Runtime");

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    let rules = config.load_rules()?;

    info!("📊 Configuration:");
    info!("   ├─ Place id: {}", config.place_id);
    info!(
        "   ├─ Job cache TTL: {}s (refresh every {}s)",
        config.cache_ttl_secs, config.refresh_interval_secs
    );
    info!("   ├─ Presence window: {}s", config.presence_window_secs);
    info!("   ├─ Notification channels: {}", config.channels.len());
    info!("   ├─ Counter thresholds: {:?}", config.counter_thresholds);
    info!(
        "   └─ Rules: {}",
        config.rules_path.as_deref().unwrap_or("built-in")
    );

    let source = Arc::new(RobloxServerSource::new(
        &config.place_id,
        config.page_limit,
        config.http_timeout(),
    )?);
    let webhooks = Arc::new(DiscordWebhookClient::new(
        config.http_timeout(),
        config.status_webhook_url.clone(),
    )?);

    let job_cache = Arc::new(JobIdCache::new(source, config.cache_policy()));
    let context = Arc::new(PipelineContext::new(
        Classifier::new(Arc::new(rules)),
        job_cache.clone(),
        Arc::new(PresenceTracker::new(config.presence_window_secs)),
        Arc::new(CounterAggregator::new(&config.counter_thresholds)),
        Dispatcher::new(webhooks.clone(), config.channels.clone(), config.http_timeout()),
    ));
    info!("✅ PipelineContext created");

    // Task 1: Job-id refresh
    tokio::spawn(job_refresh_task(job_cache, config.refresh_interval_secs));

    // Task 2: Status report (only with a status webhook)
    if config.status_webhook_url.is_some() {
        let reporter = context.status_reporter(
            webhooks,
            config.status_active_ceiling,
            config.http_timeout(),
        );
        tokio::spawn(status_report_task(reporter, config.status_interval_ms));
    } else {
        info!("⚠️  STATUS_WEBHOOK_URL not set, status report disabled");
    }

    // Task 3: Ingestion fed from stdin
    let (tx, rx) = mpsc::channel::<EventBatch>(INGEST_CHANNEL_BUFFER);
    tokio::spawn(start_batch_ingestion(rx, context.clone()));
    tokio::spawn(async move {
        let forwarded = forward_json_lines(BufReader::new(tokio::io::stdin()), tx).await;
        info!("stdin closed after {} batches", forwarded);
    });

    info!("✅ All background tasks running");
    info!("🔄 Press CTRL+C to shutdown");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    let stats = context.stats();
    info!(
        "✅ Pipeline runtime stopped ({} reporters, {} entities, {} sent, {} failed)",
        stats.total_reporters,
        stats.total_entities,
        stats.notifications_sent,
        stats.notifications_failed
    );
    Ok(())
}

//! Pipeline schedulers for background tasks
//!
//! Two long-lived loops, each owning nothing but what it is handed:
//! - job-id refresh (TTL gating lives in the cache, so the interval may be
//!   shorter than the TTL)
//! - status report tick
//!
//! Neither loop is awaited by anyone; shutdown simply stops scheduling them.

use super::job_cache::{JobIdCache, RefreshOutcome};
use super::status::StatusReporter;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Job-id refresh task - periodically refresh the server pool
///
/// Arguments:
/// - `cache`: Shared job-id cache
/// - `refresh_interval_secs`: How often to trigger a refresh
///
/// This function runs indefinitely until cancelled.
pub async fn job_refresh_task(cache: Arc<JobIdCache>, refresh_interval_secs: u64) {
    log::info!("🔄 Starting job id refresh loop (interval: {}s)", refresh_interval_secs);

    let mut timer = interval(Duration::from_secs(refresh_interval_secs));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        match cache.refresh().await {
            RefreshOutcome::Fresh | RefreshOutcome::InFlight => {}
            outcome => {
                log::debug!("Job id refresh finished: {:?} (pool: {})", outcome, cache.len())
            }
        }
    }
}

/// Status report task - tick the reporter on a fixed interval
///
/// A slow channel only delays the report; missed ticks are skipped rather
/// than replayed in a burst.
///
/// This function runs indefinitely until cancelled.
pub async fn status_report_task(mut reporter: StatusReporter, status_interval_ms: u64) {
    log::info!("📡 Starting status report loop (interval: {}ms)", status_interval_ms);

    let mut timer = interval(Duration::from_millis(status_interval_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        reporter.tick().await;
    }
}

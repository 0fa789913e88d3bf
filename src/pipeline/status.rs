//! Self-correcting status report
//!
//! Keeps one external message up to date. The reporter starts
//! `Uninitialized`, creates the message on its first successful tick and
//! from then on edits it in place. If an edit fails (message deleted,
//! webhook rotated, channel down) the id is dropped and the next tick
//! creates a fresh message.

use super::counters::{CounterAggregator, CounterBucket};
use super::error::DeliveryError;
use super::job_cache::JobIdCache;
use super::presence::PresenceTracker;
use super::types::{system_clock, Clock};
use super::webhook::{Embed, EmbedField, EmbedFooter, WebhookMessage};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// External channel holding the status message
#[async_trait]
pub trait StatusChannel: Send + Sync {
    /// Create the message and return its id
    async fn create(&self, message: &WebhookMessage) -> Result<String, DeliveryError>;

    /// Replace the content of an existing message
    async fn update(&self, message_id: &str, message: &WebhookMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusBinding {
    Uninitialized,
    Bound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Created(String),
    Updated,
    CreateFailed,
    UpdateFailed,
}

/// Point-in-time view rendered into the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active_reporters: usize,
    pub buckets: Vec<CounterBucket>,
    pub pool_size: usize,
    pub taken_at: i64,
}

pub struct StatusReporter {
    presence: Arc<PresenceTracker>,
    counters: Arc<CounterAggregator>,
    job_cache: Arc<JobIdCache>,
    channel: Arc<dyn StatusChannel>,
    binding: StatusBinding,
    active_ceiling: usize,
    call_timeout: Duration,
    now_fn: Clock,
}

impl StatusReporter {
    pub fn new(
        presence: Arc<PresenceTracker>,
        counters: Arc<CounterAggregator>,
        job_cache: Arc<JobIdCache>,
        channel: Arc<dyn StatusChannel>,
        active_ceiling: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            presence,
            counters,
            job_cache,
            channel,
            binding: StatusBinding::Uninitialized,
            active_ceiling,
            call_timeout,
            now_fn: system_clock(),
        }
    }

    /// Replace the time source used for snapshots
    pub fn with_clock(mut self, now_fn: Clock) -> Self {
        self.now_fn = now_fn;
        self
    }

    pub fn binding(&self) -> &StatusBinding {
        &self.binding
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active_reporters: self.presence.active_count(),
            buckets: self.counters.snapshot(),
            pool_size: self.job_cache.len(),
            taken_at: (self.now_fn)(),
        }
    }

    /// Evict stale reporters, render the report and push it
    pub async fn tick(&mut self) -> TickOutcome {
        let evicted = self.presence.evict_stale();
        if evicted > 0 {
            log::debug!("Evicted {} inactive reporters", evicted);
        }

        let message = render_report(&self.snapshot(), self.active_ceiling);

        match std::mem::replace(&mut self.binding, StatusBinding::Uninitialized) {
            StatusBinding::Uninitialized => {
                match bounded(self.call_timeout, self.channel.create(&message)).await {
                    Ok(id) => {
                        log::info!("✅ Status message created ({})", id);
                        self.binding = StatusBinding::Bound(id.clone());
                        TickOutcome::Created(id)
                    }
                    Err(e) => {
                        log::warn!(
                            "⚠️  Status message create failed, retrying next tick: {}",
                            e
                        );
                        TickOutcome::CreateFailed
                    }
                }
            }
            StatusBinding::Bound(id) => {
                match bounded(self.call_timeout, self.channel.update(&id, &message)).await {
                    Ok(()) => {
                        self.binding = StatusBinding::Bound(id);
                        TickOutcome::Updated
                    }
                    Err(e) => {
                        log::warn!(
                            "⚠️  Status message {} update failed, recreating: {}",
                            id,
                            e
                        );
                        TickOutcome::UpdateFailed
                    }
                }
            }
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, DeliveryError>>,
) -> Result<T, DeliveryError> {
    timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(DeliveryError::Timeout(limit)))
}

const BAR_WIDTH: usize = 20;

/// Text progress bar of `value` against `ceiling`, clamped at full
pub fn progress_bar(value: usize, ceiling: usize) -> String {
    let filled = if ceiling == 0 {
        if value > 0 { BAR_WIDTH } else { 0 }
    } else {
        value.min(ceiling) * BAR_WIDTH / ceiling
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Short magnitude label: 100_000_000 → "100M", 1_500_000 → "1.5M"
pub fn format_magnitude(value: u64) -> String {
    for (unit, suffix) in [(1_000_000_000u64, "B"), (1_000_000, "M"), (1_000, "K")] {
        if value >= unit {
            return if value % unit == 0 {
                format!("{}{}", value / unit, suffix)
            } else {
                let scaled = format!("{:.1}", value as f64 / unit as f64);
                format!("{}{}", scaled.trim_end_matches(".0"), suffix)
            };
        }
    }
    value.to_string()
}

/// Fixed-layout report: presence bar header, one field per bucket, pool size
pub fn render_report(snapshot: &StatusSnapshot, active_ceiling: usize) -> WebhookMessage {
    let description = format!(
        "`{}` **{}/{}** active reporters",
        progress_bar(snapshot.active_reporters, active_ceiling),
        snapshot.active_reporters,
        active_ceiling
    );

    let mut fields: Vec<EmbedField> = snapshot
        .buckets
        .iter()
        .map(|b| {
            let name = format!("> {}/s", format_magnitude(b.threshold));
            EmbedField::new(name, b.count.to_string(), true)
        })
        .collect();
    fields.push(EmbedField::new("Job IDs", snapshot.pool_size.to_string(), true));

    let timestamp = chrono::DateTime::from_timestamp(snapshot.taken_at, 0).map(|t| t.to_rfc3339());

    WebhookMessage {
        content: None,
        username: None,
        embeds: vec![Embed {
            title: "📡 Sightline Status".to_string(),
            description: Some(description),
            color: 0x5865F2,
            fields,
            footer: Some(EmbedFooter {
                text: "Cumulative counts since start".to_string(),
            }),
            timestamp,
        }],
    }
}

//! Pipeline context - process-scoped owner of all shared state
//!
//! Built once at startup and shared as `Arc<PipelineContext>` with the
//! intake, the refresh loop and the status loop.
//!
//! ## Ingest flow
//!
//! ```text
//! EventBatch
//!     ↓
//! PresenceTracker::touch(reporter)
//!     ↓ (per entity, arrival order)
//! CounterAggregator::record ─ Classifier::classify ─ Dispatcher::enqueue (spawned)
//!     ↓
//! EventStore::append
//!     ↓
//! IngestAck
//! ```
//!
//! Nothing on this path waits for the network.

use super::classifier::Classifier;
use super::counters::CounterAggregator;
use super::dispatcher::{DeliveryCounts, Dispatcher};
use super::job_cache::JobIdCache;
use super::presence::PresenceTracker;
use super::status::{StatusChannel, StatusReporter};
use super::store::EventStore;
use super::types::{DispatchContext, EventBatch, IngestAck, DEFAULT_REPORTER_ID};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_reporters: usize,
    pub total_entities: usize,
    pub available_job_ids: usize,
    pub active_reporters: usize,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub reporters: Vec<String>,
}

pub struct PipelineContext {
    classifier: Classifier,
    job_cache: Arc<JobIdCache>,
    presence: Arc<PresenceTracker>,
    counters: Arc<CounterAggregator>,
    dispatcher: Dispatcher,
    store: EventStore,
}

impl PipelineContext {
    pub fn new(
        classifier: Classifier,
        job_cache: Arc<JobIdCache>,
        presence: Arc<PresenceTracker>,
        counters: Arc<CounterAggregator>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            classifier,
            job_cache,
            presence,
            counters,
            dispatcher,
            store: EventStore::new(),
        }
    }

    pub fn job_cache(&self) -> &Arc<JobIdCache> {
        &self.job_cache
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    pub fn counters(&self) -> &Arc<CounterAggregator> {
        &self.counters
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Accept one batch from a reporter
    ///
    /// An empty batch still refreshes the reporter's presence. Notification
    /// sends are spawned onto the current Tokio runtime and not awaited;
    /// without a runtime they are dropped and counted as failed.
    pub fn ingest(&self, batch: EventBatch) -> IngestAck {
        let reporter_id = match batch.reporter_id.trim() {
            "" => DEFAULT_REPORTER_ID.to_string(),
            id => id.to_string(),
        };

        self.presence.touch(&reporter_id);

        let context = DispatchContext {
            reporter_id: reporter_id.clone(),
            job_id: batch.current_job_id.clone(),
        };

        let mut notified = 0usize;
        for entity in &batch.entities {
            self.counters.record(entity.magnitude);

            let category = self.classifier.classify(entity);
            if self.dispatcher.enqueue(entity, category, &context).is_some() {
                notified += 1;
            }
        }

        self.store
            .append(&reporter_id, &batch.entities, batch.current_job_id.as_deref());

        log::info!(
            "📥 Reporter '{}' sent {} entities from job {:?} ({} notifications queued)",
            reporter_id,
            batch.entities.len(),
            batch.current_job_id,
            notified
        );

        IngestAck {
            status: "ok".to_string(),
            accepted: batch.entities.len(),
            job_id: batch.current_job_id,
        }
    }

    /// Random job id from the pool, `None` while the pool is empty
    pub fn pick_job_id(&self) -> Option<String> {
        let picked = self.job_cache.pick_random();
        match &picked {
            Some(id) => log::debug!("Job id handed out: {}", id),
            None => log::debug!("No job id available"),
        }
        picked
    }

    pub fn delivery_stats(&self) -> DeliveryCounts {
        self.dispatcher.delivery_stats()
    }

    pub fn stats(&self) -> PipelineStats {
        let delivery = self.dispatcher.delivery_stats();

        PipelineStats {
            total_reporters: self.store.reporter_count(),
            total_entities: self.store.entity_count(),
            available_job_ids: self.job_cache.len(),
            active_reporters: self.presence.active_count(),
            notifications_sent: delivery.sent,
            notifications_failed: delivery.failed,
            reporters: self.store.reporters(),
        }
    }

    /// Status reporter wired to this context's trackers
    pub fn status_reporter(
        &self,
        channel: Arc<dyn StatusChannel>,
        active_ceiling: usize,
        call_timeout: Duration,
    ) -> StatusReporter {
        StatusReporter::new(
            self.presence.clone(),
            self.counters.clone(),
            self.job_cache.clone(),
            channel,
            active_ceiling,
            call_timeout,
        )
    }
}

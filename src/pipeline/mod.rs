//! # Sighting Pipeline
//!
//! Ingests entity sightings from many reporters, classifies each one,
//! fans notifications out to webhooks, and keeps a rotating pool of
//! upstream server job ids.
//!
//! ## Architecture
//!
//! ```text
//! EventBatch ──► PipelineContext::ingest
//!                   ├─ PresenceTracker   (rolling activity window)
//!                   ├─ CounterAggregator (cumulative thresholds)
//!                   ├─ Classifier ──► Dispatcher ──► NotificationSink (spawned)
//!                   └─ EventStore        (append-only, per reporter)
//!
//! job_refresh_task ──► JobIdCache::refresh ──► PageSource (paginated, rate-limited)
//!
//! status_report_task ──► StatusReporter::tick ──► StatusChannel (create / edit)
//! ```
//!
//! All state is process-lifetime only and owned by one `PipelineContext`.
//!
//! ## Module Organization
//!
//! - `types` - Entity, Category, batches and acks
//! - `rules` / `classifier` - Static rule table and precedence lookup
//! - `job_cache` / `roblox` - Job-id pool and its Roblox page source
//! - `dispatcher` / `webhook` - Notification fan-out and Discord client
//! - `presence` / `counters` - Activity window and threshold counters
//! - `status` - Self-correcting status report
//! - `store` - Raw per-reporter event log
//! - `engine` - Context object and ingest path
//! - `ingestion` / `scheduler` - Background tasks
//! - `config` / `error` - Environment configuration and error types

pub mod types;
pub mod error;
pub mod rules;
pub mod classifier;
pub mod job_cache;
pub mod roblox;
pub mod dispatcher;
pub mod webhook;
pub mod presence;
pub mod counters;
pub mod status;
pub mod store;
pub mod engine;
pub mod ingestion;
pub mod scheduler;
pub mod config;

// Re-export commonly used types
pub use types::{Category, Clock, DispatchContext, Entity, EventBatch, IngestAck, StoredEntity};
pub use error::{ConfigError, DeliveryError, FetchError, RulesError};
pub use rules::{RuleTable, ThresholdRule};
pub use classifier::Classifier;
pub use job_cache::{CachePolicy, JobIdCache, PageSource, RefreshOutcome, ServerPage};
pub use dispatcher::{ChannelMap, DeliveryCounts, Dispatcher, NotificationSink};
pub use webhook::{DiscordWebhookClient, WebhookMessage};
pub use presence::PresenceTracker;
pub use counters::{CounterAggregator, CounterBucket};
pub use status::{StatusBinding, StatusChannel, StatusReporter, StatusSnapshot, TickOutcome};
pub use store::EventStore;
pub use engine::{PipelineContext, PipelineStats};
pub use config::PipelineConfig;

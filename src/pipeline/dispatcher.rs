//! Fire-and-forget notification fan-out
//!
//! Every enqueued entity becomes its own spawned task doing exactly one
//! send. Failures are logged and counted, never retried, and never reach
//! the ingest path. Delivery is at-most-once.

use super::error::DeliveryError;
use super::types::{Category, DispatchContext, Entity};
use super::webhook::{Embed, EmbedField, EmbedFooter, WebhookMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Outbound notification channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message to the channel address
    async fn send(&self, channel: &str, message: &WebhookMessage) -> Result<(), DeliveryError>;
}

/// Category → channel address (several categories may share one address)
pub type ChannelMap = HashMap<Category, String>;

#[derive(Debug, Default)]
pub struct DeliveryStats {
    sent: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryCounts {
    pub sent: u64,
    pub failed: u64,
}

impl DeliveryStats {
    pub fn counts(&self) -> DeliveryCounts {
        DeliveryCounts {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    channels: Arc<ChannelMap>,
    send_timeout: Duration,
    stats: Arc<DeliveryStats>,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        channels: ChannelMap,
        send_timeout: Duration,
    ) -> Self {
        Self {
            sink,
            channels: Arc::new(channels),
            send_timeout,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    pub fn channel_for(&self, category: Category) -> Option<&str> {
        self.channels.get(&category).map(String::as_str)
    }

    pub fn delivery_stats(&self) -> DeliveryCounts {
        self.stats.counts()
    }

    /// Spawn one send for the entity; returns immediately
    ///
    /// Returns `None` when nothing was spawned (uncategorized entity, no
    /// channel bound to the category, or no Tokio runtime on this thread).
    /// Callers on the ingest path drop the handle.
    pub fn enqueue(
        &self,
        entity: &Entity,
        category: Category,
        context: &DispatchContext,
    ) -> Option<JoinHandle<()>> {
        if !category.is_notifiable() {
            return None;
        }

        let Some(channel) = self.channel_for(category).map(str::to_string) else {
            log::debug!(
                "No channel bound to {}, skipping {}",
                category.as_str(),
                entity.trimmed_name()
            );
            return None;
        };

        let name = entity.trimmed_name().to_string();
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "⚠️  No async runtime, {} notification for {} dropped",
                    category.as_str(),
                    name
                );
                return None;
            }
        };

        let message = build_notification(entity, category, context);
        let sink = self.sink.clone();
        let stats = self.stats.clone();
        let send_timeout = self.send_timeout;

        Some(runtime.spawn(async move {
            let result = match timeout(send_timeout, sink.send(&channel, &message)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout(send_timeout)),
            };

            match result {
                Ok(()) => {
                    stats.sent.fetch_add(1, Ordering::Relaxed);
                    log::debug!("✅ Sent {} notification for {}", category.as_str(), name);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "⚠️  {} notification for {} dropped: {}",
                        category.as_str(),
                        name,
                        e
                    );
                }
            }
        }))
    }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Render the embed sent for one classified entity
pub fn build_notification(
    entity: &Entity,
    category: Category,
    context: &DispatchContext,
) -> WebhookMessage {
    let magnitude = if entity.magnitude_label.trim().is_empty() {
        entity.magnitude.to_string()
    } else {
        entity.magnitude_label.clone()
    };

    let job = context
        .job_id
        .as_deref()
        .map(|id| format!("`{}`", id))
        .unwrap_or_else(|| "-".to_string());

    WebhookMessage {
        content: None,
        username: None,
        embeds: vec![Embed {
            title: format!("{} · {}", category.as_str(), entity.trimmed_name()),
            description: None,
            color: category.color(),
            fields: vec![
                EmbedField::new("Gen", magnitude, true),
                EmbedField::new("Rarity", or_dash(&entity.quality_tier), true),
                EmbedField::new("Mutation", or_dash(&entity.mutation_tag), true),
                EmbedField::new("Traits", or_dash(&entity.trait_tag), true),
                EmbedField::new("Reporter", or_dash(&context.reporter_id), true),
                EmbedField::new("Job ID", job, false),
            ],
            footer: Some(EmbedFooter {
                text: "sightline".to_string(),
            }),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, WebhookMessage)>>,
        fail_channels: Vec<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, channel: &str, message: &WebhookMessage) -> Result<(), DeliveryError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_channels.iter().any(|c| c == channel) {
                return Err(DeliveryError::Status(500));
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel.to_string(), message.clone()));
            Ok(())
        }
    }

    fn channels() -> ChannelMap {
        let mut map = ChannelMap::new();
        map.insert(Category::TierA, "hook://tier-a".to_string());
        map.insert(Category::TierB, "hook://shared".to_string());
        map.insert(Category::TierC, "hook://shared".to_string());
        map.insert(Category::HighMagnitude, "hook://high".to_string());
        map
    }

    fn context() -> DispatchContext {
        DispatchContext {
            reporter_id: "player-1".to_string(),
            job_id: Some("job-42".to_string()),
        }
    }

    #[tokio::test]
    async fn test_enqueue_sends_to_category_channel() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_secs(1));

        let handle = dispatcher
            .enqueue(&Entity::new("Dragon Cannelloni", 5), Category::TierA, &context())
            .unwrap();
        handle.await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "hook://tier-a");
        assert_eq!(sent[0].1.embeds[0].title, "TIER_A · Dragon Cannelloni");
        assert_eq!(dispatcher.delivery_stats(), DeliveryCounts { sent: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_uncategorized_and_unbound_are_noops() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_secs(1));

        assert!(dispatcher
            .enqueue(&Entity::new("Noobini", 1), Category::Uncategorized, &context())
            .is_none());
        assert!(dispatcher
            .enqueue(&Entity::new("Strawberry Elephant", 1), Category::SpecialX, &context())
            .is_none());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_block_other_sends() {
        let sink = Arc::new(RecordingSink {
            fail_channels: vec!["hook://tier-a".to_string()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_secs(1));

        let handles = vec![
            dispatcher.enqueue(&Entity::new("A", 1), Category::TierA, &context()),
            dispatcher.enqueue(&Entity::new("B", 1), Category::TierB, &context()),
            dispatcher.enqueue(&Entity::new("C", 1), Category::TierC, &context()),
        ];
        for handle in handles.into_iter().flatten() {
            handle.await.unwrap();
        }

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(channel, _)| channel == "hook://shared"));
        assert_eq!(dispatcher.delivery_stats(), DeliveryCounts { sent: 2, failed: 1 });
    }

    #[tokio::test]
    async fn test_enqueue_does_not_wait_for_delivery() {
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(300)),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_secs(5));

        let started = std::time::Instant::now();
        let handle = dispatcher
            .enqueue(&Entity::new("A", 1), Category::TierA, &context())
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(sink.sent.lock().unwrap().is_empty());

        handle.await.unwrap();
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_send_times_out() {
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_millis(50));

        dispatcher
            .enqueue(&Entity::new("A", 1), Category::TierA, &context())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(dispatcher.delivery_stats(), DeliveryCounts { sent: 0, failed: 1 });
    }

    #[test]
    fn test_enqueue_without_runtime_counts_failure() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone(), channels(), Duration::from_secs(1));

        let handle = dispatcher.enqueue(&Entity::new("A", 1), Category::TierA, &context());

        assert!(handle.is_none());
        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(dispatcher.delivery_stats(), DeliveryCounts { sent: 0, failed: 1 });
    }

    #[test]
    fn test_notification_fields() {
        let mut entity = Entity::new("  Pot Hotspot ", 2_500_000);
        entity.magnitude_label = "$2.5M/s".to_string();
        entity.quality_tier = "Secret".to_string();

        let message = build_notification(&entity, Category::TierB, &context());
        let embed = &message.embeds[0];

        assert_eq!(embed.title, "TIER_B · Pot Hotspot");
        assert_eq!(embed.color, Category::TierB.color());
        assert_eq!(embed.fields[0].value, "$2.5M/s");
        assert_eq!(embed.fields[1].value, "Secret");
        assert_eq!(embed.fields[2].value, "-");
        assert_eq!(embed.fields[5].value, "`job-42`");
    }
}

//! Pipeline ingestion - async channel processor for event batches
//!
//! The request layer (or any other producer) pushes `EventBatch`es into an
//! mpsc channel; this task feeds them to `PipelineContext::ingest` in
//! arrival order.

use super::engine::PipelineContext;
use super::types::EventBatch;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Start batch ingestion from the channel
///
/// Logs throughput every 10 seconds. Runs until every sender is dropped.
pub async fn start_batch_ingestion(
    mut rx: mpsc::Receiver<EventBatch>,
    context: Arc<PipelineContext>,
) {
    log::info!("🚀 Starting batch ingestion");

    let mut entity_count = 0u64;
    let mut last_log_time = std::time::Instant::now();

    while let Some(batch) = rx.recv().await {
        let ack = context.ingest(batch);
        entity_count += ack.accepted as u64;

        if last_log_time.elapsed().as_secs() >= 10 {
            let per_sec = entity_count as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!(
                "📊 Ingestion rate: {:.1} entities/sec (total: {})",
                per_sec,
                entity_count
            );
            last_log_time = std::time::Instant::now();
            entity_count = 0;
        }
    }

    log::info!("Batch ingestion stopped (all senders closed)");
}

/// Forward JSON-lines batches from a reader into the ingestion channel
///
/// Malformed lines are logged and skipped. Returns the number of batches
/// forwarded once the reader hits EOF or the channel closes.
pub async fn forward_json_lines<R>(reader: R, tx: mpsc::Sender<EventBatch>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("❌ Failed to read batch input: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<EventBatch>(&line) {
            Ok(batch) => {
                if tx.send(batch).await.is_err() {
                    break; // Channel closed
                }
                forwarded += 1;
            }
            Err(e) => log::warn!("⚠️  Skipping malformed batch: {}", e),
        }
    }

    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Entity;

    #[tokio::test]
    async fn test_forward_json_lines_skips_malformed() {
        let input = concat!(
            r#"{"reporterId": "p1", "entities": [{"name": "A", "magnitude": 1}]}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"pets": [{"index": "B", "gen": 2}], "current_job_id": "job-1"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(10);

        let forwarded = forward_json_lines(input.as_bytes(), tx).await;
        assert_eq!(forwarded, 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.reporter_id, "p1");
        assert_eq!(first.entities, vec![Entity::new("A", 1)]);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.current_job_id.as_deref(), Some("job-1"));
        assert_eq!(second.entities[0].name, "B");

        // Sender dropped after EOF
        assert!(rx.recv().await.is_none());
    }
}

//! Append-only in-memory event store keyed by reporter id
//!
//! Process-lifetime only; nothing is written to disk.

use super::types::{Entity, StoredEntity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Stored entity with the reporter it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterEntity {
    pub reporter_id: String,
    #[serde(flatten)]
    pub stored: StoredEntity,
}

#[derive(Debug, Default)]
pub struct EventStore {
    by_reporter: RwLock<BTreeMap<String, Vec<StoredEntity>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch for a reporter, tagging each entity with its source job id
    ///
    /// A reporter is registered even when the batch is empty.
    pub fn append(&self, reporter_id: &str, entities: &[Entity], job_id: Option<&str>) {
        let mut map = self.by_reporter.write().unwrap_or_else(PoisonError::into_inner);
        let list = map.entry(reporter_id.to_string()).or_default();
        list.extend(entities.iter().map(|entity| StoredEntity {
            entity: entity.clone(),
            sent_from_job_id: job_id.map(str::to_string),
        }));
    }

    /// Everything a reporter has sent, oldest first (empty for unknown reporters)
    pub fn entities_for(&self, reporter_id: &str) -> Vec<StoredEntity> {
        self.by_reporter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reporter_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every stored entity across reporters, grouped by reporter id
    pub fn all_entities(&self) -> Vec<ReporterEntity> {
        let map = self.by_reporter.read().unwrap_or_else(PoisonError::into_inner);
        map.iter()
            .flat_map(|(reporter_id, list)| {
                list.iter().map(move |stored| ReporterEntity {
                    reporter_id: reporter_id.clone(),
                    stored: stored.clone(),
                })
            })
            .collect()
    }

    pub fn reporters(&self) -> Vec<String> {
        self.by_reporter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn reporter_count(&self) -> usize {
        self.by_reporter.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn entity_count(&self) -> usize {
        self.by_reporter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

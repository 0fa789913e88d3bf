//! Core data types shared across the pipeline
//!
//! Wire payloads from reporter agents use the short field names
//! (`index`, `gen`, `genText`, `rarity`, `mutation`, `traits`); they are
//! accepted as aliases so the intake can hand batches over untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unix-seconds time source, injectable for tests
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Wall clock backed by `chrono::Utc::now()`
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// A single sighting reported by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(alias = "index")]
    pub name: String,
    #[serde(alias = "gen")]
    pub magnitude: u64,
    #[serde(alias = "genText", default)]
    pub magnitude_label: String,
    #[serde(alias = "rarity", default)]
    pub quality_tier: String,
    #[serde(alias = "mutation", default)]
    pub mutation_tag: String,
    #[serde(alias = "traits", default)]
    pub trait_tag: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, magnitude: u64) -> Self {
        Self {
            name: name.into(),
            magnitude,
            magnitude_label: String::new(),
            quality_tier: String::new(),
            mutation_tag: String::new(),
            trait_tag: String::new(),
        }
    }

    /// Name with surrounding whitespace removed; all rule lookups use this
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }
}

/// Notification bucket assigned to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    TierA,
    TierB,
    TierC,
    SpecialX,
    HighMagnitude,
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TierA => "TIER_A",
            Category::TierB => "TIER_B",
            Category::TierC => "TIER_C",
            Category::SpecialX => "SPECIAL_X",
            Category::HighMagnitude => "HIGH_MAGNITUDE",
            Category::Uncategorized => "UNCATEGORIZED",
        }
    }

    /// Embed colour used for notifications in this category
    pub fn color(&self) -> u32 {
        match self {
            Category::TierA => 0xF1C40F,
            Category::TierB => 0x9B59B6,
            Category::TierC => 0x3498DB,
            Category::SpecialX => 0xE91E63,
            Category::HighMagnitude => 0x2ECC71,
            Category::Uncategorized => 0x95A5A6,
        }
    }

    pub fn is_notifiable(&self) -> bool {
        !matches!(self, Category::Uncategorized)
    }
}

/// One inbound batch from a reporter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    #[serde(default = "default_reporter_id")]
    pub reporter_id: String,
    #[serde(alias = "current_job_id", default)]
    pub current_job_id: Option<String>,
    #[serde(alias = "pets")]
    pub entities: Vec<Entity>,
}

pub const DEFAULT_REPORTER_ID: &str = "default_player";

fn default_reporter_id() -> String {
    DEFAULT_REPORTER_ID.to_string()
}

/// Acknowledgment returned to the intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub status: String,
    pub accepted: usize,
    pub job_id: Option<String>,
}

/// Entity as kept by the event store, tagged with the server it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntity {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_from_job_id: Option<String>,
}

/// Per-reporter context forwarded to notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchContext {
    pub reporter_id: String,
    pub job_id: Option<String>,
}

//! Static rule table used by the classifier
//!
//! The table is plain data: tier name sets, two special names and two
//! numeric thresholds. It is built once at startup, either from the
//! built-in defaults or from a JSON file (`RULES_PATH`), and never mutated.
//!
//! Rule files may carry near-duplicate names across revisions. They are
//! kept as-is; each file is authoritative for the names it lists.

use super::error::RulesError;
use super::types::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Named entity whose category depends on its magnitude
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub name: String,
    /// Inclusive lower bound for `at_or_above`
    pub min_magnitude: u64,
    pub at_or_above: Category,
    pub below: Category,
}

impl ThresholdRule {
    pub fn category_for(&self, magnitude: u64) -> Category {
        if magnitude >= self.min_magnitude {
            self.at_or_above
        } else {
            self.below
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub threshold_rule: Option<ThresholdRule>,
    #[serde(default)]
    pub tier_a: HashSet<String>,
    #[serde(default)]
    pub tier_b: HashSet<String>,
    #[serde(default)]
    pub tier_c: HashSet<String>,
    #[serde(default)]
    pub special_x: Option<String>,
    /// HighMagnitude fires strictly above this value
    pub high_magnitude_floor: u64,
}

fn names(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            threshold_rule: Some(ThresholdRule {
                name: "Los Hotspotsitos".to_string(),
                min_magnitude: 50_000_000,
                at_or_above: Category::TierA,
                below: Category::TierB,
            }),
            tier_a: names(&[
                "Dragon Cannelloni",
                "Garama and Madundung",
                "Nuclearo Dinossauro",
                "La Grande Combinasion",
                "Los Hotspotsitos",
            ]),
            tier_b: names(&[
                "Los Combinasionas",
                "Chicleteira Bicicleteira",
                "Pot Hotspot",
                "Las Vaquitas Saturnitas",
                "Esok Sekolah",
            ]),
            tier_c: names(&[
                "La Vacca Saturno Saturnita",
                "Chimpanzini Spiderini",
                "Los Tralaleritos",
                "Graipuss Medussi",
                "Las Tralaleritas",
            ]),
            special_x: Some("Strawberry Elephant".to_string()),
            high_magnitude_floor: 20_000_000,
        }
    }
}

impl RuleTable {
    /// Load a rule table from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut table: RuleTable = serde_json::from_str(&raw)?;
        table.normalize();
        table.validate()?;
        Ok(table)
    }

    /// Trim every configured name so lookups against trimmed entity names match
    fn normalize(&mut self) {
        for set in [&mut self.tier_a, &mut self.tier_b, &mut self.tier_c] {
            *set = set.iter().map(|n| n.trim().to_string()).collect();
        }
        if let Some(rule) = self.threshold_rule.as_mut() {
            rule.name = rule.name.trim().to_string();
        }
        if let Some(name) = self.special_x.as_mut() {
            *name = name.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let all_names = self
            .tier_a
            .iter()
            .chain(self.tier_b.iter())
            .chain(self.tier_c.iter())
            .chain(self.special_x.iter())
            .chain(self.threshold_rule.iter().map(|r| &r.name));

        if all_names.into_iter().any(|n| n.is_empty()) {
            return Err(RulesError::Invalid("rule names must not be empty".to_string()));
        }

        if let Some(rule) = &self.threshold_rule {
            let never_notifies = rule.at_or_above == Category::Uncategorized
                && rule.below == Category::Uncategorized;
            if never_notifies {
                return Err(RulesError::Invalid(format!(
                    "threshold rule '{}' never produces a category",
                    rule.name
                )));
            }
        }

        Ok(())
    }

    /// Tier category for an exact (already trimmed) name
    pub fn tier_of(&self, name: &str) -> Option<Category> {
        if self.tier_a.contains(name) {
            Some(Category::TierA)
        } else if self.tier_b.contains(name) {
            Some(Category::TierB)
        } else if self.tier_c.contains(name) {
            Some(Category::TierC)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_table_is_valid() {
        assert!(RuleTable::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let rule = RuleTable::default().threshold_rule.unwrap();

        assert_eq!(rule.category_for(rule.min_magnitude), rule.at_or_above);
        assert_eq!(rule.category_for(rule.min_magnitude - 1), rule.below);
    }

    #[test]
    fn test_load_from_file_trims_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tier_a": [" Alpha ", "Alpha"],
                "tier_b": ["Beta"],
                "special_x": " Omega",
                "high_magnitude_floor": 1000
            }}"#
        )
        .unwrap();

        let table = RuleTable::from_file(file.path()).unwrap();
        assert_eq!(table.tier_a.len(), 1);
        assert_eq!(table.tier_of("Alpha"), Some(Category::TierA));
        assert_eq!(table.tier_of("Beta"), Some(Category::TierB));
        assert!(table.tier_c.is_empty());
        assert_eq!(table.special_x.as_deref(), Some("Omega"));
        assert!(table.threshold_rule.is_none());
    }

    #[test]
    fn test_load_rejects_empty_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tier_c": ["   "], "high_magnitude_floor": 5}}"#).unwrap();

        let result = RuleTable::from_file(file.path());
        assert!(matches!(result, Err(RulesError::Invalid(_))));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(RuleTable::from_file(file.path()), Err(RulesError::Parse(_))));
    }
}

//! Entity classification against the rule table

use super::rules::RuleTable;
use super::types::{Category, Entity};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleTable>,
}

impl Classifier {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::new(RuleTable::default()))
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Assign exactly one category to an entity
    ///
    /// # Precedence
    /// 1. Threshold rule (exact name, magnitude-dependent), even if the name is also in a tier set
    /// 2. TierA, then TierB, then TierC set membership
    /// 3. SpecialX exact name
    /// 4. HighMagnitude when magnitude is strictly above the floor
    /// 5. Uncategorized
    pub fn classify(&self, entity: &Entity) -> Category {
        let name = entity.trimmed_name();

        if let Some(rule) = &self.rules.threshold_rule {
            if rule.name == name {
                return rule.category_for(entity.magnitude);
            }
        }

        if let Some(tier) = self.rules.tier_of(name) {
            return tier;
        }

        if self.rules.special_x.as_deref() == Some(name) {
            return Category::SpecialX;
        }

        if entity.magnitude > self.rules.high_magnitude_floor {
            return Category::HighMagnitude;
        }

        Category::Uncategorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::ThresholdRule;

    fn test_rules() -> RuleTable {
        RuleTable {
            threshold_rule: Some(ThresholdRule {
                name: "Hotspot King".to_string(),
                min_magnitude: 1_000,
                at_or_above: Category::TierA,
                below: Category::TierC,
            }),
            tier_a: ["Alpha", "Hotspot King"].iter().map(|s| s.to_string()).collect(),
            tier_b: ["Beta"].iter().map(|s| s.to_string()).collect(),
            tier_c: ["Gamma"].iter().map(|s| s.to_string()).collect(),
            special_x: Some("Omega".to_string()),
            high_magnitude_floor: 20_000_000,
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(test_rules()))
    }

    #[test]
    fn test_tier_membership_ignores_magnitude() {
        let c = classifier();

        for magnitude in [0, 5, 20_000_000, 20_000_001, u64::MAX] {
            assert_eq!(c.classify(&Entity::new("Alpha", magnitude)), Category::TierA);
            assert_eq!(c.classify(&Entity::new("Beta", magnitude)), Category::TierB);
            assert_eq!(c.classify(&Entity::new("Gamma", magnitude)), Category::TierC);
        }
    }

    #[test]
    fn test_threshold_rule_beats_tier_set() {
        let c = classifier();

        // Name is also in tier_a, but the threshold rule wins
        assert_eq!(c.classify(&Entity::new("Hotspot King", 999)), Category::TierC);
        assert_eq!(c.classify(&Entity::new("Hotspot King", 1_000)), Category::TierA);
        assert_eq!(c.classify(&Entity::new("Hotspot King", 1_001)), Category::TierA);
    }

    #[test]
    fn test_special_x_independent_of_magnitude() {
        let c = classifier();

        assert_eq!(c.classify(&Entity::new("Omega", 0)), Category::SpecialX);
        assert_eq!(c.classify(&Entity::new("Omega", 90_000_000)), Category::SpecialX);
    }

    #[test]
    fn test_high_magnitude_floor_is_exclusive() {
        let c = classifier();

        assert_eq!(c.classify(&Entity::new("Nobody", 20_000_000)), Category::Uncategorized);
        assert_eq!(c.classify(&Entity::new("Nobody", 20_000_001)), Category::HighMagnitude);
    }

    #[test]
    fn test_names_are_trimmed_and_case_sensitive() {
        let c = classifier();

        assert_eq!(c.classify(&Entity::new("  Alpha\t", 1)), Category::TierA);
        assert_eq!(c.classify(&Entity::new("alpha", 1)), Category::Uncategorized);
        assert_eq!(c.classify(&Entity::new("Alph", 1)), Category::Uncategorized);
    }

    #[test]
    fn test_default_rules_precedence() {
        let c = Classifier::with_defaults();
        let rule = c.rules().threshold_rule.clone().unwrap();

        let at_bound = Entity::new(rule.name.clone(), rule.min_magnitude);
        let below_bound = Entity::new(rule.name.clone(), rule.min_magnitude - 1);

        assert_eq!(c.classify(&at_bound), rule.at_or_above);
        assert_eq!(c.classify(&below_bound), rule.below);
    }
}

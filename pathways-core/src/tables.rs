//! Lookup tables injected into the engine
//!
//! Both tables are plain values built once (from defaults or a config file)
//! and passed by reference into scoring and recommendation calls.

use std::collections::BTreeMap;

/// Consequence type recorded for a disciplinary alternative education placement
pub const DAEP_CONSEQUENCE: &str = "daep";

/// Offense category used when the data layer has no specific category
pub const OTHER_CATEGORY: &str = "other";

/// Default offense category -> remediation categories mapping
const DEFAULT_CATEGORY_MAP: &[(&str, &[&str])] = &[
    (
        "fighting",
        &["conflict_resolution", "anger_management", "social_skills"],
    ),
    ("assault", &["anger_management", "counseling", "restorative"]),
    ("bullying", &["social_skills", "restorative", "counseling"]),
    ("harassment", &["restorative", "social_skills", "counseling"]),
    ("disruption", &["behavior_support", "self_regulation"]),
    ("defiance", &["behavior_support", "mentoring", "self_regulation"]),
    ("insubordination", &["behavior_support", "mentoring"]),
    ("substance_use", &["substance_education", "counseling"]),
    ("tobacco_vaping", &["substance_education", "counseling"]),
    ("weapons", &["counseling", "threat_assessment", "mentoring"]),
    ("theft", &["restorative", "mentoring"]),
    ("vandalism", &["restorative", "behavior_support"]),
    ("truancy", &["attendance_support", "mentoring", "family_engagement"]),
    ("tardiness", &["attendance_support", "self_regulation"]),
    ("technology_misuse", &["digital_citizenship", "behavior_support"]),
    ("profanity", &["social_skills", "self_regulation"]),
];

const DEFAULT_FALLBACK: &[&str] = &["behavior_support", "counseling"];

/// Maps offense categories to the remediation categories that address them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    entries: BTreeMap<String, Vec<String>>,
    fallback: Vec<String>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        CategoryMap {
            entries: DEFAULT_CATEGORY_MAP
                .iter()
                .map(|(offense, targets)| {
                    (
                        offense.to_string(),
                        targets.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
            fallback: DEFAULT_FALLBACK.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CategoryMap {
    /// Build a map from the defaults with per-category overrides applied
    pub fn with_overrides(
        overrides: &BTreeMap<String, Vec<String>>,
        fallback: Option<&[String]>,
    ) -> Self {
        let mut map = CategoryMap::default();
        for (offense, targets) in overrides {
            map.entries.insert(offense.clone(), targets.clone());
        }
        if let Some(fallback) = fallback {
            map.fallback = fallback.to_vec();
        }
        map
    }

    /// Remediation categories for an offense category
    ///
    /// `other` and unmapped categories resolve to the fallback set.
    pub fn remediation_categories(&self, offense_category: &str) -> &[String] {
        if offense_category == OTHER_CATEGORY {
            return &self.fallback;
        }
        self.entries
            .get(offense_category)
            .map(Vec::as_slice)
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inputs to the risk scorer that are policy rather than data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// Consequence types that count as an extended placement
    pub extended_placement_consequences: Vec<String>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            extended_placement_consequences: vec![DAEP_CONSEQUENCE.to_string()],
        }
    }
}

impl ScoringPolicy {
    pub fn is_extended_placement(&self, consequence_type: &str) -> bool {
        self.extended_placement_consequences
            .iter()
            .any(|c| c == consequence_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entries_map_to_two_or_three_categories() {
        let map = CategoryMap::default();
        for (offense, targets) in DEFAULT_CATEGORY_MAP {
            let resolved = map.remediation_categories(offense);
            assert_eq!(resolved.len(), targets.len());
            assert!(
                (2..=3).contains(&resolved.len()),
                "{} maps to {} categories",
                offense,
                resolved.len()
            );
        }
    }

    #[test]
    fn test_other_and_unmapped_use_fallback() {
        let map = CategoryMap::default();
        assert_eq!(map.remediation_categories("other"), map.fallback());
        assert_eq!(map.remediation_categories("dress_code"), map.fallback());
        assert_eq!(
            map.remediation_categories("fighting"),
            ["conflict_resolution", "anger_management", "social_skills"]
        );
    }

    #[test]
    fn test_overrides_replace_single_entries() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "fighting".to_string(),
            vec!["restorative".to_string(), "mentoring".to_string()],
        );
        let fallback = vec!["counseling".to_string()];
        let map = CategoryMap::with_overrides(&overrides, Some(&fallback));

        assert_eq!(map.remediation_categories("fighting"), ["restorative", "mentoring"]);
        assert_eq!(
            map.remediation_categories("bullying"),
            ["social_skills", "restorative", "counseling"]
        );
        assert_eq!(map.remediation_categories("other"), ["counseling"]);
    }

    #[test]
    fn test_default_policy_counts_daep_only() {
        let policy = ScoringPolicy::default();
        assert!(policy.is_extended_placement("daep"));
        assert!(!policy.is_extended_placement("iss"));
        assert!(!policy.is_extended_placement("DAEP"));
    }
}

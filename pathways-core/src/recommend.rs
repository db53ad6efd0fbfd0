//! Remediation recommendations
//!
//! Global invariants enforced:
//! - Ineffective and in-progress interventions are never recommended
//! - Ranking is a stable sort on priority; catalog order breaks ties
//! - At most `MAX_RECOMMENDATIONS` entries are returned
//! - The internal priority never leaves this module

use crate::records::{Effectiveness, EvidenceLevel, History, RemediationDefinition, SubjectFlags};
use crate::risk::RiskLevel;
use crate::tables::CategoryMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on the recommendation shortlist
pub const MAX_RECOMMENDATIONS: usize = 5;

const SPED_TAG: &str = "sped";

/// A ranked remediation action with its justification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub tier: u8,
    pub category: String,
    pub reason: String,
    pub description: String,
}

/// Catalog entry paired with its computed priority and justification fragments
struct Candidate<'a> {
    definition: &'a RemediationDefinition,
    priority: u32,
    reasons: Vec<String>,
}

impl Candidate<'_> {
    fn into_recommendation(self) -> Recommendation {
        let reason = if self.reasons.is_empty() {
            format!("Tier {} intervention", self.definition.tier)
        } else {
            self.reasons.join(". ")
        };
        Recommendation {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            tier: self.definition.tier,
            category: self.definition.category.clone(),
            reason,
            description: self.definition.description.clone(),
        }
    }
}

/// Recommend up to five interventions using the default category map
pub fn recommend(
    risk_level: RiskLevel,
    history: History<'_>,
    catalog: &[RemediationDefinition],
    flags: Option<&SubjectFlags>,
) -> Vec<Recommendation> {
    recommend_with_map(
        risk_level,
        history,
        catalog,
        flags,
        &CategoryMap::default(),
        MAX_RECOMMENDATIONS,
    )
}

/// Recommend up to `top_n` interventions (never more than five)
pub fn recommend_with_map(
    risk_level: RiskLevel,
    history: History<'_>,
    catalog: &[RemediationDefinition],
    flags: Option<&SubjectFlags>,
    category_map: &CategoryMap,
    top_n: usize,
) -> Vec<Recommendation> {
    let excluded = excluded_definitions(history);
    let offense_categories = offense_categories(history);
    let has_sped = flags.is_some_and(|f| f.has_disability_services);

    let mut candidates: Vec<Candidate<'_>> = catalog
        .iter()
        .filter(|def| !excluded.contains(def.id.as_str()))
        .map(|def| {
            score_candidate(
                def,
                risk_level,
                &offense_categories,
                category_map,
                has_sped,
            )
        })
        .collect();

    // Vec::sort_by is stable
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    candidates
        .into_iter()
        .take(top_n.min(MAX_RECOMMENDATIONS))
        .map(Candidate::into_recommendation)
        .collect()
}

/// Definitions rated ineffective for the subject or currently assigned/active
fn excluded_definitions<'a>(history: History<'a>) -> HashSet<&'a str> {
    history
        .assignments
        .iter()
        .filter(|a| {
            a.effectiveness == Some(Effectiveness::Ineffective)
                || a.status.is_some_and(|s| s.is_open())
        })
        .map(|a| a.definition_id.as_str())
        .collect()
}

/// Distinct offense categories in first-seen incident order
fn offense_categories<'a>(history: History<'a>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    history
        .incidents
        .iter()
        .filter_map(|i| i.category())
        .filter(|c| seen.insert(*c))
        .collect()
}

fn score_candidate<'a>(
    def: &'a RemediationDefinition,
    risk_level: RiskLevel,
    offense_categories: &[&str],
    category_map: &CategoryMap,
    has_sped: bool,
) -> Candidate<'a> {
    let mut priority = 0;
    let mut reasons = Vec::new();

    let preferred = risk_level.preferred_tier();
    if def.tier == preferred {
        priority += 10;
        reasons.push(format!(
            "Tier {} matches {} risk level",
            def.tier,
            risk_level.as_str()
        ));
    } else if def.tier.abs_diff(preferred) == 1 {
        priority += 5;
    }

    let matching: Vec<String> = offense_categories
        .iter()
        .filter(|offense| {
            category_map
                .remediation_categories(offense)
                .iter()
                .any(|c| *c == def.category)
        })
        .map(|offense| offense.replace('_', " "))
        .collect();
    if !matching.is_empty() {
        priority += 8;
        reasons.push(format!("Addresses {} incidents", matching.join(", ")));
    }

    match def.evidence_level {
        Some(EvidenceLevel::EvidenceBased) => {
            priority += 4;
            reasons.push("Evidence-based intervention".to_string());
        }
        Some(EvidenceLevel::Promising) => priority += 2,
        _ => {}
    }

    if has_sped && def.targets(SPED_TAG) {
        priority += 3;
        reasons.push("Designed for SPED students".to_string());
    }

    Candidate {
        definition: def,
        priority,
        reasons,
    }
}

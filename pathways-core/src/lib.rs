//! Pathways core library - behavioral risk scoring and remediation recommendations

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Scoring and recommending are pure functions of their inputs
// - No global mutable state; lookup tables are injected values
// - The only clock is the caller-supplied reference time
// - Deterministic ordering everywhere (stable sorts, sorted maps)
// - Identical input yields byte-for-byte identical output

pub mod batch;
pub mod config;
pub mod input;
pub mod records;
pub mod recommend;
pub mod report;
pub mod risk;
pub mod tables;

pub use batch::{assess_batch, BatchReport};
pub use config::ResolvedConfig;
pub use recommend::{recommend, Recommendation};
pub use records::{History, IncidentRecord, RemediationAssignment, RemediationDefinition, SubjectFlags};
pub use report::{render_batch_json, render_batch_text, render_json, render_text};
pub use risk::{score, RiskAssessment, RiskLevel, ScoringClock};

use serde::{Deserialize, Serialize};

/// Combined assessment and shortlist for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubjectReport {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subject_id: Option<String>,
    pub assessment: RiskAssessment,
    pub recommendations: Vec<Recommendation>,
}

/// Score a subject, then recommend interventions for the resulting risk level
///
/// The recommender only sees the risk level, never the raw score.
pub fn assess(
    subject_id: Option<&str>,
    history: History<'_>,
    catalog: &[RemediationDefinition],
    flags: Option<&SubjectFlags>,
    clock: &ScoringClock,
    config: &ResolvedConfig,
) -> SubjectReport {
    let assessment = risk::score_with_policy(history, clock, &config.policy);
    let recommendations = recommend::recommend_with_map(
        assessment.risk_level,
        history,
        catalog,
        flags,
        &config.category_map,
        config.top_n,
    );

    tracing::debug!(
        subject = subject_id.unwrap_or("-"),
        score = assessment.score,
        level = assessment.risk_level.as_str(),
        recommendations = recommendations.len(),
        "subject assessed"
    );

    SubjectReport {
        subject_id: subject_id.map(str::to_string),
        assessment,
        recommendations,
    }
}

/// Assess a single-subject snapshot
pub fn assess_snapshot(
    snapshot: &input::SubjectSnapshot,
    clock: &ScoringClock,
    config: &ResolvedConfig,
) -> SubjectReport {
    assess(
        snapshot.subject_id.as_deref(),
        History::new(&snapshot.incidents, &snapshot.assignments),
        &snapshot.catalog,
        snapshot.flags.as_ref(),
        clock,
        config,
    )
}

//! End-to-end tests against exported record snapshots

use chrono::{DateTime, TimeZone, Utc};
use pathways_core::input::{load_batch_snapshot, load_subject_snapshot};
use pathways_core::risk::{
    COVERAGE_GAP_LABEL, EXTENDED_PLACEMENT_LABEL, INTERVENTION_EFFECTIVENESS_LABEL,
    RECENT_FREQUENCY_LABEL, SCHOOL_YEAR_VOLUME_LABEL, SEVERITY_TREND_LABEL,
};
use pathways_core::{
    assess_batch, assess_snapshot, render_batch_json, render_json, ResolvedConfig, RiskLevel,
    ScoringClock,
};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

fn points(report: &pathways_core::SubjectReport, label: &str) -> u32 {
    report.assessment.factor(label).unwrap().points
}

#[test]
fn test_low_risk_subject_scores_thirty() {
    let snapshot = load_subject_snapshot(&fixture_path("subject_low_risk.json")).unwrap();
    let config = ResolvedConfig::defaults().unwrap();
    let report = assess_snapshot(&snapshot, &ScoringClock::new(reference(), None), &config);

    assert_eq!(report.subject_id.as_deref(), Some("stu-1042"));
    assert_eq!(points(&report, EXTENDED_PLACEMENT_LABEL), 15);
    assert_eq!(points(&report, SEVERITY_TREND_LABEL), 0);
    assert_eq!(points(&report, RECENT_FREQUENCY_LABEL), 0);
    assert_eq!(points(&report, SCHOOL_YEAR_VOLUME_LABEL), 3);
    assert_eq!(points(&report, INTERVENTION_EFFECTIVENESS_LABEL), 12);
    assert_eq!(points(&report, COVERAGE_GAP_LABEL), 0);
    assert_eq!(report.assessment.score, 30);
    assert_eq!(report.assessment.risk_level, RiskLevel::Low);
    assert_eq!(
        report
            .assessment
            .factor(SCHOOL_YEAR_VOLUME_LABEL)
            .unwrap()
            .description,
        "2 incidents this school year (since 2024-08-01)"
    );
}

#[test]
fn test_low_risk_subject_gets_tier_one_first() {
    let snapshot = load_subject_snapshot(&fixture_path("subject_low_risk.json")).unwrap();
    let config = ResolvedConfig::defaults().unwrap();
    let report = assess_snapshot(&snapshot, &ScoringClock::new(reference(), None), &config);

    let ids: Vec<&str> = report
        .recommendations
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "rem-contract",
            "rem-mentoring",
            "rem-restorative",
            "rem-fba",
            "rem-social-skills",
        ]
    );

    let top = &report.recommendations[0];
    assert_eq!(top.tier, 1);
    assert_eq!(
        top.reason,
        "Tier 1 matches low risk level. Addresses disruption, defiance incidents. \
         Evidence-based intervention"
    );
    assert_eq!(top.description, "Written goals with daily teacher feedback");
    assert_eq!(report.recommendations[1].reason, "Addresses defiance incidents");
}

#[test]
fn test_sped_flag_reorders_snapshot_recommendations() {
    let mut snapshot = load_subject_snapshot(&fixture_path("subject_low_risk.json")).unwrap();
    snapshot.flags = Some(pathways_core::SubjectFlags {
        has_disability_services: true,
    });
    let config = ResolvedConfig::defaults().unwrap();
    let report = assess_snapshot(&snapshot, &ScoringClock::new(reference(), None), &config);

    // FBA (12 + 3) ties adult mentoring (15) and comes first in the catalog
    let ids: Vec<&str> = report
        .recommendations
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "rem-contract",
            "rem-fba",
            "rem-mentoring",
            "rem-restorative",
            "rem-social-skills",
        ]
    );
    assert!(report.recommendations[0]
        .reason
        .ends_with("Designed for SPED students"));
}

#[test]
fn test_batch_fixture() {
    let snapshot = load_batch_snapshot(&fixture_path("batch.json")).unwrap();
    let config = ResolvedConfig::defaults().unwrap();
    let batch = assess_batch(&snapshot, &ScoringClock::new(reference(), None), &config);

    assert_eq!(batch.skipped_records, 1);
    assert_eq!(batch.subjects.len(), 3);

    let escalating = &batch.subjects[0];
    assert_eq!(escalating.subject_id.as_deref(), Some("stu-2001"));
    assert_eq!(points(escalating, EXTENDED_PLACEMENT_LABEL), 30);
    assert_eq!(points(escalating, SEVERITY_TREND_LABEL), 20);
    assert_eq!(points(escalating, RECENT_FREQUENCY_LABEL), 20);
    assert_eq!(points(escalating, SCHOOL_YEAR_VOLUME_LABEL), 6);
    assert_eq!(points(escalating, INTERVENTION_EFFECTIVENESS_LABEL), 15);
    assert_eq!(points(escalating, COVERAGE_GAP_LABEL), 5);
    assert_eq!(escalating.assessment.score, 96);
    assert_eq!(escalating.assessment.risk_level, RiskLevel::High);

    let ids: Vec<&str> = escalating
        .recommendations
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    // rem-anger was ineffective and rem-fba is still active
    assert_eq!(ids, vec!["rem-wrap", "rem-conflict", "rem-cico", "rem-attendance"]);
    assert_eq!(
        escalating.recommendations[0].reason,
        "Tier 3 matches high risk level. Addresses assault incidents. \
         Evidence-based intervention. Designed for SPED students"
    );
    assert_eq!(escalating.recommendations[3].reason, "Tier 1 intervention");

    let improving = &batch.subjects[1];
    assert_eq!(improving.assessment.score, 3);
    assert_eq!(improving.assessment.risk_level, RiskLevel::Low);
    let ids: Vec<&str> = improving
        .recommendations
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["rem-attendance", "rem-cico", "rem-anger", "rem-fba", "rem-wrap"]
    );

    let untouched = &batch.subjects[2];
    assert_eq!(untouched.assessment.score, 12);
    let ids: Vec<&str> = untouched
        .recommendations
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["rem-attendance", "rem-anger", "rem-cico", "rem-fba", "rem-wrap"]
    );
}

#[test]
fn test_rendered_output_is_byte_identical() {
    let config = ResolvedConfig::defaults().unwrap();
    let clock = ScoringClock::new(reference(), None);

    let snapshot = load_subject_snapshot(&fixture_path("subject_low_risk.json")).unwrap();
    let first = render_json(&assess_snapshot(&snapshot, &clock, &config));
    let second = render_json(&assess_snapshot(&snapshot, &clock, &config));
    assert_eq!(first, second, "Output should be byte-for-byte identical");

    let batch = load_batch_snapshot(&fixture_path("batch.json")).unwrap();
    let first = render_batch_json(&assess_batch(&batch, &clock, &config));
    let second = render_batch_json(&assess_batch(&batch, &clock, &config));
    assert_eq!(first, second, "Batch output should be byte-for-byte identical");
}

//! Batch scoring across many subjects
//!
//! Records are partitioned by subject id into a sorted map, then each subject
//! is assessed independently on the rayon pool. Output order is the sorted
//! subject-id order, independent of thread scheduling.

use crate::config::ResolvedConfig;
use crate::input::BatchSnapshot;
use crate::records::{History, IncidentRecord, RemediationAssignment, SubjectFlags};
use crate::risk::ScoringClock;
use crate::{assess, SubjectReport};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records belonging to one subject
#[derive(Debug, Clone, Default)]
pub struct SubjectRecords {
    pub flags: Option<SubjectFlags>,
    pub incidents: Vec<IncidentRecord>,
    pub assignments: Vec<RemediationAssignment>,
}

/// Result of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchReport {
    pub subjects: Vec<SubjectReport>,
    /// Records dropped because they carried no subject id
    pub skipped_records: usize,
}

/// Partition batch records by subject id
///
/// Returns the grouped records and the number of records without a subject id.
pub fn group_by_subject(snapshot: &BatchSnapshot) -> (BTreeMap<String, SubjectRecords>, usize) {
    let mut groups: BTreeMap<String, SubjectRecords> = BTreeMap::new();
    let mut skipped = 0usize;

    for (id, flags) in &snapshot.subjects {
        groups.entry(id.clone()).or_default().flags = Some(*flags);
    }

    for incident in &snapshot.incidents {
        match incident.subject_id {
            Some(ref id) => groups
                .entry(id.clone())
                .or_default()
                .incidents
                .push(incident.clone()),
            None => {
                tracing::warn!(incident = %incident.id, "incident has no subject_id, skipping");
                skipped += 1;
            }
        }
    }

    for assignment in &snapshot.assignments {
        match assignment.subject_id {
            Some(ref id) => groups
                .entry(id.clone())
                .or_default()
                .assignments
                .push(assignment.clone()),
            None => {
                tracing::warn!(assignment = %assignment.id, "assignment has no subject_id, skipping");
                skipped += 1;
            }
        }
    }

    (groups, skipped)
}

/// Assess every subject in a batch snapshot
pub fn assess_batch(
    snapshot: &BatchSnapshot,
    clock: &ScoringClock,
    config: &ResolvedConfig,
) -> BatchReport {
    assess_batch_with_progress(snapshot, clock, config, || {})
}

/// Assess every subject, invoking `on_subject` once per completed subject
pub fn assess_batch_with_progress<F>(
    snapshot: &BatchSnapshot,
    clock: &ScoringClock,
    config: &ResolvedConfig,
    on_subject: F,
) -> BatchReport
where
    F: Fn() + Sync,
{
    let (groups, skipped_records) = group_by_subject(snapshot);
    let groups: Vec<(String, SubjectRecords)> = groups.into_iter().collect();

    let subjects: Vec<SubjectReport> = groups
        .par_iter()
        .map(|(id, records)| {
            let report = assess(
                Some(id.as_str()),
                History::new(&records.incidents, &records.assignments),
                &snapshot.catalog,
                records.flags.as_ref(),
                clock,
                config,
            );
            on_subject();
            report
        })
        .collect();

    tracing::debug!(
        subjects = subjects.len(),
        skipped_records,
        "batch assessment complete"
    );

    BatchReport {
        subjects,
        skipped_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Offense;
    use crate::risk::RiskLevel;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn incident(id: &str, subject: Option<&str>, date: &str) -> IncidentRecord {
        IncidentRecord {
            id: id.to_string(),
            subject_id: subject.map(str::to_string),
            incident_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            offense: Some(Offense::default()),
            consequence_type: Some("daep".to_string()),
            status: None,
        }
    }

    fn clock() -> ScoringClock {
        ScoringClock::new(Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(), None)
    }

    fn snapshot() -> BatchSnapshot {
        let mut subjects = BTreeMap::new();
        subjects.insert(
            "s-quiet".to_string(),
            SubjectFlags {
                has_disability_services: true,
            },
        );
        BatchSnapshot {
            subjects,
            incidents: vec![
                incident("i1", Some("s-b"), "2024-10-20"),
                incident("i2", Some("s-a"), "2024-10-21"),
                incident("i3", Some("s-b"), "2024-10-22"),
                incident("i4", None, "2024-10-23"),
            ],
            assignments: Vec::new(),
            catalog: Vec::new(),
        }
    }

    #[test]
    fn test_group_by_subject_sorts_and_counts_skipped() {
        let snapshot = snapshot();
        let (groups, skipped) = group_by_subject(&snapshot);
        let ids: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["s-a", "s-b", "s-quiet"]);
        assert_eq!(skipped, 1);
        assert_eq!(groups["s-b"].incidents.len(), 2);
        assert!(groups["s-quiet"].incidents.is_empty());
        assert!(groups["s-quiet"].flags.unwrap().has_disability_services);
    }

    #[test]
    fn test_assess_batch_is_ordered_and_independent() {
        let snapshot = snapshot();
        let config = ResolvedConfig::defaults().unwrap();
        let report = assess_batch(&snapshot, &clock(), &config);

        let ids: Vec<&str> = report
            .subjects
            .iter()
            .map(|s| s.subject_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["s-a", "s-b", "s-quiet"]);
        assert_eq!(report.skipped_records, 1);

        // s-b: two placements (30) + two in 30 days (15) + two this year (3) + nothing tried (12)
        assert_eq!(report.subjects[1].assessment.score, 60);
        assert_eq!(report.subjects[1].assessment.risk_level, RiskLevel::Medium);
        // s-quiet has no records at all
        assert_eq!(report.subjects[2].assessment.score, 12);
    }

    #[test]
    fn test_progress_called_once_per_subject() {
        let snapshot = snapshot();
        let config = ResolvedConfig::defaults().unwrap();
        let done = AtomicUsize::new(0);
        assess_batch_with_progress(&snapshot, &clock(), &config, || {
            done.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }
}

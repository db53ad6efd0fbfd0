//! Record snapshots exported by the data layer
//!
//! A snapshot is a JSON document holding every record the engine needs for
//! one subject, or for many subjects at once in batch mode.

use crate::records::{IncidentRecord, RemediationAssignment, RemediationDefinition, SubjectFlags};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Records for a single subject
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectSnapshot {
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub flags: Option<SubjectFlags>,
    #[serde(default)]
    pub incidents: Vec<IncidentRecord>,
    #[serde(default)]
    pub assignments: Vec<RemediationAssignment>,
    #[serde(default)]
    pub catalog: Vec<RemediationDefinition>,
}

/// Records for many subjects, grouped by each record's `subject_id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSnapshot {
    /// Subject flags keyed by subject id; listed subjects are assessed even without records
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectFlags>,
    #[serde(default)]
    pub incidents: Vec<IncidentRecord>,
    #[serde(default)]
    pub assignments: Vec<RemediationAssignment>,
    #[serde(default)]
    pub catalog: Vec<RemediationDefinition>,
}

/// Load a single-subject snapshot from a JSON file
pub fn load_subject_snapshot(path: &Path) -> Result<SubjectSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot: {}", path.display()))
}

/// Load a batch snapshot from a JSON file
pub fn load_batch_snapshot(path: &Path) -> Result<BatchSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse batch snapshot: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_subject_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subject.json");
        fs::write(
            &path,
            r#"{
                "subject_id": "s-100",
                "flags": {"has_disability_services": true},
                "incidents": [{"id": "i1", "incident_date": "2024-10-01"}],
                "catalog": [{"id": "d1", "name": "CICO", "category": "mentoring", "tier": 2}]
            }"#,
        )
        .unwrap();

        let snapshot = load_subject_snapshot(&path).unwrap();
        assert_eq!(snapshot.subject_id.as_deref(), Some("s-100"));
        assert!(snapshot.flags.unwrap().has_disability_services);
        assert_eq!(snapshot.incidents.len(), 1);
        assert!(snapshot.assignments.is_empty());
        assert_eq!(snapshot.catalog.len(), 1);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_subject_snapshot(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));
    }

    #[test]
    fn test_malformed_severity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"incidents": [{"id": "i1", "offense": {"severity": "catastrophic"}}]}"#,
        )
        .unwrap();
        assert!(load_subject_snapshot(&path).is_err());
    }

    #[test]
    fn test_load_batch_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(
            &path,
            r#"{
                "subjects": {"s-1": {"has_disability_services": false}},
                "incidents": [{"id": "i1", "subject_id": "s-1"}]
            }"#,
        )
        .unwrap();
        let batch = load_batch_snapshot(&path).unwrap();
        assert_eq!(batch.subjects.len(), 1);
        assert_eq!(batch.incidents[0].subject_id.as_deref(), Some("s-1"));
    }
}

//! Input records consumed by the engine
//!
//! Records arrive already fetched and scoped to one subject. Every nested
//! field the data layer may leave empty is an `Option`; absent values are
//! neutral and simply drop the record out of the computations that need them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Offense severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Serious,
    Severe,
}

impl Severity {
    /// Weight used by the severity trend factor
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Minor => 1,
            Severity::Moderate => 2,
            Severity::Serious => 3,
            Severity::Severe => 4,
        }
    }

    /// Serious and severe offenses are expected to have an intervention attached
    pub fn is_high(&self) -> bool {
        matches!(self, Severity::Serious | Severity::Severe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Serious => "serious",
            Severity::Severe => "severe",
        }
    }
}

/// Offense descriptor joined onto an incident
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offense {
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Offense category, e.g. `fighting` or `substance_use` (open set)
    #[serde(default)]
    pub category: Option<String>,
}

/// A behavioral incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: String,
    /// Only used to group records in batch mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub incident_date: Option<NaiveDate>,
    #[serde(default)]
    pub offense: Option<Offense>,
    #[serde(default)]
    pub consequence_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl IncidentRecord {
    pub fn severity(&self) -> Option<Severity> {
        self.offense.as_ref().and_then(|o| o.severity)
    }

    pub fn category(&self) -> Option<&str> {
        self.offense.as_ref().and_then(|o| o.category.as_deref())
    }
}

/// Lifecycle status of a remediation assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Active,
    Completed,
    Discontinued,
    #[serde(other)]
    Other,
}

impl AssignmentStatus {
    /// Assigned and active interventions are still in progress
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::Active)
    }
}

/// Outcome rating recorded when an assignment is reviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    NotRated,
    Effective,
    PartiallyEffective,
    Ineffective,
    #[serde(other)]
    Other,
}

impl Effectiveness {
    pub fn is_rated(&self) -> bool {
        !matches!(self, Effectiveness::NotRated)
    }
}

/// A remediation action assigned to the subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAssignment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub definition_id: String,
    /// Incident this assignment addresses, if linked
    #[serde(default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default)]
    pub effectiveness: Option<Effectiveness>,
}

/// Research support behind a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLevel {
    EvidenceBased,
    Promising,
    #[serde(other)]
    Other,
}

/// Catalog entry describing an available remediation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Intensity level, 1 through 3
    pub tier: u8,
    #[serde(default)]
    pub target_population: Vec<String>,
    #[serde(default)]
    pub evidence_level: Option<EvidenceLevel>,
    #[serde(default)]
    pub description: String,
}

impl RemediationDefinition {
    pub fn targets(&self, tag: &str) -> bool {
        self.target_population.iter().any(|t| t == tag)
    }
}

/// Minimal subject attributes the recommender needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFlags {
    #[serde(default)]
    pub has_disability_services: bool,
}

/// Incident and assignment history for one subject
#[derive(Debug, Clone, Copy)]
pub struct History<'a> {
    pub incidents: &'a [IncidentRecord],
    pub assignments: &'a [RemediationAssignment],
}

impl<'a> History<'a> {
    pub fn new(incidents: &'a [IncidentRecord], assignments: &'a [RemediationAssignment]) -> Self {
        History {
            incidents,
            assignments,
        }
    }

    pub fn empty() -> History<'static> {
        History {
            incidents: &[],
            assignments: &[],
        }
    }
}

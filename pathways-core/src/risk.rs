//! Behavioral risk score calculation
//!
//! Global invariants enforced:
//! - Deterministic: the only clock is the supplied reference time
//! - Six factors, always present, always in the same order
//! - Each factor is capped at its own maximum
//! - The score is the exact sum of factor points (0..=100)

use crate::records::{Effectiveness, History, IncidentRecord};
use crate::tables::ScoringPolicy;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EXTENDED_PLACEMENT_LABEL: &str = "Extended Placement History";
pub const SEVERITY_TREND_LABEL: &str = "Severity Trend";
pub const RECENT_FREQUENCY_LABEL: &str = "Recent Frequency";
pub const SCHOOL_YEAR_VOLUME_LABEL: &str = "School Year Volume";
pub const INTERVENTION_EFFECTIVENESS_LABEL: &str = "Intervention Effectiveness";
pub const COVERAGE_GAP_LABEL: &str = "Unaddressed Serious Incidents";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Trend margin on mean severity weight before a change counts
const TREND_MARGIN: f64 = 0.25;

/// Qualitative risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Level for a score: 0-33 low, 34-66 medium, 67+ high
    pub fn from_score(score: u32) -> RiskLevel {
        if score <= 33 {
            RiskLevel::Low
        } else if score <= 66 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Intervention tier matched to this level
    pub fn preferred_tier(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

/// One itemized contribution to the score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Factor {
    pub label: String,
    pub points: u32,
    pub max_points: u32,
    pub description: String,
}

impl Factor {
    fn new(label: &str, points: u32, max_points: u32, description: String) -> Self {
        Factor {
            label: label.to_string(),
            points: points.min(max_points),
            max_points,
            description,
        }
    }
}

/// Score, level and factor breakdown for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RiskAssessment {
    pub score: u32,
    pub risk_level: RiskLevel,
    pub factors: Vec<Factor>,
}

impl RiskAssessment {
    fn from_factors(factors: Vec<Factor>) -> Self {
        let score = factors.iter().map(|f| f.points).sum();
        RiskAssessment {
            score,
            risk_level: RiskLevel::from_score(score),
            factors,
        }
    }

    /// Look up a factor by label
    pub fn factor(&self, label: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.label == label)
    }
}

/// Time anchors for a scoring run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringClock {
    pub reference_time: DateTime<Utc>,
    pub school_year_start: NaiveDate,
}

impl ScoringClock {
    /// Build a clock, deriving the school-year start from the reference time when absent
    pub fn new(reference_time: DateTime<Utc>, school_year_start: Option<NaiveDate>) -> Self {
        ScoringClock {
            reference_time,
            school_year_start: school_year_start
                .unwrap_or_else(|| default_school_year_start(reference_time.date_naive())),
        }
    }

    /// Clock anchored at the current instant
    pub fn now() -> Self {
        ScoringClock::new(Utc::now(), None)
    }

    /// Whole 24-hour units elapsed between the incident date and the reference time
    fn elapsed_days(&self, date: NaiveDate) -> i64 {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        (self.reference_time - start)
            .num_milliseconds()
            .div_euclid(MS_PER_DAY)
    }
}

/// August 1 of the academic year containing `date`
pub fn default_school_year_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() >= 8 {
        date.year()
    } else {
        date.year() - 1
    };
    NaiveDate::from_ymd_opt(year, 8, 1).unwrap_or(date)
}

/// Score a history with the default policy
///
/// `reference_time` defaults to now; `school_year_start` defaults to August 1
/// of the academic year containing the reference time.
pub fn score(
    history: History<'_>,
    reference_time: Option<DateTime<Utc>>,
    school_year_start: Option<NaiveDate>,
) -> RiskAssessment {
    let clock = ScoringClock::new(reference_time.unwrap_or_else(Utc::now), school_year_start);
    score_with_policy(history, &clock, &ScoringPolicy::default())
}

/// Score a history against an explicit clock and policy
pub fn score_with_policy(
    history: History<'_>,
    clock: &ScoringClock,
    policy: &ScoringPolicy,
) -> RiskAssessment {
    let factors = vec![
        extended_placement_factor(history.incidents, policy),
        severity_trend_factor(history.incidents),
        recent_frequency_factor(history.incidents, clock),
        school_year_volume_factor(history.incidents, clock),
        intervention_effectiveness_factor(history),
        coverage_gap_factor(history),
    ];
    RiskAssessment::from_factors(factors)
}

fn extended_placement_factor(incidents: &[IncidentRecord], policy: &ScoringPolicy) -> Factor {
    let count = incidents
        .iter()
        .filter(|i| {
            i.consequence_type
                .as_deref()
                .is_some_and(|c| policy.is_extended_placement(c))
        })
        .count();

    let points = match count {
        0 => 0,
        1 => 15,
        _ => 30,
    };
    let description = if count == 0 {
        "No extended placements".to_string()
    } else {
        plural(count, "extended placement", "extended placements")
    };
    Factor::new(EXTENDED_PLACEMENT_LABEL, points, 30, description)
}

fn severity_trend_factor(incidents: &[IncidentRecord]) -> Factor {
    // sort_by_key is stable: same-day incidents keep their input order
    let mut dated: Vec<(NaiveDate, u32)> = incidents
        .iter()
        .filter_map(|i| Some((i.incident_date?, i.severity()?.weight())))
        .collect();
    dated.sort_by_key(|(date, _)| *date);

    if dated.len() < 2 {
        return Factor::new(
            SEVERITY_TREND_LABEL,
            0,
            20,
            "Not enough data to determine a trend".to_string(),
        );
    }

    let mid = dated.len() / 2;
    let older_avg = mean_weight(&dated[..mid]);
    let recent_avg = mean_weight(&dated[mid..]);

    let (points, direction) = if recent_avg > older_avg + TREND_MARGIN {
        (20, "Escalating")
    } else if recent_avg >= older_avg - TREND_MARGIN {
        (8, "Stable")
    } else {
        (0, "De-escalating")
    };
    let description = format!(
        "{}: recent severity {:.1} vs earlier {:.1}",
        direction, recent_avg, older_avg
    );
    Factor::new(SEVERITY_TREND_LABEL, points, 20, description)
}

fn mean_weight(entries: &[(NaiveDate, u32)]) -> f64 {
    let total: u32 = entries.iter().map(|(_, w)| w).sum();
    total as f64 / entries.len() as f64
}

fn recent_frequency_factor(incidents: &[IncidentRecord], clock: &ScoringClock) -> Factor {
    let elapsed: Vec<i64> = incidents
        .iter()
        .filter_map(|i| i.incident_date)
        .map(|d| clock.elapsed_days(d))
        .collect();
    let within = |days: i64| elapsed.iter().filter(|&&e| e <= days).count();
    let (in_30, in_60, in_90) = (within(30), within(60), within(90));

    let (points, description) = if in_30 >= 3 {
        (20, format!("{} in the last 30 days", plural(in_30, "incident", "incidents")))
    } else if in_30 >= 2 {
        (15, format!("{} in the last 30 days", plural(in_30, "incident", "incidents")))
    } else if in_60 >= 3 {
        (12, format!("{} in the last 60 days", plural(in_60, "incident", "incidents")))
    } else if in_90 >= 1 {
        (5, format!("{} in the last 90 days", plural(in_90, "incident", "incidents")))
    } else {
        (0, "No incidents in the last 90 days".to_string())
    };
    Factor::new(RECENT_FREQUENCY_LABEL, points, 20, description)
}

fn school_year_volume_factor(incidents: &[IncidentRecord], clock: &ScoringClock) -> Factor {
    let count = incidents
        .iter()
        .filter_map(|i| i.incident_date)
        .filter(|d| *d >= clock.school_year_start)
        .count();

    let points = match count {
        n if n >= 6 => 10,
        n if n >= 4 => 6,
        n if n >= 2 => 3,
        _ => 0,
    };
    let description = format!(
        "{} this school year (since {})",
        plural(count, "incident", "incidents"),
        clock.school_year_start
    );
    Factor::new(SCHOOL_YEAR_VOLUME_LABEL, points, 10, description)
}

fn intervention_effectiveness_factor(history: History<'_>) -> Factor {
    let rated: Vec<Effectiveness> = history
        .assignments
        .iter()
        .filter_map(|a| a.effectiveness)
        .filter(Effectiveness::is_rated)
        .collect();

    if rated.is_empty() {
        let (points, description) = if history.assignments.is_empty() {
            (12, "No interventions tried".to_string())
        } else {
            (
                3,
                format!(
                    "{} assigned, none rated yet",
                    plural(history.assignments.len(), "intervention", "interventions")
                ),
            )
        };
        return Factor::new(INTERVENTION_EFFECTIVENESS_LABEL, points, 15, description);
    }

    let ineffective = rated
        .iter()
        .filter(|e| **e == Effectiveness::Ineffective)
        .count();
    let pct = ineffective as f64 / rated.len() as f64;
    let points = if pct >= 0.5 {
        15
    } else if pct >= 0.25 {
        10
    } else {
        3
    };
    let description = format!(
        "{:.0}% of rated interventions ineffective ({} of {})",
        pct * 100.0,
        ineffective,
        rated.len()
    );
    Factor::new(INTERVENTION_EFFECTIVENESS_LABEL, points, 15, description)
}

fn coverage_gap_factor(history: History<'_>) -> Factor {
    let covered: HashSet<&str> = history
        .assignments
        .iter()
        .filter_map(|a| a.incident_id.as_deref())
        .collect();
    let high_severity = history
        .incidents
        .iter()
        .filter(|i| i.severity().is_some_and(|s| s.is_high()));
    let (total, uncovered) = high_severity.fold((0usize, 0usize), |(total, uncovered), i| {
        let missing = !covered.contains(i.id.as_str());
        (total + 1, uncovered + usize::from(missing))
    });

    let (points, description) = if uncovered > 0 {
        (
            5,
            format!(
                "{} without an intervention",
                plural(uncovered, "serious incident", "serious incidents")
            ),
        )
    } else if total > 0 {
        (0, "All serious incidents have an intervention".to_string())
    } else {
        (0, "No serious incidents".to_string())
    };
    Factor::new(COVERAGE_GAP_LABEL, points, 5, description)
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

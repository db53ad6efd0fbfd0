//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Factors render in assessment order, recommendations in rank order
//! - Byte-for-byte identical output across runs

use crate::batch::BatchReport;
use crate::SubjectReport;

/// Render one subject report as text
pub fn render_text(report: &SubjectReport) -> String {
    let mut output = String::new();
    let assessment = &report.assessment;

    if let Some(ref id) = report.subject_id {
        output.push_str(&format!("Subject: {}\n", id));
    }
    output.push_str(&format!(
        "Risk score: {}/100 ({})\n\n",
        assessment.score,
        assessment.risk_level.as_str()
    ));

    output.push_str(&format!(
        "{:<32} {:<8} {}\n",
        "FACTOR", "POINTS", "DETAIL"
    ));
    for factor in &assessment.factors {
        let points = format!("{}/{}", factor.points, factor.max_points);
        output.push_str(&format!(
            "{:<32} {:<8} {}\n",
            truncate_or_pad(&factor.label, 32),
            points,
            factor.description
        ));
    }

    output.push('\n');
    if report.recommendations.is_empty() {
        output.push_str("No recommended interventions\n");
        return output;
    }

    output.push_str("Recommended interventions:\n");
    for (rank, rec) in report.recommendations.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} [tier {}, {}]\n",
            rank + 1,
            rec.name,
            rec.tier,
            rec.category.replace('_', " ")
        ));
        output.push_str(&format!("   {}\n", rec.reason));
    }

    output
}

/// Render one subject report as JSON
pub fn render_json(report: &SubjectReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Render a batch as a one-line-per-subject summary table
pub fn render_batch_text(batch: &BatchReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<20} {:<6} {:<8} {}\n",
        "SUBJECT", "SCORE", "LEVEL", "TOP RECOMMENDATION"
    ));
    for subject in &batch.subjects {
        let id = subject.subject_id.as_deref().unwrap_or("-");
        let top = subject
            .recommendations
            .first()
            .map(|r| r.name.as_str())
            .unwrap_or("-");
        output.push_str(&format!(
            "{:<20} {:<6} {:<8} {}\n",
            truncate_or_pad(id, 20),
            subject.assessment.score,
            subject.assessment.risk_level.as_str(),
            top
        ));
    }

    if batch.skipped_records > 0 {
        output.push_str(&format!(
            "\nSkipped {} record(s) without a subject_id\n",
            batch.skipped_records
        ));
    }

    output
}

/// Render a batch as JSON
pub fn render_batch_json(batch: &BatchReport) -> String {
    serde_json::to_string_pretty(batch).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

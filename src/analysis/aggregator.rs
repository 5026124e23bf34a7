//! Recommendation aggregation and statistics.
//!
//! Utilities for summarising processor verdicts across all appeals in a run.

use crate::analysis::appeal::AppealAssessment;
use crate::models::Recommendation;
use std::collections::HashMap;

/// Share of assessments that grant any reduction.
pub fn approval_rate(assessments: &[AppealAssessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    let granted = assessments
        .iter()
        .filter(|a| a.recommendation.grants_reduction())
        .count();
    granted as f64 / assessments.len() as f64
}

/// Mean requested reduction in currency units.
pub fn average_reduction(assessments: &[AppealAssessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    let total: i64 = assessments.iter().map(|a| a.requested_reduction).sum();
    total as f64 / assessments.len() as f64
}

/// Group assessments by recommendation.
pub fn group_by_recommendation(
    assessments: &[AppealAssessment],
) -> HashMap<Recommendation, Vec<AppealAssessment>> {
    let mut grouped: HashMap<Recommendation, Vec<AppealAssessment>> = HashMap::new();

    for assessment in assessments {
        grouped
            .entry(assessment.recommendation)
            .or_default()
            .push(assessment.clone());
    }

    // Keep each group in appeal order
    for group in grouped.values_mut() {
        group.sort_by(|a, b| a.appeal_id.cmp(&b.appeal_id));
    }

    grouped
}

/// Count per recommendation, always listing all three in a fixed order.
pub fn recommendation_counts(assessments: &[AppealAssessment]) -> Vec<(Recommendation, usize)> {
    let grouped = group_by_recommendation(assessments);
    [
        Recommendation::ApproveReduction,
        Recommendation::PartialReduction,
        Recommendation::DenyAppeal,
    ]
    .into_iter()
    .map(|r| (r, grouped.get(&r).map_or(0, Vec::len)))
    .collect()
}

/// The `n` assessments asking for the largest reduction.
pub fn top_reductions(assessments: &[AppealAssessment], n: usize) -> Vec<AppealAssessment> {
    let mut sorted = assessments.to_vec();
    sorted.sort_by_key(|a| std::cmp::Reverse(a.requested_reduction));
    sorted.truncate(n);
    sorted
}

/// Generate a text summary of recommendation counts.
pub fn generate_summary_text(assessments: &[AppealAssessment]) -> String {
    let mut lines = vec![format!("Total Appeals Reviewed: {}", assessments.len())];

    for (recommendation, count) in recommendation_counts(assessments) {
        lines.push(format!(
            "- {} {}: {}",
            recommendation.emoji(),
            recommendation,
            count
        ));
    }

    lines.push(format!(
        "Approval Rate: {:.1}%",
        approval_rate(assessments) * 100.0
    ));

    lines.join("\n")
}

//! Markdown report generation.
//!
//! This module renders a finished workflow, plus the complete report when
//! one was requested, as Markdown or JSON.

use crate::analysis::aggregator::{recommendation_counts, top_reductions};
use crate::analysis::{AppealAssessment, PatternFlag};
use crate::report::payload::{CompleteReport, PartialReport};
use crate::swarm::WorkflowResult;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

/// Everything the sink writes for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workflow: WorkflowResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_report: Option<CompleteReport>,
}

impl RunReport {
    pub fn new(workflow: WorkflowResult, complete_report: Option<CompleteReport>) -> Self {
        Self {
            workflow,
            complete_report,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();
    let partial = report.workflow.report();

    // Title
    let title = partial
        .as_ref()
        .map(|p| p.title.clone())
        .unwrap_or_else(|| "Appeal Swarm Report".to_string());
    output.push_str(&format!("# {}\n\n", title));

    output.push_str(&generate_metadata_section(&report.workflow));
    output.push_str(&generate_table_of_contents(report, partial.is_some()));

    if let Some(ref partial) = partial {
        output.push_str(&generate_summary_section(partial));
        output.push_str(&generate_patterns_section(&report.workflow));
        output.push_str(&generate_sample_section(&partial.sample_results));
    }

    if let Some(ref complete) = report.complete_report {
        output.push_str(&generate_complete_section(complete));
    }

    output.push_str(&generate_errors_section(&report.workflow.errors));

    if let Some(ref partial) = partial {
        output.push_str(&format!("## Next Steps\n\n{}\n\n", partial.next_steps));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(workflow: &WorkflowResult) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Workflow:** `{}`\n", workflow.id));
    section.push_str(&format!(
        "- **Status:** {}\n",
        if workflow.success { "✅ Completed" } else { "❌ Aborted" }
    ));
    if let Some(stage) = workflow.results.get("aborted_stage").and_then(Value::as_str) {
        section.push_str(&format!("- **Aborted In:** {}\n", stage));
    }
    section.push_str(&format!(
        "- **Tasks:** {} total, {} completed, {} failed\n",
        workflow.total_tasks, workflow.completed_tasks, workflow.failed_tasks
    ));
    section.push_str(&format!(
        "- **Execution Time:** {:.2}s\n",
        workflow.execution_time_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &RunReport, has_partial: bool) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");

    if has_partial {
        toc.push_str("- [Summary](#summary)\n");
        toc.push_str("- [Patterns](#patterns)\n");
        toc.push_str("- [Sample Results](#sample-results)\n");
    }
    if report.complete_report.is_some() {
        toc.push_str("- [Detailed Recommendations](#detailed-recommendations)\n");
        toc.push_str("- [Methodology](#methodology)\n");
    }
    if !report.workflow.errors.is_empty() {
        toc.push_str("- [Errors](#errors)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the summary section.
fn generate_summary_section(partial: &PartialReport) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Processed | Total Appeals | Approval Rate | Avg. Reduction | Est. Savings |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {:.1}% | ${:.0} | ${:.0} |\n\n",
        partial.summary.processed_appeals,
        partial.summary.total_appeals,
        partial.summary.approval_rate * 100.0,
        partial.summary.average_reduction,
        partial.statistics.estimated_savings
    ));
    section.push_str(&format!(
        "*Completion: {:.1}%*\n\n",
        partial.statistics.completion_percentage
    ));

    // Validation
    section.push_str("### Validation Consensus\n\n");
    section.push_str(&format!(
        "- **Confidence:** {:.3}\n- **Validated:** {}\n\n",
        partial.validation.confidence,
        if partial.validation.validated { "yes" } else { "no" }
    ));
    if partial.validation.low_confidence_warning {
        section.push_str("> ⚠️ **Low confidence:** consensus fell below the validation threshold.\n\n");
    }

    section
}

/// Generate the patterns section from the analyzer output.
fn generate_patterns_section(workflow: &WorkflowResult) -> String {
    let mut section = String::new();

    section.push_str("## Patterns\n\n");

    let patterns: Vec<PatternFlag> = workflow
        .results
        .get("patterns")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    if patterns.is_empty() {
        section.push_str("No county-wide patterns were detected.\n\n");
    } else {
        for pattern in patterns {
            let line = match pattern {
                PatternFlag::OverassessmentTrend => {
                    "Most appeals cite overassessment as their reason"
                }
                PatternFlag::HighAssessmentRatio => {
                    "Assessed values run above 90% of market value on average"
                }
            };
            section.push_str(&format!("- 📈 {}\n", line));
        }
        section.push('\n');
    }

    if let Some(stats) = workflow.results.get("statistics") {
        let number = |key: &str| stats.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        section.push_str("| Properties | Appeals | Appeal Rate | Avg. Assessed | Avg. Market |\n");
        section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
        section.push_str(&format!(
            "| {} | {} | {:.1}% | ${:.0} | ${:.0} |\n\n",
            number("total_properties"),
            number("total_appeals"),
            number("appeal_rate") * 100.0,
            number("avg_assessed_value"),
            number("avg_market_value")
        ));
    }

    section
}

/// Generate the sample results section.
fn generate_sample_section(samples: &[AppealAssessment]) -> String {
    let mut section = String::new();

    section.push_str("## Sample Results\n\n");

    if samples.is_empty() {
        section.push_str("No appeals were processed.\n\n");
        return section;
    }

    section.push_str(&generate_assessment_table(samples));
    section
}

fn generate_assessment_table(assessments: &[AppealAssessment]) -> String {
    let mut table = String::new();

    table.push_str("| Appeal | Property | Recommendation | Confidence | Ratio | Reduction |\n");
    table.push_str("|:---|:---|:---|:---:|:---:|---:|\n");
    for a in assessments {
        table.push_str(&format!(
            "| {} | {} | {} {} | {:.2} | {:.3} | ${} |\n",
            a.appeal_id,
            a.property_id,
            a.recommendation.emoji(),
            a.recommendation,
            a.confidence_score,
            a.assessment_ratio,
            a.requested_reduction
        ));
    }
    table.push('\n');

    table
}

/// Generate the detailed recommendations and methodology sections.
fn generate_complete_section(complete: &CompleteReport) -> String {
    let mut section = String::new();
    let recommendations = &complete.detailed_recommendations;

    section.push_str(&format!("## Detailed Recommendations\n\n*{}*\n\n", complete.title));

    section.push_str("| Recommendation | Count |\n");
    section.push_str("|:---|:---:|\n");
    for (recommendation, count) in recommendation_counts(recommendations) {
        section.push_str(&format!(
            "| {} {} | {} |\n",
            recommendation.emoji(),
            recommendation,
            count
        ));
    }
    section.push_str(&format!(
        "\n**Estimated total savings:** ${}\n\n",
        complete.executive_summary.estimated_total_savings
    ));

    let largest = top_reductions(recommendations, 5);
    if !largest.is_empty() {
        section.push_str("### Largest Requested Reductions\n\n");
        for (i, a) in largest.iter().enumerate() {
            section.push_str(&format!(
                "{}. `{}` requests ${}: {}\n",
                i + 1,
                a.appeal_id,
                a.requested_reduction,
                a.reasoning
            ));
        }
        section.push('\n');
    }

    section.push_str("### All Appeals\n\n");
    if recommendations.is_empty() {
        section.push_str("No appeals were processed.\n\n");
    } else {
        section.push_str(&generate_assessment_table(recommendations));
    }

    let methodology = &complete.methodology;
    section.push_str("## Methodology\n\n");
    section.push_str(&format!(
        "- **Data Sources:** {}\n",
        methodology.data_sources.join(", ")
    ));
    section.push_str(&format!(
        "- **Processing Agents:** {}\n",
        methodology.processing_agents
    ));
    section.push_str(&format!(
        "- **Validation Consensus:** {} validators\n",
        methodology.validation_consensus
    ));
    section.push_str(&format!(
        "- **Confidence Threshold:** {:.2}\n\n",
        methodology.confidence_threshold
    ));

    section
}

/// Generate the errors section.
fn generate_errors_section(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Errors\n\n");
    for error in errors {
        section.push_str(&format!("- ❗ {}\n", error));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by appeal-swarm v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

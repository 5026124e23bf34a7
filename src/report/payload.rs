//! Report payloads produced by the reporter agent.
//!
//! The partial report is the teaser issued at the end of every run. The
//! complete report lists every recommendation and is only built on request.

use crate::analysis::aggregator;
use crate::analysis::{AppealAssessment, ValidationOutcome};
use crate::config::Config;
use serde::{Deserialize, Serialize};

const NEXT_STEPS: &str = "Complete analysis includes all appeals with detailed recommendations";

/// Fixed values the reporter stamps onto every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub jurisdiction: String,
    pub sample_size: usize,
    pub data_sources: Vec<String>,
    pub processing_agents: usize,
    pub validation_consensus: usize,
    pub confidence_threshold: f64,
}

impl ReportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jurisdiction: config.dataset.jurisdiction.clone(),
            sample_size: config.report.sample_size,
            data_sources: config.report.data_sources.clone(),
            processing_agents: config.swarm.processor_agents,
            validation_consensus: config.swarm.validator_agents,
            confidence_threshold: config.swarm.validation_threshold,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Run data the coordinator hands to the reporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub processed_appeals: usize,
    pub total_appeals: usize,
    /// Processor verdicts in appeal order.
    pub recommendations: Vec<AppealAssessment>,
    pub validation: Option<ValidationOutcome>,
}

impl ReportInput {
    pub fn approval_rate(&self) -> f64 {
        aggregator::approval_rate(&self.recommendations)
    }

    pub fn average_reduction(&self) -> f64 {
        aggregator::average_reduction(&self.recommendations)
    }

    pub fn estimated_savings(&self) -> f64 {
        self.average_reduction() * self.processed_appeals as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSummary {
    pub processed_appeals: usize,
    pub total_appeals: usize,
    pub approval_rate: f64,
    pub average_reduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialStatistics {
    pub completion_percentage: f64,
    pub estimated_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationBlock {
    pub confidence: f64,
    pub validated: bool,
    /// Set when consensus fell below the configured threshold.
    pub low_confidence_warning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialReport {
    pub title: String,
    pub summary: PartialSummary,
    pub sample_results: Vec<AppealAssessment>,
    pub statistics: PartialStatistics,
    pub validation: ValidationBlock,
    pub next_steps: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub total_processed: usize,
    pub recommendations_generated: usize,
    pub approval_rate: f64,
    pub estimated_total_savings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    pub data_sources: Vec<String>,
    pub processing_agents: usize,
    pub validation_consensus: usize,
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteReport {
    pub title: String,
    pub executive_summary: ExecutiveSummary,
    pub detailed_recommendations: Vec<AppealAssessment>,
    pub methodology: Methodology,
}

/// Build the teaser report.
pub fn build_partial(input: &ReportInput, settings: &ReportSettings) -> PartialReport {
    let completion_percentage =
        input.processed_appeals as f64 / input.total_appeals.max(1) as f64 * 100.0;

    let (confidence, validated) = input
        .validation
        .as_ref()
        .map_or((0.0, false), |v| (v.confidence, v.validated));

    PartialReport {
        title: format!("{} Property Tax Appeals - Sample Analysis", settings.jurisdiction),
        summary: PartialSummary {
            processed_appeals: input.processed_appeals,
            total_appeals: input.total_appeals,
            approval_rate: input.approval_rate(),
            average_reduction: input.average_reduction(),
        },
        sample_results: input
            .recommendations
            .iter()
            .take(settings.sample_size)
            .cloned()
            .collect(),
        statistics: PartialStatistics {
            completion_percentage,
            estimated_savings: input.estimated_savings(),
        },
        validation: ValidationBlock {
            confidence,
            validated,
            low_confidence_warning: !validated,
        },
        next_steps: NEXT_STEPS.to_string(),
    }
}

/// Build the report listing every recommendation.
pub fn build_complete(input: &ReportInput, settings: &ReportSettings) -> CompleteReport {
    let estimated_total_savings = input
        .recommendations
        .iter()
        .filter(|r| r.recommendation.grants_reduction())
        .map(|r| r.requested_reduction)
        .sum();

    CompleteReport {
        title: format!("{} Property Tax Appeals - Complete Analysis", settings.jurisdiction),
        executive_summary: ExecutiveSummary {
            total_processed: input.processed_appeals,
            recommendations_generated: input.recommendations.len(),
            approval_rate: input.approval_rate(),
            estimated_total_savings,
        },
        detailed_recommendations: input.recommendations.clone(),
        methodology: Methodology {
            data_sources: settings.data_sources.clone(),
            processing_agents: settings.processing_agents,
            validation_consensus: settings.validation_consensus,
            confidence_threshold: settings.confidence_threshold,
        },
    }
}

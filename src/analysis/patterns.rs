//! Pattern recognition and summary statistics over a dataset.

use crate::models::{Dataset, OVERASSESSMENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean assessment ratio above which the county looks over-assessed.
pub const HIGH_RATIO_THRESHOLD: f64 = 0.9;

/// Named pattern detected across the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFlag {
    /// More than half of the appeals cite overassessment.
    OverassessmentTrend,
    /// Mean assessed/market ratio exceeds [`HIGH_RATIO_THRESHOLD`].
    HighAssessmentRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_properties: usize,
    pub total_appeals: usize,
    /// Appeals per property, properties floored at 1.
    pub appeal_rate: f64,
    pub avg_assessed_value: f64,
    pub avg_market_value: f64,
    /// Appeal count per reason, sorted by reason.
    pub by_reason: BTreeMap<String, usize>,
}

/// Everything the analyzer agent reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub patterns: Vec<PatternFlag>,
    pub statistics: DatasetStatistics,
}

/// Detect dataset-wide patterns.
pub fn detect_patterns(dataset: &Dataset) -> Vec<PatternFlag> {
    let mut patterns = Vec::new();

    if !dataset.appeals.is_empty() {
        let overassessment = dataset
            .appeals
            .iter()
            .filter(|a| a.reason == OVERASSESSMENT)
            .count();
        if overassessment as f64 > dataset.appeals.len() as f64 * 0.5 {
            patterns.push(PatternFlag::OverassessmentTrend);
        }
    }

    if !dataset.properties.is_empty() {
        let ratio_sum: f64 = dataset.properties.iter().map(|p| p.assessment_ratio()).sum();
        let mean_ratio = ratio_sum / dataset.properties.len() as f64;
        if mean_ratio > HIGH_RATIO_THRESHOLD {
            patterns.push(PatternFlag::HighAssessmentRatio);
        }
    }

    patterns
}

/// Compute counts, appeal rate and mean values.
pub fn calculate_statistics(dataset: &Dataset) -> DatasetStatistics {
    let properties = dataset.properties.len();
    let divisor = properties.max(1) as f64;

    let assessed: i64 = dataset.properties.iter().map(|p| p.assessed_value).sum();
    let market: i64 = dataset.properties.iter().map(|p| p.market_value).sum();

    let mut by_reason = BTreeMap::new();
    for appeal in &dataset.appeals {
        *by_reason.entry(appeal.reason.clone()).or_insert(0) += 1;
    }

    DatasetStatistics {
        total_properties: properties,
        total_appeals: dataset.appeals.len(),
        appeal_rate: dataset.appeals.len() as f64 / divisor,
        avg_assessed_value: assessed as f64 / divisor,
        avg_market_value: market as f64 / divisor,
        by_reason,
    }
}

/// Full analysis; a pure function of the dataset.
pub fn analyze(dataset: &Dataset) -> PatternAnalysis {
    PatternAnalysis {
        patterns: detect_patterns(dataset),
        statistics: calculate_statistics(dataset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppealRecord, AppealStatus, PropertyRecord};

    fn property(id: &str, assessed: i64, market: i64) -> PropertyRecord {
        PropertyRecord {
            id: id.to_string(),
            address: format!("{} Main St", id),
            assessed_value: assessed,
            market_value: market,
            owner_name: "Owner".to_string(),
            property_type: "Residential".to_string(),
            last_updated: None,
        }
    }

    fn appeal(id: &str, property_id: &str, reason: &str) -> AppealRecord {
        AppealRecord {
            id: id.to_string(),
            property_id: property_id.to_string(),
            appeal_date: "2024-01-15".to_string(),
            status: AppealStatus::Pending,
            requested_value: 100_000,
            reason: reason.to_string(),
            hearing_date: None,
            resolution: None,
            final_value: None,
        }
    }

    fn two_property_dataset() -> Dataset {
        Dataset::new(
            vec![
                property("12-345-67", 125_000, 150_000),
                property("12-345-68", 200_000, 220_000),
            ],
            vec![appeal("AP-2024-001", "12-345-67", OVERASSESSMENT)],
        )
    }

    #[test]
    fn test_overassessment_trend_requires_majority() {
        let mut dataset = two_property_dataset();
        assert!(detect_patterns(&dataset).contains(&PatternFlag::OverassessmentTrend));

        // Exactly half is not a majority
        dataset
            .appeals
            .push(appeal("AP-2024-002", "12-345-68", "Clerical Error"));
        assert!(!detect_patterns(&dataset).contains(&PatternFlag::OverassessmentTrend));
    }

    #[test]
    fn test_high_assessment_ratio() {
        // Mean of 0.833 and 0.909 is 0.871
        let dataset = two_property_dataset();
        assert!(!detect_patterns(&dataset).contains(&PatternFlag::HighAssessmentRatio));

        let inflated = Dataset::new(
            vec![property("a", 95_000, 100_000), property("b", 100_000, 100_000)],
            vec![],
        );
        assert_eq!(detect_patterns(&inflated), vec![PatternFlag::HighAssessmentRatio]);
    }

    #[test]
    fn test_statistics() {
        let stats = calculate_statistics(&two_property_dataset());
        assert_eq!(stats.total_properties, 2);
        assert_eq!(stats.total_appeals, 1);
        assert_eq!(stats.appeal_rate, 0.5);
        assert_eq!(stats.avg_assessed_value, 162_500.0);
        assert_eq!(stats.avg_market_value, 185_000.0);
        assert_eq!(stats.by_reason.get(OVERASSESSMENT), Some(&1));
    }

    #[test]
    fn test_statistics_without_properties() {
        let dataset = Dataset::new(vec![], vec![appeal("AP-1", "gone", OVERASSESSMENT)]);
        let stats = calculate_statistics(&dataset);
        assert_eq!(stats.appeal_rate, 1.0);
        assert_eq!(stats.avg_assessed_value, 0.0);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let dataset = two_property_dataset();
        assert_eq!(analyze(&dataset), analyze(&dataset));
    }

    #[test]
    fn test_empty_dataset_has_no_patterns() {
        let analysis = analyze(&Dataset::default());
        assert!(analysis.patterns.is_empty());
        assert_eq!(analysis.statistics.total_appeals, 0);
    }
}

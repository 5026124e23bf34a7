//! Per-appeal recommendation rules.

use crate::models::{AppealRecord, Recommendation, OVERASSESSMENT};
use serde::{Deserialize, Serialize};

/// Ratio above which an overassessment claim is taken seriously.
pub const RATIO_THRESHOLD: f64 = 0.9;

/// Largest requested reduction that is approved in full.
pub const MAX_FULL_REDUCTION: f64 = 0.2;

/// One appeal joined with its property's values.
#[derive(Debug, Clone)]
pub struct AppealCase {
    pub appeal: AppealRecord,
    pub assessed_value: i64,
    pub market_value: i64,
}

/// A processor's verdict on one appeal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealAssessment {
    pub appeal_id: String,
    pub property_id: String,
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub reasoning: String,
    pub assessment_ratio: f64,
    /// Requested reduction as a share of the assessed value.
    pub reduction_requested: f64,
    /// Requested reduction in currency units, never negative.
    pub requested_reduction: i64,
}

impl AppealCase {
    pub fn assessment_ratio(&self) -> f64 {
        self.assessed_value as f64 / self.market_value.max(1) as f64
    }

    pub fn reduction_requested(&self) -> f64 {
        (self.assessed_value - self.appeal.requested_value) as f64
            / self.assessed_value.max(1) as f64
    }
}

/// Apply the decision table to one appeal.
pub fn assess(case: &AppealCase) -> AppealAssessment {
    let ratio = case.assessment_ratio();
    let reduction = case.reduction_requested();

    let (recommendation, confidence_score, reasoning) =
        if case.appeal.reason == OVERASSESSMENT && ratio > RATIO_THRESHOLD {
            if reduction <= MAX_FULL_REDUCTION {
                (
                    Recommendation::ApproveReduction,
                    0.85,
                    "Assessment appears inflated compared to market value",
                )
            } else {
                (
                    Recommendation::PartialReduction,
                    0.65,
                    "Significant reduction requested, approve partial adjustment",
                )
            }
        } else {
            (
                Recommendation::DenyAppeal,
                0.75,
                "Assessment appears reasonable based on available data",
            )
        };

    AppealAssessment {
        appeal_id: case.appeal.id.clone(),
        property_id: case.appeal.property_id.clone(),
        recommendation,
        confidence_score,
        reasoning: reasoning.to_string(),
        assessment_ratio: ratio,
        reduction_requested: reduction,
        requested_reduction: (case.assessed_value - case.appeal.requested_value).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppealStatus;

    fn case(reason: &str, assessed: i64, market: i64, requested: i64) -> AppealCase {
        AppealCase {
            appeal: AppealRecord {
                id: "AP-2024-001".to_string(),
                property_id: "12-345-67".to_string(),
                appeal_date: "2024-01-15".to_string(),
                status: AppealStatus::Pending,
                requested_value: requested,
                reason: reason.to_string(),
                hearing_date: None,
                resolution: None,
                final_value: None,
            },
            assessed_value: assessed,
            market_value: market,
        }
    }

    #[test]
    fn test_twenty_percent_reduction_is_approved() {
        // 125000 / 130000 = 0.96, (125000 - 100000) / 125000 = 0.20
        let result = assess(&case(OVERASSESSMENT, 125_000, 130_000, 100_000));
        assert_eq!(result.recommendation, Recommendation::ApproveReduction);
        assert_eq!(result.confidence_score, 0.85);
        assert_eq!(result.reduction_requested, 0.2);
        assert_eq!(result.requested_reduction, 25_000);
        assert_eq!(
            result.reasoning,
            "Assessment appears inflated compared to market value"
        );
    }

    #[test]
    fn test_large_reduction_is_partial() {
        let result = assess(&case(OVERASSESSMENT, 200_000, 210_000, 120_000));
        assert_eq!(result.recommendation, Recommendation::PartialReduction);
        assert_eq!(result.confidence_score, 0.65);
    }

    #[test]
    fn test_low_ratio_is_denied() {
        // 125000 / 150000 = 0.833 does not exceed the ratio threshold
        let result = assess(&case(OVERASSESSMENT, 125_000, 150_000, 100_000));
        assert_eq!(result.recommendation, Recommendation::DenyAppeal);
        assert_eq!(result.confidence_score, 0.75);
    }

    #[test]
    fn test_other_reasons_are_denied_regardless_of_ratio() {
        for (assessed, market) in [(125_000, 150_000), (200_000, 150_000), (100_000, 100_000)] {
            let result = assess(&case("Clerical Error", assessed, market, 90_000));
            assert_eq!(result.recommendation, Recommendation::DenyAppeal);
            assert_eq!(result.confidence_score, 0.75);
            assert_eq!(
                result.reasoning,
                "Assessment appears reasonable based on available data"
            );
        }
    }

    #[test]
    fn test_zero_values_do_not_divide_by_zero() {
        let result = assess(&case(OVERASSESSMENT, 0, 0, 0));
        assert_eq!(result.assessment_ratio, 0.0);
        assert_eq!(result.reduction_requested, 0.0);
        assert_eq!(result.recommendation, Recommendation::DenyAppeal);
    }

    #[test]
    fn test_request_above_assessment_has_no_reduction() {
        let result = assess(&case(OVERASSESSMENT, 100_000, 100_000, 120_000));
        assert_eq!(result.requested_reduction, 0);
        assert!(result.reduction_requested < 0.0);
        assert_eq!(result.recommendation, Recommendation::ApproveReduction);
    }
}

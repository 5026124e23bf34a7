//! Validator scoring and swarm-wide consensus.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// One validator's view, or the combined view of all validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub confidence: f64,
    pub validated: bool,
    /// Only set on the combined outcome when at least one validator contributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_score: Option<f64>,
    /// Number of outcomes folded into this one.
    pub validator_count: usize,
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Read `confidence_score` from a processor payload, 0.0 when absent.
pub fn confidence_of(payload: &Value) -> f64 {
    payload
        .get("confidence_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

/// Score a batch of processor payloads as a single validator.
pub fn validate_batch(results: &[Value], threshold: f64) -> ValidationOutcome {
    let confidence = mean(results.iter().map(confidence_of));
    ValidationOutcome {
        confidence,
        validated: !results.is_empty() && confidence >= threshold,
        consensus_score: None,
        validator_count: 1,
    }
}

/// Combine individual validator outcomes as a mean of their means.
///
/// Each validator weighs equally no matter how many results it scored.
/// Outcomes that all scored empty batches never count as validated.
pub fn consensus(outcomes: &[ValidationOutcome], threshold: f64) -> ValidationOutcome {
    if outcomes.is_empty() {
        return ValidationOutcome {
            confidence: 0.0,
            validated: false,
            consensus_score: None,
            validator_count: 0,
        };
    }

    let confidence = mean(outcomes.iter().map(|o| o.confidence));
    ValidationOutcome {
        confidence,
        validated: outcomes.iter().any(|o| o.validated) && confidence >= threshold,
        consensus_score: Some(confidence),
        validator_count: outcomes.len(),
    }
}

/// Mean over every score in every batch, ignoring batch boundaries.
pub fn pooled_mean(batches: &[Vec<f64>]) -> f64 {
    let all: Vec<f64> = batches.iter().flatten().copied().collect();
    mean(all.into_iter())
}

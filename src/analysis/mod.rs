//! Analysis modules.
//!
//! Pure functions behind the analyzer, processor and validator roles, plus
//! aggregation helpers used by the reporter.

pub mod aggregator;
pub mod appeal;
pub mod consensus;
pub mod patterns;

pub use appeal::{assess, AppealAssessment, AppealCase};
pub use consensus::{consensus, validate_batch, ValidationOutcome};
pub use patterns::{analyze, PatternAnalysis, PatternFlag};

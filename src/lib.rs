//! Appeal Swarm - multi-agent review of property-tax appeals.
//!
//! A fixed pool of collector, analyzer, processor, validator and reporter
//! agents turns a county's property and appeal records into a recommendation
//! per appeal, a consensus confidence score, and a tiered report.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod report;
pub mod retry;
pub mod swarm;

pub use swarm::{run, WorkflowResult};

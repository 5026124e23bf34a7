//! Multi-agent workflow core.
//!
//! The [`Dispatcher`] owns a fixed pool of [`Agent`]s; the [`Coordinator`]
//! drives each run through its stages and assembles a [`WorkflowResult`].

pub mod agent;
pub mod coordinator;
pub mod dispatcher;
pub mod log;
pub mod task;

pub use agent::{Agent, AgentRole, AgentStatus, FetchPolicy};
pub use coordinator::{Coordinator, WorkflowResult, WorkflowStage};
pub use dispatcher::{route, AgentPool, Dispatcher};
pub use log::ResultLog;
pub use task::{Params, Task, TaskKind, TaskResult, TaskStatus};

use crate::config::Config;
use crate::provider::DatasetProvider;
use std::sync::Arc;

/// Run one workflow end to end and tear the pool down afterwards.
///
/// A configuration the dispatcher rejects yields a failed result rather
/// than an error.
pub async fn run(config: &Config, provider: Arc<dyn DatasetProvider>) -> WorkflowResult {
    let mut coordinator = match Coordinator::from_config(config, provider) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!("Could not start agent pool: {}", e);
            return WorkflowResult::aborted(WorkflowStage::Start, e.to_string(), 0.0);
        }
    };

    let result = coordinator.run().await;
    coordinator.shutdown();
    result
}

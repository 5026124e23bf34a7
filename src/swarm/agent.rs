//! Worker agents.
//!
//! Roles form a closed set. Each role accepts only its own task kinds and
//! carries whatever collaborators its logic needs; dispatch is a `match`
//! on the role, never on a runtime type.

use crate::analysis::{self, AppealCase};
use crate::error::{AgentError, ProviderError};
use crate::models::{AppealRecord, Dataset};
use crate::provider::DatasetProvider;
use crate::report::payload::{self, ReportInput, ReportSettings};
use crate::retry::{with_deadline, with_retry};
use crate::swarm::task::{Params, Task, TaskKind, TaskResult};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The five agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Collector,
    Analyzer,
    Processor,
    Validator,
    Reporter,
}

impl AgentRole {
    /// Whether this role handles tasks of `kind`.
    pub fn accepts(&self, kind: TaskKind) -> bool {
        matches!(
            (self, kind),
            (AgentRole::Collector, TaskKind::Collect)
                | (AgentRole::Analyzer, TaskKind::Analyze)
                | (AgentRole::Processor, TaskKind::Process)
                | (AgentRole::Validator, TaskKind::Validate)
                | (AgentRole::Reporter, TaskKind::ReportPartial)
                | (AgentRole::Reporter, TaskKind::ReportComplete)
        )
    }

    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Collector => &["web_scraping", "api_calls", "file_processing"],
            AgentRole::Analyzer => &[
                "pattern_recognition",
                "statistical_analysis",
                "trend_analysis",
            ],
            AgentRole::Processor => &[
                "appeal_processing",
                "recommendation_generation",
                "value_assessment",
            ],
            AgentRole::Validator => &["result_validation", "cross_checking", "confidence_scoring"],
            AgentRole::Reporter => &[
                "report_generation",
                "data_visualization",
                "template_processing",
            ],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentRole::Collector => "collector",
            AgentRole::Analyzer => "analyzer",
            AgentRole::Processor => "processor",
            AgentRole::Validator => "validator",
            AgentRole::Reporter => "reporter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Offline,
}

/// Deadline and retry budget for a collector's fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            attempts: 3,
            retry_delay: Duration::from_millis(250),
        }
    }
}

enum Behavior {
    Collector {
        provider: Arc<dyn DatasetProvider>,
        policy: FetchPolicy,
    },
    Analyzer,
    Processor,
    Validator {
        threshold: f64,
    },
    Reporter {
        settings: ReportSettings,
    },
}

/// A worker owned by the dispatcher for its whole lifetime.
pub struct Agent {
    id: String,
    role: AgentRole,
    status: AgentStatus,
    completed_count: usize,
    current_task: Option<String>,
    behavior: Behavior,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("completed_count", &self.completed_count)
            .field("current_task", &self.current_task)
            .finish_non_exhaustive()
    }
}

impl Agent {
    fn new(id: impl Into<String>, role: AgentRole, behavior: Behavior) -> Self {
        Self {
            id: id.into(),
            role,
            status: AgentStatus::Idle,
            completed_count: 0,
            current_task: None,
            behavior,
        }
    }

    pub fn collector(
        id: impl Into<String>,
        provider: Arc<dyn DatasetProvider>,
        policy: FetchPolicy,
    ) -> Self {
        Self::new(id, AgentRole::Collector, Behavior::Collector { provider, policy })
    }

    pub fn analyzer(id: impl Into<String>) -> Self {
        Self::new(id, AgentRole::Analyzer, Behavior::Analyzer)
    }

    pub fn processor(id: impl Into<String>) -> Self {
        Self::new(id, AgentRole::Processor, Behavior::Processor)
    }

    pub fn validator(id: impl Into<String>, threshold: f64) -> Self {
        Self::new(id, AgentRole::Validator, Behavior::Validator { threshold })
    }

    pub fn reporter(id: impl Into<String>, settings: ReportSettings) -> Self {
        Self::new(id, AgentRole::Reporter, Behavior::Reporter { settings })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn capabilities(&self) -> &'static [&'static str] {
        self.role.capabilities()
    }

    /// Take the agent out of service; every later task is rejected.
    pub(crate) fn go_offline(&mut self) {
        self.status = AgentStatus::Offline;
        self.current_task = None;
    }

    /// Record that the caller abandoned the running task at its deadline.
    pub(crate) fn abandon_task(&mut self) {
        self.status = AgentStatus::Error;
        self.current_task = None;
    }

    /// Execute one task. Never fails: errors come back as a failed result.
    pub async fn execute(&mut self, task: &Task) -> TaskResult {
        let started = Instant::now();

        if self.status == AgentStatus::Offline {
            let err = AgentError::Offline(self.id.clone());
            warn!("Rejected {}: {}", task.id(), err);
            return TaskResult::failed(task, &self.id, &err, 0.0);
        }

        if !self.role.accepts(task.kind()) {
            warn!(
                "Agent {} ({}) cannot handle {} task {}",
                self.id,
                self.role,
                task.kind(),
                task.id()
            );
            return TaskResult::failed(task, &self.id, &AgentError::UnsupportedTaskKind, 0.0);
        }

        self.status = AgentStatus::Busy;
        self.current_task = Some(task.id().to_string());
        debug!("Agent {} started {}", self.id, task.id());

        let outcome = self.run(task).await;
        let elapsed = started.elapsed().as_secs_f64();
        self.current_task = None;

        match outcome {
            Ok(payload) => {
                self.status = AgentStatus::Idle;
                self.completed_count += 1;
                debug!("Agent {} completed {} in {:.3}s", self.id, task.id(), elapsed);
                TaskResult::completed(task, &self.id, payload, elapsed)
            }
            Err(e) => {
                self.status = AgentStatus::Error;
                warn!("Agent {} failed {}: {}", self.id, task.id(), e);
                TaskResult::failed(task, &self.id, &e, elapsed)
            }
        }
    }

    async fn run(&self, task: &Task) -> Result<Params, AgentError> {
        match &self.behavior {
            Behavior::Collector { provider, policy } => collect(provider, *policy, task).await,
            Behavior::Analyzer => analyze(task),
            Behavior::Processor => process(task),
            Behavior::Validator { threshold } => validate(task, *threshold),
            Behavior::Reporter { settings } => report(task, settings),
        }
    }
}

fn required<'a>(task: &'a Task, name: &'static str) -> Result<&'a Value, AgentError> {
    task.param(name).ok_or(AgentError::MissingParameter(name))
}

fn decode<T: DeserializeOwned>(value: &Value, name: &'static str) -> Result<T, AgentError> {
    T::deserialize(value).map_err(|e| AgentError::InvalidParameter {
        name,
        reason: e.to_string(),
    })
}

fn into_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Params::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

async fn collect(
    provider: &Arc<dyn DatasetProvider>,
    policy: FetchPolicy,
    task: &Task,
) -> Result<Params, AgentError> {
    let source = required(task, "source")?
        .as_str()
        .ok_or_else(|| AgentError::InvalidParameter {
            name: "source",
            reason: "expected a string".to_string(),
        })?;

    debug!("Fetching {} from {} provider", source, provider.name());
    let dataset = with_retry(
        move || {
            with_deadline(policy.timeout, provider.fetch(source), |limit| {
                ProviderError::Timeout(limit.as_secs_f64())
            })
        },
        policy.attempts,
        policy.retry_delay,
        ProviderError::is_transient,
    )
    .await?;

    Ok(into_params(json!({
        "property_records": dataset.properties,
        "appeal_records": dataset.appeals,
        "collection_timestamp": Utc::now().to_rfc3339(),
    })))
}

fn analyze(task: &Task) -> Result<Params, AgentError> {
    let dataset: Dataset = decode(required(task, "data")?, "data")?;
    let analysis = analysis::analyze(&dataset);
    Ok(into_params(serde_json::to_value(analysis)?))
}

fn process(task: &Task) -> Result<Params, AgentError> {
    let appeal: AppealRecord = decode(required(task, "appeal")?, "appeal")?;
    let assessed_value: i64 = decode(required(task, "assessed_value")?, "assessed_value")?;
    let market_value: i64 = match task.param("market_value") {
        Some(value) => decode(value, "market_value")?,
        None => assessed_value,
    };

    let assessment = analysis::assess(&AppealCase {
        appeal,
        assessed_value,
        market_value,
    });
    Ok(into_params(serde_json::to_value(assessment)?))
}

fn validate(task: &Task, threshold: f64) -> Result<Params, AgentError> {
    let results: Vec<Value> = decode(required(task, "results")?, "results")?;
    let outcome = analysis::validate_batch(&results, threshold);

    Ok(into_params(json!({
        "validation_result": outcome,
        "validated_count": results.len(),
    })))
}

fn report(task: &Task, settings: &ReportSettings) -> Result<Params, AgentError> {
    let input: ReportInput = decode(required(task, "data")?, "data")?;

    let (report, report_type) = match task.kind() {
        TaskKind::ReportComplete => (
            serde_json::to_value(payload::build_complete(&input, settings))?,
            "complete",
        ),
        _ => (
            serde_json::to_value(payload::build_partial(&input, settings))?,
            "partial",
        ),
    };

    Ok(into_params(json!({
        "report": report,
        "report_type": report_type,
        "generated_timestamp": Utc::now().to_rfc3339(),
    })))
}

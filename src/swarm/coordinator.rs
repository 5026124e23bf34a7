//! Pipeline coordinator.
//!
//! Drives one run through `collect → analyze → process → validate → report`.
//! PROCESS and VALIDATE fan out across their pools and meet at a barrier;
//! the other stages are single tasks whose failure aborts the run. No
//! failure crosses a stage boundary as `Err`: every outcome is a
//! [`TaskResult`], and the run always ends in a [`WorkflowResult`].

use crate::analysis::{consensus, AppealAssessment, ValidationOutcome};
use crate::config::{Config, SwarmConfig};
use crate::error::{AgentError, DispatchError};
use crate::models::{AppealRecord, Dataset, PropertyRecord};
use crate::provider::DatasetProvider;
use crate::report::payload::{PartialReport, ReportInput, ReportSettings};
use crate::swarm::agent::Agent;
use crate::swarm::dispatcher::{route, AgentPool, Dispatcher};
use crate::swarm::log::ResultLog;
use crate::swarm::task::{Params, Task, TaskKind, TaskResult};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Tasks outside the PROCESS stage: collect, analyze, validate (as one) and report.
const FIXED_TASKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStage {
    Start,
    Collect,
    Analyze,
    Process,
    Validate,
    Report,
    Done,
    Aborted,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::Start => "start",
            WorkflowStage::Collect => "collect",
            WorkflowStage::Analyze => "analyze",
            WorkflowStage::Process => "process",
            WorkflowStage::Validate => "validate",
            WorkflowStage::Report => "report",
            WorkflowStage::Done => "done",
            WorkflowStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub id: String,
    pub success: bool,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub execution_time_seconds: f64,
    pub results: Params,
    pub errors: Vec<String>,
}

impl WorkflowResult {
    fn new_id() -> String {
        format!("workflow_{}", Utc::now().timestamp_millis())
    }

    /// A run that stopped at `stage` with a single fatal error.
    pub fn aborted(stage: WorkflowStage, message: impl Into<String>, elapsed: f64) -> Self {
        let mut results = Params::new();
        results.insert("aborted_stage".to_string(), json!(stage));
        Self {
            id: Self::new_id(),
            success: false,
            total_tasks: 0,
            completed_tasks: 0,
            failed_tasks: 1,
            execution_time_seconds: elapsed,
            results,
            errors: vec![message.into()],
        }
    }

    /// Consensus outcome of the VALIDATE stage.
    pub fn validation(&self) -> Option<ValidationOutcome> {
        self.results
            .get("validation")
            .and_then(|v| ValidationOutcome::deserialize(v).ok())
    }

    pub fn is_validated(&self) -> bool {
        self.validation().map_or(false, |v| v.validated)
    }

    /// Processor verdicts in appeal order.
    pub fn recommendations(&self) -> Vec<AppealAssessment> {
        self.results
            .get("recommendations")
            .and_then(|v| Vec::<AppealAssessment>::deserialize(v).ok())
            .unwrap_or_default()
    }

    /// The partial report issued at the end of the run.
    pub fn report(&self) -> Option<PartialReport> {
        self.results
            .get("report")
            .and_then(|v| PartialReport::deserialize(v).ok())
    }

    fn count(&self, key: &str) -> usize {
        self.results
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }

    /// Rebuild the reporter input for a follow-up complete report.
    fn report_input(&self) -> ReportInput {
        let recommendations = self.recommendations();
        ReportInput {
            processed_appeals: recommendations.len(),
            total_appeals: self.count("appeal_records"),
            recommendations,
            validation: self.validation(),
        }
    }
}

/// Run `task` on `agent`, failing it if it outlives `deadline`.
pub async fn dispatch(agent: &mut Agent, task: &Task, deadline: Duration) -> TaskResult {
    debug!("Dispatching {} to {}", task.id(), agent.id());
    match timeout(deadline, agent.execute(task)).await {
        Ok(result) => result,
        Err(_) => {
            agent.abandon_task();
            let err = AgentError::Timeout(deadline.as_secs_f64());
            warn!("{} on {}: {}", task.id(), agent.id(), err);
            TaskResult::failed(task, agent.id(), &err, deadline.as_secs_f64())
        }
    }
}

/// Deadline for the collect task: the collector's whole retry budget plus one
/// spare request timeout, so its own per-fetch deadline expires first.
fn collect_deadline(swarm: &SwarmConfig) -> Duration {
    let attempts = swarm.retries.max(1);
    // 1 + 2 + ... + (attempts - 1) delay units
    let n = u64::from(attempts);
    let backoff = u32::try_from(n * (n - 1) / 2).unwrap_or(u32::MAX);
    swarm
        .request_timeout()
        .saturating_mul(attempts.saturating_add(1))
        .saturating_add(swarm.retry_delay().saturating_mul(backoff))
}

fn object(result: &TaskResult) -> Value {
    Value::Object(result.payload().clone())
}

fn failure_line(result: &TaskResult) -> String {
    format!(
        "{}: {}",
        result.task_id(),
        result.error().unwrap_or("unknown error")
    )
}

fn process_task(index: usize, appeal: &AppealRecord, property: Option<&PropertyRecord>) -> Task {
    let mut params = Params::new();
    params.insert("appeal".to_string(), json!(appeal));
    if let Some(property) = property {
        params.insert("assessed_value".to_string(), json!(property.assessed_value));
        params.insert("market_value".to_string(), json!(property.market_value));
    }
    Task::new(
        format!("T003_process_appeal_{:03}", index),
        TaskKind::Process,
        params,
    )
}

fn data_task(id: &str, kind: TaskKind, data: Value) -> Task {
    let mut params = Params::new();
    params.insert("data".to_string(), data);
    Task::new(id, kind, params)
}

fn enter(stages: &mut Vec<WorkflowStage>, stage: WorkflowStage) {
    info!("Workflow stage: {}", stage);
    stages.push(stage);
}

/// Drives runs over a started dispatcher.
pub struct Coordinator {
    dispatcher: Dispatcher,
    swarm: SwarmConfig,
    source_id: String,
    stages: Vec<WorkflowStage>,
}

impl Coordinator {
    /// Wrap `dispatcher`, starting it with `swarm` unless already started.
    pub fn new(
        mut dispatcher: Dispatcher,
        swarm: SwarmConfig,
        source_id: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        if !dispatcher.is_started() {
            dispatcher.start(&swarm)?;
        }
        Ok(Self {
            dispatcher,
            swarm,
            source_id: source_id.into(),
            stages: Vec::new(),
        })
    }

    pub fn from_config(
        config: &Config,
        provider: Arc<dyn DatasetProvider>,
    ) -> Result<Self, DispatchError> {
        let dispatcher = Dispatcher::new(provider, ReportSettings::from_config(config));
        Self::new(dispatcher, config.swarm.clone(), config.dataset.source_id.clone())
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stage transitions of the most recent run.
    pub fn stages(&self) -> &[WorkflowStage] {
        &self.stages
    }

    /// Stop the pool and hand it back.
    pub fn shutdown(mut self) -> Option<AgentPool> {
        self.dispatcher.shutdown()
    }

    /// Execute one full run.
    pub async fn run(&mut self) -> WorkflowResult {
        let started = Instant::now();
        let Coordinator {
            dispatcher,
            swarm,
            source_id,
            stages,
        } = self;

        stages.clear();
        stages.push(WorkflowStage::Start);

        let abort = |stages: &mut Vec<WorkflowStage>, stage: WorkflowStage, message: String| {
            error!("Workflow aborted in {}: {}", stage, message);
            stages.push(WorkflowStage::Aborted);
            WorkflowResult::aborted(stage, message, started.elapsed().as_secs_f64())
        };

        let pool = match dispatcher.pool_mut() {
            Ok(pool) => pool,
            Err(e) => return abort(stages, WorkflowStage::Start, e.to_string()),
        };

        let deadline = swarm.request_timeout();
        let mut log = ResultLog::new();

        // COLLECT
        enter(stages, WorkflowStage::Collect);
        let mut params = Params::new();
        params.insert("source".to_string(), json!(source_id));
        let task = Task::new("T001_data_collection", TaskKind::Collect, params).with_priority(3);
        let collected = dispatch(&mut pool.collector, &task, collect_deadline(swarm)).await;
        if !collected.is_completed() {
            let message = failure_line(&collected);
            log.record(collected);
            return abort(stages, WorkflowStage::Collect, message);
        }
        let collected_payload = object(&collected);
        log.record(collected);

        let dataset = match Dataset::deserialize(&collected_payload) {
            Ok(dataset) => dataset,
            Err(e) => {
                return abort(
                    stages,
                    WorkflowStage::Collect,
                    format!("T001_data_collection: malformed records: {}", e),
                )
            }
        };
        info!(
            "Collected {} properties and {} appeals",
            dataset.properties.len(),
            dataset.appeals.len()
        );

        // ANALYZE
        enter(stages, WorkflowStage::Analyze);
        let task = data_task("T002_pattern_analysis", TaskKind::Analyze, collected_payload)
            .with_priority(2);
        let analyzed = dispatch(&mut pool.analyzer, &task, deadline).await;
        if !analyzed.is_completed() {
            let message = failure_line(&analyzed);
            log.record(analyzed);
            return abort(stages, WorkflowStage::Analyze, message);
        }
        let analysis = analyzed.payload().clone();
        log.record(analyzed);

        // PROCESS
        enter(stages, WorkflowStage::Process);
        let processed = process_stage(&mut pool.processors, &dataset, deadline).await;

        let mut errors = Vec::new();
        let mut recommendations = Vec::with_capacity(processed.len());
        let mut processor_payloads = Vec::with_capacity(processed.len());
        let mut failed_processors = 0;
        for result in &processed {
            if result.is_completed() {
                let payload = object(result);
                if let Ok(assessment) = AppealAssessment::deserialize(&payload) {
                    recommendations.push(assessment);
                }
                processor_payloads.push(payload);
            } else {
                failed_processors += 1;
                errors.push(failure_line(result));
            }
        }
        info!(
            "Processed {}/{} appeals",
            processor_payloads.len(),
            processed.len()
        );
        log.extend(processed);

        // VALIDATE
        enter(stages, WorkflowStage::Validate);
        let validated = validate_stage(&mut pool.validators, &processor_payloads, deadline).await;

        let mut outcomes = Vec::with_capacity(validated.len());
        for result in &validated {
            if result.is_completed() {
                match result
                    .payload()
                    .get("validation_result")
                    .map(ValidationOutcome::deserialize)
                {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    _ => errors.push(format!("{}: missing validation result", result.task_id())),
                }
            } else {
                errors.push(failure_line(result));
            }
        }
        log.extend(validated);

        let validation = consensus(&outcomes, swarm.validation_threshold);
        info!(
            "Consensus {:.3} from {} validators (validated: {})",
            validation.confidence, validation.validator_count, validation.validated
        );

        // REPORT
        enter(stages, WorkflowStage::Report);
        let input = ReportInput {
            processed_appeals: recommendations.len(),
            total_appeals: dataset.appeals.len(),
            recommendations,
            validation: Some(validation.clone()),
        };
        let task = data_task("T005_partial_report", TaskKind::ReportPartial, json!(input));
        let reported = dispatch(&mut pool.reporter, &task, deadline).await;
        if !reported.is_completed() {
            let message = failure_line(&reported);
            log.record(reported);
            return abort(stages, WorkflowStage::Report, message);
        }
        let report = reported.payload().get("report").cloned().unwrap_or(Value::Null);
        log.record(reported);

        enter(stages, WorkflowStage::Done);

        let total_tasks = dataset.appeals.len() + FIXED_TASKS;
        let failed_tasks = failed_processors + usize::from(outcomes.is_empty());

        let mut results = Params::new();
        results.insert("property_records".to_string(), json!(dataset.properties.len()));
        results.insert("appeal_records".to_string(), json!(dataset.appeals.len()));
        results.insert(
            "patterns".to_string(),
            analysis.get("patterns").cloned().unwrap_or(Value::Null),
        );
        results.insert(
            "statistics".to_string(),
            analysis.get("statistics").cloned().unwrap_or(Value::Null),
        );
        results.insert(
            "processing_results".to_string(),
            json!(processor_payloads.len()),
        );
        results.insert("recommendations".to_string(), json!(input.recommendations));
        results.insert("validation".to_string(), json!(validation));
        results.insert(
            "validation_confidence".to_string(),
            json!(validation.confidence),
        );
        results.insert("report".to_string(), report);
        results.insert("success_rate".to_string(), json!(log.success_rate()));

        let elapsed = started.elapsed().as_secs_f64();
        info!(
            "Workflow finished in {:.2}s: {} tasks, {} failed",
            elapsed, total_tasks, failed_tasks
        );

        WorkflowResult {
            id: WorkflowResult::new_id(),
            success: true,
            total_tasks,
            completed_tasks: total_tasks - failed_tasks,
            failed_tasks,
            execution_time_seconds: elapsed,
            results,
            errors,
        }
    }

    /// Issue the complete report for a finished run.
    pub async fn generate_complete_report(
        &mut self,
        result: &WorkflowResult,
    ) -> Result<TaskResult, DispatchError> {
        let deadline = self.swarm.request_timeout();
        let pool = self.dispatcher.pool_mut()?;

        let input = json!(result.report_input());
        let task = data_task("T006_complete_report", TaskKind::ReportComplete, input);

        info!("Generating complete report for {}", result.id);
        Ok(dispatch(&mut pool.reporter, &task, deadline).await)
    }
}

/// Fan appeals out round-robin; each processor drains its own queue in order.
async fn process_stage(
    processors: &mut [Agent],
    dataset: &Dataset,
    deadline: Duration,
) -> Vec<TaskResult> {
    let count = processors.len();
    if count == 0 || dataset.appeals.is_empty() {
        return Vec::new();
    }

    let index: HashMap<&str, &PropertyRecord> = dataset.property_index();
    let mut queues: Vec<Vec<(usize, Task)>> = (0..count).map(|_| Vec::new()).collect();
    for (i, appeal) in dataset.appeals.iter().enumerate() {
        let property = index.get(appeal.property_id.as_str()).copied();
        if property.is_none() {
            warn!(
                "Appeal {} references unknown property {}",
                appeal.id, appeal.property_id
            );
        }
        queues[route(i, count)].push((i, process_task(i, appeal, property)));
    }

    let mut pending: FuturesUnordered<_> = processors
        .iter_mut()
        .zip(queues)
        .map(|(agent, queue)| async move {
            let mut done = Vec::with_capacity(queue.len());
            for (i, task) in queue {
                done.push((i, dispatch(agent, &task, deadline).await));
            }
            done
        })
        .collect();

    let mut results = Vec::with_capacity(dataset.appeals.len());
    while let Some(batch) = pending.next().await {
        results.extend(batch);
    }
    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Hand every validator the same full set of processor payloads.
async fn validate_stage(
    validators: &mut [Agent],
    payloads: &[Value],
    deadline: Duration,
) -> Vec<TaskResult> {
    let shared = Value::Array(payloads.to_vec());

    let mut pending: FuturesUnordered<_> = validators
        .iter_mut()
        .enumerate()
        .map(|(j, agent)| {
            let mut params = Params::new();
            params.insert("results".to_string(), shared.clone());
            let task = Task::new(format!("T004_validation_{:03}", j), TaskKind::Validate, params);
            async move { (j, dispatch(agent, &task, deadline).await) }
        })
        .collect();

    let mut results = Vec::with_capacity(pending.len());
    while let Some(entry) = pending.next().await {
        results.push(entry);
    }
    results.sort_by_key(|(j, _)| *j);
    results.into_iter().map(|(_, r)| r).collect()
}

//! Task and result value types.
//!
//! Both are immutable once built: fields are private and only read through
//! accessors. A task is consumed by exactly one agent; the result it
//! produces is owned by the coordinator's run log.

use crate::error::AgentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Parameter bag carried by tasks and payload bag carried by results.
pub type Params = Map<String, Value>;

/// What a task asks its agent to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Collect,
    Analyze,
    Process,
    Validate,
    ReportPartial,
    ReportComplete,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Collect => "collect",
            TaskKind::Analyze => "analyze",
            TaskKind::Process => "process",
            TaskKind::Validate => "validate",
            TaskKind::ReportPartial => "report_partial",
            TaskKind::ReportComplete => "report_complete",
        };
        f.write_str(name)
    }
}

/// An immutable unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    id: String,
    kind: TaskKind,
    params: Params,
    priority: u8,
    created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, kind: TaskKind, params: Params) -> Self {
        Self {
            id: id.into(),
            kind,
            params,
            priority: 1,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Look up a single parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Terminal state of an executed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// What an agent hands back after executing a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    task_id: String,
    agent_id: String,
    status: TaskStatus,
    payload: Params,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_seconds: f64,
    completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn completed(task: &Task, agent_id: &str, payload: Params, elapsed_seconds: f64) -> Self {
        Self {
            task_id: task.id.clone(),
            agent_id: agent_id.to_string(),
            status: TaskStatus::Completed,
            payload,
            error: None,
            elapsed_seconds,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(task: &Task, agent_id: &str, error: &AgentError, elapsed_seconds: f64) -> Self {
        Self {
            task_id: task.id.clone(),
            agent_id: agent_id.to_string(),
            status: TaskStatus::Failed,
            payload: Params::new(),
            error: Some(error.to_string()),
            elapsed_seconds,
            completed_at: Utc::now(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn payload(&self) -> &Params {
        &self.payload
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new(
            "T001_data_collection",
            TaskKind::Collect,
            params(json!({"source": "lackawanna"})),
        );
        assert_eq!(task.id(), "T001_data_collection");
        assert_eq!(task.kind(), TaskKind::Collect);
        assert_eq!(task.priority(), 1);
        assert_eq!(task.param("source"), Some(&json!("lackawanna")));
        assert!(task.param("missing").is_none());

        let urgent = task.with_priority(9);
        assert_eq!(urgent.priority(), 9);
    }

    #[test]
    fn test_task_kind_wire_names() {
        assert_eq!(TaskKind::ReportPartial.to_string(), "report_partial");
        assert_eq!(
            serde_json::to_value(TaskKind::ReportComplete).unwrap(),
            json!("report_complete")
        );
    }

    #[test]
    fn test_result_constructors() {
        let task = Task::new("T003_process_appeal_000", TaskKind::Process, Params::new());

        let ok = TaskResult::completed(&task, "processor_001", params(json!({"x": 1})), 0.01);
        assert!(ok.is_completed());
        assert_eq!(ok.task_id(), task.id());
        assert_eq!(ok.agent_id(), "processor_001");
        assert!(ok.error().is_none());

        let failed = TaskResult::failed(&task, "processor_001", &AgentError::UnsupportedTaskKind, 0.0);
        assert_eq!(failed.status(), TaskStatus::Failed);
        assert_eq!(failed.error(), Some("unsupported task kind"));
        assert!(failed.payload().is_empty());
    }
}

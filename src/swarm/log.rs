//! Append-only record of every result produced during one run.

use crate::swarm::task::TaskResult;

#[derive(Debug, Default)]
pub struct ResultLog {
    completed: Vec<TaskResult>,
    failed: Vec<TaskResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TaskResult) {
        if result.is_completed() {
            self.completed.push(result);
        } else {
            self.failed.push(result);
        }
    }

    /// Merge a stage's local buffer after its fan-in barrier.
    pub fn extend(&mut self, results: impl IntoIterator<Item = TaskResult>) {
        for result in results {
            self.record(result);
        }
    }

    pub fn completed(&self) -> &[TaskResult] {
        &self.completed
    }

    pub fn failed(&self) -> &[TaskResult] {
        &self.failed
    }

    pub fn len(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share of recorded results that completed, 0.0 when empty.
    pub fn success_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::swarm::task::{Params, Task, TaskKind};

    #[test]
    fn test_log_partitions_results() {
        let task = Task::new("T003_process_appeal_000", TaskKind::Process, Params::new());
        let mut log = ResultLog::new();
        assert_eq!(log.success_rate(), 0.0);

        log.extend(vec![
            TaskResult::completed(&task, "processor_001", Params::new(), 0.0),
            TaskResult::completed(&task, "processor_002", Params::new(), 0.0),
            TaskResult::failed(&task, "processor_003", &AgentError::Timeout(1.0), 1.0),
        ]);
        log.record(TaskResult::completed(&task, "processor_004", Params::new(), 0.0));

        assert_eq!(log.len(), 4);
        assert_eq!(log.completed().len(), 3);
        assert_eq!(log.failed()[0].agent_id(), "processor_003");
        assert_eq!(log.success_rate(), 0.75);
    }
}

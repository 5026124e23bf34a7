//! Agent pool construction and routing.

use crate::config::SwarmConfig;
use crate::error::DispatchError;
use crate::provider::DatasetProvider;
use crate::report::payload::ReportSettings;
use crate::swarm::agent::{Agent, FetchPolicy};
use std::sync::Arc;
use tracing::info;

/// The fixed set of agents for one started dispatcher.
#[derive(Debug)]
pub struct AgentPool {
    pub collector: Agent,
    pub analyzer: Agent,
    pub processors: Vec<Agent>,
    pub validators: Vec<Agent>,
    pub reporter: Agent,
}

impl AgentPool {
    /// Number of agents, including the three singletons.
    pub fn size(&self) -> usize {
        3 + self.processors.len() + self.validators.len()
    }

    /// Every agent, in id order by role.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        std::iter::once(&self.collector)
            .chain(std::iter::once(&self.analyzer))
            .chain(self.processors.iter())
            .chain(self.validators.iter())
            .chain(std::iter::once(&self.reporter))
    }

    fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        std::iter::once(&mut self.collector)
            .chain(std::iter::once(&mut self.analyzer))
            .chain(self.processors.iter_mut())
            .chain(self.validators.iter_mut())
            .chain(std::iter::once(&mut self.reporter))
    }
}

/// Index of the processor that receives appeal `index` out of `pool` processors.
pub fn route(index: usize, pool: usize) -> usize {
    index % pool.max(1)
}

/// Owns the agent pool for its whole lifetime.
pub struct Dispatcher {
    provider: Arc<dyn DatasetProvider>,
    report_settings: ReportSettings,
    pool: Option<AgentPool>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn DatasetProvider>, report_settings: ReportSettings) -> Self {
        Self {
            provider,
            report_settings,
            pool: None,
        }
    }

    fn check(config: &SwarmConfig) -> Result<(), DispatchError> {
        if config.processor_agents == 0 {
            return Err(DispatchError::InvalidConfig(
                "at least one processor agent is required".to_string(),
            ));
        }
        if config.validator_agents == 0 {
            return Err(DispatchError::InvalidConfig(
                "at least one validator agent is required".to_string(),
            ));
        }
        let threshold = config.validation_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(DispatchError::InvalidConfig(format!(
                "validation_threshold = {} is outside (0, 1]",
                threshold
            )));
        }
        if config.pool_size() > config.max_agents {
            return Err(DispatchError::InvalidConfig(format!(
                "pool of {} agents exceeds max_agents = {}",
                config.pool_size(),
                config.max_agents
            )));
        }
        Ok(())
    }

    /// Build the pool. Rejected while a pool is already running.
    pub fn start(&mut self, config: &SwarmConfig) -> Result<(), DispatchError> {
        if self.pool.is_some() {
            return Err(DispatchError::AlreadyStarted);
        }
        Self::check(config)?;

        let policy = FetchPolicy {
            timeout: config.request_timeout(),
            attempts: config.retries,
            retry_delay: config.retry_delay(),
        };

        let pool = AgentPool {
            collector: Agent::collector("collector_001", self.provider.clone(), policy),
            analyzer: Agent::analyzer("analyzer_001"),
            processors: (1..=config.processor_agents)
                .map(|i| Agent::processor(format!("processor_{:03}", i)))
                .collect(),
            validators: (1..=config.validator_agents)
                .map(|i| {
                    Agent::validator(format!("validator_{:03}", i), config.validation_threshold)
                })
                .collect(),
            reporter: Agent::reporter("reporter_001", self.report_settings.clone()),
        };

        info!(
            "Started agent pool: {} processors, {} validators ({} agents)",
            pool.processors.len(),
            pool.validators.len(),
            pool.size()
        );
        self.pool = Some(pool);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.pool.is_some()
    }

    pub fn pool(&self) -> Result<&AgentPool, DispatchError> {
        self.pool.as_ref().ok_or(DispatchError::NotStarted)
    }

    pub fn pool_mut(&mut self) -> Result<&mut AgentPool, DispatchError> {
        self.pool.as_mut().ok_or(DispatchError::NotStarted)
    }

    /// Take every agent offline and hand the pool back.
    pub fn shutdown(&mut self) -> Option<AgentPool> {
        let mut pool = self.pool.take()?;
        for agent in pool.agents_mut() {
            agent.go_offline();
        }
        info!("Agent pool shut down");
        Some(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dataset;
    use crate::provider::InMemoryProvider;
    use crate::swarm::agent::{AgentRole, AgentStatus};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(InMemoryProvider::new(Dataset::default())),
            ReportSettings::default(),
        )
    }

    #[test]
    fn test_start_builds_sequential_ids() {
        let mut dispatcher = dispatcher();
        let config = SwarmConfig {
            processor_agents: 3,
            validator_agents: 2,
            ..Default::default()
        };
        dispatcher.start(&config).unwrap();

        let ids: Vec<_> = dispatcher
            .pool()
            .unwrap()
            .agents()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "collector_001",
                "analyzer_001",
                "processor_001",
                "processor_002",
                "processor_003",
                "validator_001",
                "validator_002",
                "reporter_001",
            ]
        );
        assert_eq!(dispatcher.pool().unwrap().validators[1].role(), AgentRole::Validator);
    }

    #[test]
    fn test_default_pool_fits_max_agents() {
        let mut dispatcher = dispatcher();
        dispatcher.start(&SwarmConfig::default()).unwrap();
        assert_eq!(dispatcher.pool().unwrap().size(), 14);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut dispatcher = dispatcher();
        dispatcher.start(&SwarmConfig::default()).unwrap();
        assert_eq!(
            dispatcher.start(&SwarmConfig::default()),
            Err(DispatchError::AlreadyStarted)
        );
    }

    #[test]
    fn test_shutdown_then_restart() {
        let mut dispatcher = dispatcher();
        dispatcher.start(&SwarmConfig::default()).unwrap();

        let old = dispatcher.shutdown().unwrap();
        assert!(old.agents().all(|a| a.status() == AgentStatus::Offline));
        assert!(!dispatcher.is_started());
        assert_eq!(dispatcher.pool().err(), Some(DispatchError::NotStarted));
        assert!(dispatcher.shutdown().is_none());

        dispatcher.start(&SwarmConfig::default()).unwrap();
        assert!(dispatcher
            .pool()
            .unwrap()
            .agents()
            .all(|a| a.status() == AgentStatus::Idle));
    }

    #[test]
    fn test_invalid_pools_are_rejected() {
        let mut dispatcher = dispatcher();

        let no_processors = SwarmConfig {
            processor_agents: 0,
            ..Default::default()
        };
        assert!(matches!(
            dispatcher.start(&no_processors),
            Err(DispatchError::InvalidConfig(_))
        ));

        let no_validators = SwarmConfig {
            validator_agents: 0,
            ..Default::default()
        };
        assert!(dispatcher.start(&no_validators).is_err());

        let oversized = SwarmConfig {
            processor_agents: 10,
            validator_agents: 3,
            ..Default::default()
        };
        assert!(dispatcher.start(&oversized).is_err());
        assert!(!dispatcher.is_started());
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let mut dispatcher = dispatcher();

        for threshold in [0.0, -0.5, 1.5, f64::NAN] {
            let config = SwarmConfig {
                validation_threshold: threshold,
                ..Default::default()
            };
            assert!(matches!(
                dispatcher.start(&config),
                Err(DispatchError::InvalidConfig(_))
            ));
        }

        let strictest = SwarmConfig {
            validation_threshold: 1.0,
            ..Default::default()
        };
        dispatcher.start(&strictest).unwrap();
    }

    #[test]
    fn test_route_is_round_robin() {
        let routed: Vec<_> = (0..7).map(|i| route(i, 3)).collect();
        assert_eq!(routed, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(route(5, 0), 0);
    }
}

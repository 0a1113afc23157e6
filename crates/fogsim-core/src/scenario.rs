//! Scenario grid enumeration and batch execution.
//!
//! A scenario is an immutable (device count, policy, architecture) tuple.
//! Each instance builds its own manager, topology, and workload from the
//! shared configuration, so instances are independent and the batch runner
//! can fan them out across threads.

use crate::config::SimConfig;
use crate::metrics::ScenarioReport;
use crate::simulation::SimulationManager;
use fogsim_policies::{policy_by_name, Architecture};
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Unknown policy '{0}'")]
    UnknownPolicy(String),
    #[error("Unknown architecture '{0}'")]
    UnknownArchitecture(String),
}

/// One point of the scenario grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub device_count: usize,
    pub policy: String,
    pub architecture: Architecture,
}

/// Enumerate the full grid declared in the configuration, in declaration
/// order: device counts outermost, then policies, then architectures.
pub fn enumerate_scenarios(config: &SimConfig) -> Result<Vec<Scenario>, ScenarioError> {
    let mut scenarios = Vec::new();
    for &device_count in &config.scenarios.device_counts {
        for policy in &config.scenarios.policies {
            for arch in &config.scenarios.architectures {
                let architecture = Architecture::from_name(arch)
                    .ok_or_else(|| ScenarioError::UnknownArchitecture(arch.clone()))?;
                scenarios.push(Scenario {
                    device_count,
                    policy: policy.clone(),
                    architecture,
                });
            }
        }
    }
    Ok(scenarios)
}

/// Run a single scenario instance to completion.
pub fn run_scenario(config: &SimConfig, scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    let policy = policy_by_name(&scenario.policy)
        .ok_or_else(|| ScenarioError::UnknownPolicy(scenario.policy.clone()))?;
    info!(
        policy = %scenario.policy,
        architecture = scenario.architecture.name(),
        devices = scenario.device_count,
        "running scenario"
    );
    let manager = SimulationManager::new(
        config,
        scenario.device_count,
        policy,
        scenario.architecture,
    );
    Ok(manager.run())
}

/// Run the whole grid, instances in parallel. Reports come back in grid
/// order regardless of which instance finishes first.
pub fn run_batch(config: &SimConfig) -> Result<Vec<ScenarioReport>, ScenarioError> {
    let scenarios = enumerate_scenarios(config)?;
    scenarios
        .par_iter()
        .map(|scenario| run_scenario(config, scenario))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    #[test]
    fn test_enumerate_grid_order() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        let scenarios = enumerate_scenarios(&config).unwrap();
        // 2 device counts x 2 policies x 1 architecture
        assert_eq!(scenarios.len(), 4);
        assert_eq!(scenarios[0].device_count, 10);
        assert_eq!(scenarios[0].policy, "round_robin");
        assert_eq!(scenarios[1].policy, "trade_off");
        assert_eq!(scenarios[2].device_count, 20);
    }

    #[test]
    fn test_unknown_policy_is_reported() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        let scenario = Scenario {
            device_count: 2,
            policy: "telepathy".to_string(),
            architecture: Architecture::All,
        };
        assert!(matches!(
            run_scenario(&config, &scenario),
            Err(ScenarioError::UnknownPolicy(_))
        ));
    }
}

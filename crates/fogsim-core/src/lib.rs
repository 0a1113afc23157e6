//! FogSim — Discrete-event simulator for edge/fog/cloud task offloading.
//!
//! This crate provides the core simulation engine that models a three-tier
//! computing infrastructure (mist devices, edge data centers, the cloud), a
//! bandwidth-shared network between them, and the lifecycle of offloaded
//! tasks. Orchestration policies from `fogsim-policies` are plugged in to
//! pick an execution destination for each task.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │ Workload │────▶│  Manager  │────▶│   Metrics    │
//! │Generation│     │ (Events)  │     │  Collection  │
//! └──────────┘     └─────┬─────┘     └──────────────┘
//!                        │
//!                ┌───────┴───────┐
//!                │    Policy     │
//!                │ (Placement)   │
//!                └───────┬───────┘
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │  Cloud   │  │ Edge DCs │  │ Devices  │
//!    │  Links   │  │  Links   │  │  Links   │
//!    │  Queue   │  │  Queue   │  │  Queue   │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```

pub mod clock;
pub mod config;
pub mod kernel;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod simulation;
pub mod task;
pub mod topology;
pub mod transfer;
pub mod workload;

// Re-export key types for convenience.
pub use clock::SimClock;
pub use config::SimConfig;
pub use kernel::{EventQueue, SimEvent};
pub use metrics::{MetricsCollector, ScenarioReport};
pub use node::{ComputingNode, NodeId, NodeKind};
pub use scenario::{enumerate_scenarios, run_batch, run_scenario, Scenario, ScenarioError};
pub use simulation::SimulationManager;
pub use task::{Task, TaskFailureReason, TaskStatus};
pub use topology::{LinkType, NetworkLink, Topology};
pub use transfer::{Transfer, TransferEngine, TransferKind};
pub use workload::generate_tasks;

/// Run a comparison of multiple policies over one scenario shape.
pub fn compare_policies(
    config: &SimConfig,
    device_count: usize,
    architecture: fogsim_policies::Architecture,
    policy_names: &[&str],
) -> Vec<ScenarioReport> {
    policy_names
        .iter()
        .filter_map(|name| {
            let scenario = Scenario {
                device_count,
                policy: name.to_string(),
                architecture,
            };
            run_scenario(config, &scenario).ok()
        })
        .collect()
}

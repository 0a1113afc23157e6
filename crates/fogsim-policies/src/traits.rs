//! Orchestration policy trait definitions.
//!
//! All placement policies implement the [`OrchestrationPolicy`] trait, which
//! receives task information and node snapshots to decide where an offloaded
//! task should execute.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tier a computing node belongs to, by increasing distance from the task
/// origin: mist (the devices themselves), edge data centers, and the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeTier {
    Cloud,
    Edge,
    Mist,
}

/// Which tiers a scenario allows as offloading destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    CloudOnly,
    EdgeOnly,
    MistOnly,
    EdgeAndCloud,
    MistAndCloud,
    MistAndEdge,
    All,
}

impl Architecture {
    /// Parse an architecture name as it appears in scenario configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cloud_only" => Some(Architecture::CloudOnly),
            "edge_only" => Some(Architecture::EdgeOnly),
            "mist_only" => Some(Architecture::MistOnly),
            "edge_and_cloud" => Some(Architecture::EdgeAndCloud),
            "mist_and_cloud" => Some(Architecture::MistAndCloud),
            "mist_and_edge" => Some(Architecture::MistAndEdge),
            "all" => Some(Architecture::All),
            _ => None,
        }
    }

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Architecture::CloudOnly => "cloud_only",
            Architecture::EdgeOnly => "edge_only",
            Architecture::MistOnly => "mist_only",
            Architecture::EdgeAndCloud => "edge_and_cloud",
            Architecture::MistAndCloud => "mist_and_cloud",
            Architecture::MistAndEdge => "mist_and_edge",
            Architecture::All => "all",
        }
    }

    /// Whether nodes of the given tier may receive tasks under this
    /// architecture.
    pub fn allows(&self, tier: NodeTier) -> bool {
        match self {
            Architecture::CloudOnly => tier == NodeTier::Cloud,
            Architecture::EdgeOnly => tier == NodeTier::Edge,
            Architecture::MistOnly => tier == NodeTier::Mist,
            Architecture::EdgeAndCloud => tier != NodeTier::Mist,
            Architecture::MistAndCloud => tier != NodeTier::Edge,
            Architecture::MistAndEdge => tier != NodeTier::Cloud,
            Architecture::All => true,
        }
    }
}

/// Read-only snapshot of a computing node's state, provided to policies.
///
/// This is the policy crate's view of a node — it carries only what a
/// placement decision needs, not the full simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: usize,
    pub tier: NodeTier,
    /// Cores not currently executing a task.
    pub available_cores: u32,
    pub total_cores: u32,
    pub mips_per_core: f64,
    /// Tasks waiting for a free core.
    pub queue_len: usize,
    pub available_ram_mb: f64,
    pub available_storage_mb: f64,
    /// Remaining battery charge as a fraction of capacity, if battery-powered.
    pub battery_level: Option<f64>,
    /// Estimated one-way propagation latency from the task's device, seconds.
    pub latency_to_device_s: f64,
    pub alive: bool,
    pub tasks_in_flight: u64,
}

/// Information about the task being placed.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: u64,
    pub app: usize,
    /// Id of the device that generated the task.
    pub device: usize,
    pub length_mi: f64,
    pub required_cores: u32,
    pub max_latency_s: f64,
    pub container_mb: f64,
}

/// The core orchestration policy trait.
///
/// Implement this trait to create custom placement strategies. The simulator
/// calls [`select_destination`] once per task at the routing checkpoint, with
/// the candidate list already filtered by the scenario's architecture.
pub trait OrchestrationPolicy: Send + Sync {
    /// Pick a destination node id from the candidates, or `None` when no
    /// candidate is acceptable (the task then fails with
    /// insufficient-resources).
    fn select_destination(&mut self, task: &TaskInfo, candidates: &[NodeSnapshot])
        -> Option<usize>;

    /// Human-readable name for reports.
    fn name(&self) -> &str;

    /// Optional: policy-specific metrics to include in scenario reports.
    fn custom_metrics(&self) -> HashMap<String, f64> {
        HashMap::new()
    }
}

/// Filter candidates to nodes that are alive and allowed by the architecture.
pub fn candidates_for(architecture: Architecture, nodes: &[NodeSnapshot]) -> Vec<NodeSnapshot> {
    nodes
        .iter()
        .filter(|n| n.alive && architecture.allows(n.tier))
        .cloned()
        .collect()
}

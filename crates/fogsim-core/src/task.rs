//! Offloadable task model.
//!
//! Each [`Task`] represents one computational job generated on an edge
//! device, flowing through a strict phase sequence: generated, sent to the
//! orchestrator, routed to a destination, executed, results returned. Phase
//! timestamps are recorded as the task advances; exactly one failure reason
//! (or none) is set by the time it completes.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

pub type TaskId = u64;

/// Lifecycle phase of a task, strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Generated,
    SentToOrchestrator,
    RoutedToDestination,
    Executing,
    ResultReturning,
    Finished,
    Failed,
}

/// Why a task failed, if it did. Mutually exclusive: the first predicate to
/// hold at a lifecycle checkpoint wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFailureReason {
    None,
    Latency,
    DeviceDead,
    Mobility,
    InsufficientResources,
}

/// A single offloadable task flowing through the simulated system.
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Index into the application catalog.
    pub app: usize,
    /// Device that generated the task.
    pub device: NodeId,
    /// Node chosen by the orchestrator, once routed.
    pub destination: Option<NodeId>,
    /// CPU length in million instructions.
    pub length_mi: f64,
    /// Cores the task occupies while executing.
    pub required_cores: u32,
    /// Offloading request size in bits.
    pub request_bits: f64,
    /// Result size in bits.
    pub result_bits: f64,
    /// Container image size in bits (fetched once per destination).
    pub container_bits: f64,
    /// RAM the container needs at the destination, MB.
    pub container_ram_mb: f64,
    /// Storage the container needs at the destination, MB.
    pub container_storage_mb: f64,
    /// Maximum tolerable delay from generation to result, seconds.
    pub max_latency_s: f64,
    /// Simulated time the task was generated.
    pub generation_time: f64,
    // Phase timestamps, set as the task advances.
    pub sent_time: Option<f64>,
    pub received_time: Option<f64>,
    pub exec_start_time: Option<f64>,
    pub exec_end_time: Option<f64>,
    pub completion_time: Option<f64>,
    pub status: TaskStatus,
    pub failure: TaskFailureReason,
}

impl Task {
    /// Total elapsed delay since generation.
    pub fn total_delay(&self, now: f64) -> f64 {
        now - self.generation_time
    }

    /// Time spent on a core, if execution ran.
    pub fn execution_time(&self) -> Option<f64> {
        match (self.exec_start_time, self.exec_end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Time spent waiting between arrival at the destination and the start
    /// of execution.
    pub fn waiting_time(&self) -> Option<f64> {
        match (self.received_time, self.exec_start_time) {
            (Some(received), Some(start)) => Some(start - received),
            _ => None,
        }
    }

    /// Delay attributable to the network: everything that is neither
    /// waiting in an execution queue nor running on a core.
    pub fn network_time(&self) -> Option<f64> {
        let total = self.completion_time? - self.generation_time;
        let exec = self.execution_time().unwrap_or(0.0);
        let wait = self.waiting_time().unwrap_or(0.0);
        Some((total - exec - wait).max(0.0))
    }

    pub fn is_finished(&self) -> bool {
        self.status == TaskStatus::Finished
    }
}

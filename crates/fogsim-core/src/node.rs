//! Computing nodes: cloud, edge data centers, and edge devices.
//!
//! One flat [`ComputingNode`] struct covers all three tiers, composed of
//! independent facets (execution queue, energy model, mobility, container
//! cache) instead of an inheritance chain. A node that lacks a facet simply
//! carries the neutral value (`Mobility::Stationary`, `battery: None`).

use crate::task::TaskId;
use fogsim_policies::{NodeSnapshot, NodeTier};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Identifier of a computing node; index into the simulation roster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

/// Tier of a computing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Cloud,
    EdgeDatacenter,
    EdgeDevice,
}

impl NodeKind {
    pub fn tier(&self) -> NodeTier {
        match self {
            NodeKind::Cloud => NodeTier::Cloud,
            NodeKind::EdgeDatacenter => NodeTier::Edge,
            NodeKind::EdgeDevice => NodeTier::Mist,
        }
    }
}

/// Planar position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn distance_to(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// How a node moves. Infrastructure is always `Stationary`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mobility {
    Stationary,
    /// Constant-velocity motion, meters per second per axis.
    Linear { vx: f64, vy: f64 },
}

/// Finite energy store for battery-powered devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub capacity_j: f64,
    pub consumed_j: f64,
}

impl Battery {
    pub fn new(capacity_j: f64) -> Self {
        Self {
            capacity_j,
            consumed_j: 0.0,
        }
    }

    /// Remaining charge in [0, 1].
    pub fn level(&self) -> f64 {
        (1.0 - self.consumed_j / self.capacity_j).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.consumed_j >= self.capacity_j
    }
}

/// Static and dynamic power draw of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyModel {
    /// Watts drawn while powered on, regardless of load.
    pub idle_w: f64,
    /// Additional watts drawn per busy core.
    pub busy_w_per_core: f64,
    /// Present only for battery-powered devices.
    pub battery: Option<Battery>,
}

/// A task waiting for a free core.
#[derive(Debug, Clone, Copy)]
struct QueuedTask {
    task: TaskId,
    length_mi: f64,
    cores: u32,
}

/// Result of offering a task to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    /// Execution started; `ExecutionFinished` is due at `finish_time`.
    Started { finish_time: f64 },
    /// All cores busy; the task was appended to the FIFO queue.
    Queued,
}

/// One simulated machine.
#[derive(Debug, Clone)]
pub struct ComputingNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub cores: u32,
    pub available_cores: u32,
    pub mips_per_core: f64,
    pub ram_mb: f64,
    pub available_ram_mb: f64,
    pub storage_mb: f64,
    pub available_storage_mb: f64,
    pub energy: EnergyModel,
    pub location: Location,
    pub mobility: Mobility,
    /// Radio range in meters; only meaningful for devices.
    pub range_m: f64,
    pub alive: bool,
    pub death_time: Option<f64>,
    queue: VecDeque<QueuedTask>,
    /// Application ids whose container image is cached locally.
    containers: HashSet<usize>,
    pub tasks_executed: u64,
    /// Core-seconds spent executing, for utilization reporting.
    pub busy_core_seconds: f64,
    pub energy_consumed_j: f64,
}

impl ComputingNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: NodeId,
        kind: NodeKind,
        cores: u32,
        mips_per_core: f64,
        ram_mb: f64,
        storage_mb: f64,
        energy: EnergyModel,
        location: Location,
        mobility: Mobility,
        range_m: f64,
    ) -> Self {
        Self {
            id,
            kind,
            cores,
            available_cores: cores,
            mips_per_core,
            ram_mb,
            available_ram_mb: ram_mb,
            storage_mb,
            available_storage_mb: storage_mb,
            energy,
            location,
            mobility,
            range_m,
            alive: true,
            death_time: None,
            queue: VecDeque::new(),
            containers: HashSet::new(),
            tasks_executed: 0,
            busy_core_seconds: 0.0,
            energy_consumed_j: 0.0,
        }
    }

    /// Seconds a task of the given length occupies its cores.
    pub fn execution_time_s(&self, length_mi: f64) -> f64 {
        length_mi / self.mips_per_core
    }

    /// Offer a task for execution. Dead nodes never reach here; callers
    /// check `alive` at the routing checkpoint.
    ///
    /// Dynamic CPU energy is charged in full at dispatch rather than
    /// accrued over the run. The total is identical and it keeps energy
    /// mutation out of the completion path.
    pub fn submit_task(
        &mut self,
        task: TaskId,
        length_mi: f64,
        cores: u32,
        now: f64,
    ) -> SubmitOutcome {
        debug_assert!(self.alive, "task submitted to dead node {:?}", self.id);
        if self.available_cores >= cores {
            self.start(task, length_mi, cores, now)
        } else {
            self.queue.push_back(QueuedTask {
                task,
                length_mi,
                cores,
            });
            SubmitOutcome::Queued
        }
    }

    fn start(&mut self, _task: TaskId, length_mi: f64, cores: u32, now: f64) -> SubmitOutcome {
        debug_assert!(self.available_cores >= cores);
        self.available_cores -= cores;
        let exec_s = self.execution_time_s(length_mi);
        self.busy_core_seconds += exec_s * cores as f64;
        self.consume_energy(self.energy.busy_w_per_core * cores as f64 * exec_s);
        SubmitOutcome::Started {
            finish_time: now + exec_s,
        }
    }

    /// Release cores after a task finishes and start the next queued task
    /// if one fits. Returns the started task and its finish time.
    pub fn finish_task(&mut self, cores: u32, now: f64) -> Option<(TaskId, f64)> {
        self.available_cores += cores;
        debug_assert!(
            self.available_cores <= self.cores,
            "core count overflow on {:?}",
            self.id
        );
        self.tasks_executed += 1;

        let next = *self.queue.front()?;
        if self.available_cores < next.cores || !self.alive {
            return None;
        }
        self.queue.pop_front();
        match self.start(next.task, next.length_mi, next.cores, now) {
            SubmitOutcome::Started { finish_time } => Some((next.task, finish_time)),
            SubmitOutcome::Queued => unreachable!(),
        }
    }

    /// Tasks still waiting for a core. Used when a node dies mid-queue.
    pub fn drain_queue(&mut self) -> Vec<TaskId> {
        self.queue.drain(..).map(|q| q.task).collect()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Accrue static energy for one update interval. Returns `true` when
    /// this accrual emptied the battery; the caller marks the death.
    pub fn accrue_idle_energy(&mut self, interval_s: f64) -> bool {
        if !self.alive {
            return false;
        }
        self.consume_energy(self.energy.idle_w * interval_s);
        match &self.energy.battery {
            Some(battery) => battery.is_empty(),
            None => false,
        }
    }

    fn consume_energy(&mut self, joules: f64) {
        self.energy_consumed_j += joules;
        if let Some(battery) = &mut self.energy.battery {
            battery.consumed_j += joules;
        }
    }

    /// Whether dynamic draw has emptied the battery of a still-live node.
    /// The caller marks the death, mirroring `accrue_idle_energy`.
    pub fn battery_exhausted(&self) -> bool {
        self.alive
            && self
                .energy
                .battery
                .as_ref()
                .map_or(false, |b| b.is_empty())
    }

    /// Mark the node dead. Terminal: it accepts no tasks and initiates no
    /// transfers afterwards, but stays queryable for reporting.
    pub fn mark_dead(&mut self, now: f64) {
        if self.alive {
            self.alive = false;
            self.death_time = Some(now);
        }
    }

    /// Advance location by one mobility tick.
    pub fn advance_location(&mut self, dt_s: f64) {
        if let Mobility::Linear { vx, vy } = self.mobility {
            self.location.x += vx * dt_s;
            self.location.y += vy * dt_s;
        }
    }

    pub fn in_range_of(&self, other: &Location) -> bool {
        self.location.distance_to(other) <= self.range_m
    }

    // Container cache.

    pub fn has_container(&self, app: usize) -> bool {
        self.containers.contains(&app)
    }

    /// Whether the node has room for the container of `app`.
    pub fn can_host(&self, app: usize, ram_mb: f64, storage_mb: f64) -> bool {
        if self.has_container(app) {
            return true;
        }
        self.available_ram_mb >= ram_mb && self.available_storage_mb >= storage_mb
    }

    /// Record a fetched container image; storage and RAM are held for the
    /// remainder of the run.
    pub fn cache_container(&mut self, app: usize, ram_mb: f64, storage_mb: f64) {
        if self.containers.insert(app) {
            self.available_ram_mb -= ram_mb;
            self.available_storage_mb -= storage_mb;
        }
    }

    pub fn battery_level(&self) -> Option<f64> {
        self.energy.battery.as_ref().map(|b| b.level())
    }

    /// Mean fraction of cores kept busy over `elapsed_s`.
    pub fn cpu_utilization(&self, elapsed_s: f64) -> f64 {
        if elapsed_s <= 0.0 {
            return 0.0;
        }
        self.busy_core_seconds / (self.cores as f64 * elapsed_s)
    }

    /// Read-only view handed to orchestration policies.
    pub fn snapshot(&self, latency_to_device_s: f64) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.0,
            tier: self.kind.tier(),
            available_cores: self.available_cores,
            total_cores: self.cores,
            mips_per_core: self.mips_per_core,
            queue_len: self.queue.len(),
            available_ram_mb: self.available_ram_mb,
            available_storage_mb: self.available_storage_mb,
            battery_level: self.battery_level(),
            latency_to_device_s,
            alive: self.alive,
            tasks_in_flight: (self.cores - self.available_cores) as u64 + self.queue.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_node(cores: u32) -> ComputingNode {
        ComputingNode::new(
            NodeId(1),
            NodeKind::EdgeDatacenter,
            cores,
            1000.0,
            8192.0,
            65_536.0,
            EnergyModel {
                idle_w: 50.0,
                busy_w_per_core: 10.0,
                battery: None,
            },
            Location { x: 0.0, y: 0.0 },
            Mobility::Stationary,
            0.0,
        )
    }

    fn battery_device(capacity_j: f64) -> ComputingNode {
        ComputingNode::new(
            NodeId(2),
            NodeKind::EdgeDevice,
            2,
            500.0,
            1024.0,
            4096.0,
            EnergyModel {
                idle_w: 1.0,
                busy_w_per_core: 2.0,
                battery: Some(Battery::new(capacity_j)),
            },
            Location { x: 10.0, y: 0.0 },
            Mobility::Linear { vx: 5.0, vy: 0.0 },
            100.0,
        )
    }

    #[test]
    fn test_submit_starts_when_core_free() {
        let mut node = edge_node(1);
        let outcome = node.submit_task(1, 2000.0, 1, 0.0);
        assert_eq!(outcome, SubmitOutcome::Started { finish_time: 2.0 });
        assert_eq!(node.available_cores, 0);
    }

    #[test]
    fn test_submit_queues_when_saturated() {
        let mut node = edge_node(1);
        node.submit_task(1, 1000.0, 1, 0.0);
        assert_eq!(node.submit_task(2, 1000.0, 1, 0.0), SubmitOutcome::Queued);
        assert_eq!(node.queue_len(), 1);

        // Finishing the first task starts the queued one.
        let next = node.finish_task(1, 1.0);
        assert_eq!(next, Some((2, 2.0)));
        assert_eq!(node.queue_len(), 0);
        assert_eq!(node.available_cores, 0);
    }

    #[test]
    fn test_core_conservation() {
        let mut node = edge_node(4);
        node.submit_task(1, 1000.0, 3, 0.0);
        node.submit_task(2, 1000.0, 2, 0.0); // queued, only 1 free
        assert_eq!(node.available_cores, 1);
        let next = node.finish_task(3, 1.0);
        assert!(next.is_some());
        assert_eq!(node.available_cores, 2);
    }

    #[test]
    fn test_dynamic_energy_charged_at_dispatch() {
        let mut node = edge_node(1);
        node.submit_task(1, 2000.0, 1, 0.0);
        // 2s at 10W busy draw, charged up front.
        assert_eq!(node.energy_consumed_j, 20.0);
    }

    #[test]
    fn test_battery_death_on_idle_drain() {
        let mut device = battery_device(3.0);
        assert!(!device.accrue_idle_energy(2.0));
        assert!(device.accrue_idle_energy(2.0));
        device.mark_dead(4.0);
        assert!(!device.alive);
        assert_eq!(device.death_time, Some(4.0));
        assert_eq!(device.battery_level(), Some(0.0));
    }

    #[test]
    fn test_dispatch_draw_can_exhaust_battery() {
        let mut device = battery_device(3.0);
        // 1000 MI at 500 MIPS is 2s on one core at 2W busy draw: 4J > 3J.
        let outcome = device.submit_task(1, 1000.0, 1, 0.0);
        assert!(matches!(outcome, SubmitOutcome::Started { .. }));
        assert!(device.battery_exhausted());
        device.mark_dead(0.0);
        assert!(!device.battery_exhausted());
    }

    #[test]
    fn test_dead_node_stops_accruing() {
        let mut device = battery_device(10.0);
        device.mark_dead(1.0);
        assert!(!device.accrue_idle_energy(5.0));
        assert_eq!(device.energy_consumed_j, 0.0);
    }

    #[test]
    fn test_mobility_advances_location() {
        let mut device = battery_device(1000.0);
        device.advance_location(2.0);
        assert_eq!(device.location, Location { x: 20.0, y: 0.0 });
        assert!(device.in_range_of(&Location { x: 100.0, y: 0.0 }));
        assert!(!device.in_range_of(&Location { x: 200.0, y: 0.0 }));
    }

    #[test]
    fn test_container_cache() {
        let mut node = edge_node(1);
        assert!(!node.has_container(3));
        assert!(node.can_host(3, 512.0, 100.0));
        node.cache_container(3, 512.0, 100.0);
        assert!(node.has_container(3));
        assert_eq!(node.available_ram_mb, 8192.0 - 512.0);
        // Caching twice holds resources once.
        node.cache_container(3, 512.0, 100.0);
        assert_eq!(node.available_ram_mb, 8192.0 - 512.0);
        assert!(!node.can_host(4, 9000.0, 100.0));
    }

    #[test]
    fn test_drain_queue_on_death() {
        let mut node = edge_node(1);
        node.submit_task(1, 1000.0, 1, 0.0);
        node.submit_task(2, 1000.0, 1, 0.0);
        node.submit_task(3, 1000.0, 1, 0.0);
        node.mark_dead(0.5);
        assert_eq!(node.drain_queue(), vec![2, 3]);
    }
}

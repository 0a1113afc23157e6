//! The simulation manager: event dispatch and the task lifecycle.
//!
//! [`SimulationManager`] owns the kernel, topology, transfer engine, node
//! roster, task table, orchestration policy, and metrics collector for one
//! scenario instance. It drives every task through the offloading state
//! machine: generation, request transfer to the orchestrator, placement,
//! optional container fetch, execution, and result return.
//!
//! Failure checkpoints apply a fixed predicate order, first hit wins:
//! device death, insufficient resources, mobility disconnection, latency
//! budget. A task failure is data, never an error; a run always finishes
//! and reports, even at a 100% failure rate.

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::kernel::{EntityRegistry, EventQueue, SimEvent};
use crate::metrics::{MetricsCollector, ScenarioReport, TaskRecord};
use crate::node::{
    Battery, ComputingNode, EnergyModel, Location, Mobility, NodeId, NodeKind, SubmitOutcome,
};
use crate::task::{Task, TaskFailureReason, TaskId, TaskStatus};
use crate::topology::{parse_link_type, LinkType, Topology};
use crate::transfer::{BeginOutcome, TransferEngine, TransferId, TransferKind};
use crate::workload::generate_tasks;
use fogsim_policies::{candidates_for, Architecture, NodeSnapshot, OrchestrationPolicy, TaskInfo};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// One fully-built scenario instance, ready to run.
pub struct SimulationManager {
    clock: SimClock,
    queue: EventQueue,
    registry: EntityRegistry,
    topology: Topology,
    nodes: Vec<ComputingNode>,
    tasks: Vec<Task>,
    policy: Box<dyn OrchestrationPolicy>,
    architecture: Architecture,
    engine: TransferEngine,
    collector: MetricsCollector,

    orchestrator: NodeId,
    cloud: NodeId,
    edge_dcs: Vec<NodeId>,
    devices: Vec<NodeId>,

    duration_s: f64,
    update_interval_s: f64,
    coverage_m: f64,
    scenario_name: String,
    architecture_name: String,
    device_count: usize,

    /// Container images currently in flight, keyed by (destination, app).
    fetching: HashSet<(NodeId, usize)>,
    /// Tasks parked at their destination until the container arrives.
    waiting_for_container: HashMap<(NodeId, usize), Vec<TaskId>>,
    /// Tasks whose final record has been emitted.
    recorded: Vec<bool>,
}

impl SimulationManager {
    /// Build one scenario instance from the configuration. Node roster,
    /// topology, and the full workload are materialized before the loop
    /// starts; nothing about the setup changes afterwards except through
    /// events.
    pub fn new(
        config: &SimConfig,
        device_count: usize,
        policy: Box<dyn OrchestrationPolicy>,
        architecture: Architecture,
    ) -> Self {
        let mut registry = EntityRegistry::new();
        registry.register("manager");

        let mut nodes = Vec::new();
        let mut topology = Topology::new();
        let area = config.simulation.area_m;

        // Cloud sits at the center of the area; its coordinates only matter
        // for range checks, which it always passes.
        let cloud = NodeId(0);
        nodes.push(ComputingNode::new(
            cloud,
            NodeKind::Cloud,
            config.cloud.host.cores,
            config.cloud.host.mips_per_core,
            config.cloud.host.ram_mb,
            config.cloud.host.storage_mb,
            EnergyModel {
                idle_w: config.cloud.host.idle_w,
                busy_w_per_core: config.cloud.host.busy_w_per_core,
                battery: None,
            },
            Location {
                x: area / 2.0,
                y: area / 2.0,
            },
            Mobility::Stationary,
            f64::INFINITY,
        ));
        registry.register("cloud");
        topology.add_infrastructure_node(cloud);

        let mut edge_dcs = Vec::new();
        if let Some(host) = &config.edge_datacenters.host {
            for (i, loc) in config.edge_datacenters.locations.iter().enumerate() {
                let id = NodeId(nodes.len());
                nodes.push(ComputingNode::new(
                    id,
                    NodeKind::EdgeDatacenter,
                    host.cores,
                    host.mips_per_core,
                    host.ram_mb,
                    host.storage_mb,
                    EnergyModel {
                        idle_w: host.idle_w,
                        busy_w_per_core: host.busy_w_per_core,
                        battery: None,
                    },
                    Location { x: loc.x, y: loc.y },
                    Mobility::Stationary,
                    config.edge_datacenters.coverage_m,
                ));
                registry.register(format!("edge-dc-{i}"));
                topology.add_infrastructure_node(id);
                edge_dcs.push(id);
            }
        }

        // Backbone: WAN uplink per data center, MAN mesh between them.
        let wan = &config.network.wan;
        let man = &config.network.man;
        for &dc in &edge_dcs {
            for (from, to) in [(dc, cloud), (cloud, dc)] {
                topology.add_backbone_link(
                    from,
                    to,
                    LinkType::Wan,
                    wan.bandwidth_bps(),
                    wan.latency_s,
                    wan.energy_per_bit_j(),
                );
            }
        }
        for i in 0..edge_dcs.len() {
            for j in (i + 1)..edge_dcs.len() {
                for (from, to) in [(edge_dcs[i], edge_dcs[j]), (edge_dcs[j], edge_dcs[i])] {
                    topology.add_backbone_link(
                        from,
                        to,
                        LinkType::Man,
                        man.bandwidth_bps(),
                        man.latency_s,
                        man.energy_per_bit_j(),
                    );
                }
            }
        }
        topology.compute_backbone_paths();

        // Devices: random placement and heading from the placement stream.
        let mut rng = ChaCha8Rng::seed_from_u64(config.simulation.seed);
        let spec = &config.edge_devices;
        let access = &config.network.access;
        let access_type =
            parse_link_type(&access.link_type).unwrap_or(LinkType::Wifi);
        let mut devices = Vec::new();
        for i in 0..device_count {
            let id = NodeId(nodes.len());
            let location = Location {
                x: rng.gen_range(0.0..area),
                y: rng.gen_range(0.0..area),
            };
            let mobility = if spec.speed_m_s > 0.0 {
                let heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                Mobility::Linear {
                    vx: spec.speed_m_s * heading.cos(),
                    vy: spec.speed_m_s * heading.sin(),
                }
            } else {
                Mobility::Stationary
            };
            nodes.push(ComputingNode::new(
                id,
                NodeKind::EdgeDevice,
                spec.host.cores,
                spec.host.mips_per_core,
                spec.host.ram_mb,
                spec.host.storage_mb,
                EnergyModel {
                    idle_w: spec.host.idle_w,
                    busy_w_per_core: spec.host.busy_w_per_core,
                    battery: spec.battery_capacity_wh.map(|wh| Battery::new(wh * 3600.0)),
                },
                location,
                mobility,
                spec.range_m,
            ));
            registry.register(format!("device-{i}"));
            topology.add_device(
                id,
                access_type,
                access.bandwidth_bps(),
                access.latency_s,
                access.nanojoules_per_bit_up * 1e-9,
                access.nanojoules_per_bit_down * 1e-9,
            );
            devices.push(id);
        }

        let orchestrator = match architecture {
            Architecture::CloudOnly => cloud,
            _ => edge_dcs.first().copied().unwrap_or(cloud),
        };

        let tasks = generate_tasks(
            config,
            &devices,
            config.simulation.seed.wrapping_add(1),
        );
        let recorded = vec![false; tasks.len()];

        let mut manager = Self {
            clock: SimClock::new(),
            queue: EventQueue::new(),
            registry,
            topology,
            nodes,
            tasks,
            policy,
            architecture,
            engine: TransferEngine::new(),
            collector: MetricsCollector::new(),
            orchestrator,
            cloud,
            edge_dcs,
            devices,
            duration_s: config.simulation.duration_s,
            update_interval_s: config.simulation.update_interval_s,
            coverage_m: config.edge_datacenters.coverage_m,
            scenario_name: config.simulation.name.clone(),
            architecture_name: architecture.name().to_string(),
            device_count,
            fetching: HashSet::new(),
            waiting_for_container: HashMap::new(),
            recorded,
        };
        for &device in &manager.devices.clone() {
            manager.update_attachment(device, 0.0);
        }
        manager
    }

    /// Run the event loop to the configured horizon and aggregate.
    pub fn run(mut self) -> ScenarioReport {
        debug!(
            policy = self.policy.name(),
            architecture = %self.architecture_name,
            devices = self.device_count,
            tasks = self.tasks.len(),
            "scenario starts"
        );
        self.registry.seed_start_events(&mut self.queue);

        while let Some((time, event)) = self.queue.pop() {
            if time > self.duration_s {
                break;
            }
            self.clock.advance_to(time);
            self.handle_event(time, event);
        }
        self.clock.advance_to(self.duration_s);

        // Tasks still in flight at the horizon are reported as they stand.
        for id in 0..self.tasks.len() {
            if !self.recorded[id] {
                self.recorded[id] = true;
                self.collector.record(TaskRecord::from_task(&self.tasks[id]));
            }
        }

        self.collector.aggregate(
            &self.scenario_name,
            self.policy.name(),
            &self.architecture_name,
            self.device_count,
            self.duration_s,
            &self.nodes,
            &self.topology,
            self.policy.custom_metrics(),
        )
    }

    fn handle_event(&mut self, now: f64, event: SimEvent) {
        match event {
            SimEvent::Init(entity) => {
                trace!(entity = self.registry.name(entity), "entity starts");
                if entity == 0 {
                    self.on_simulation_start(now);
                }
            }
            SimEvent::TaskGenerated(task) => self.on_task_generated(task, now),
            SimEvent::TransferFlowStart(id) => {
                self.engine
                    .on_flow_start(&mut self.topology, &mut self.queue, now, id);
            }
            SimEvent::TransferCompleted(id) => self.on_transfer_completed(id, now),
            SimEvent::ExecutionFinished { node, task } => {
                self.on_execution_finished(node, task, now)
            }
            SimEvent::EnergyTick => self.on_energy_tick(now),
            SimEvent::MobilityTick => self.on_mobility_tick(now),
        }
    }

    /// The manager's own start hook: inject the workload and kick off the
    /// periodic updates.
    fn on_simulation_start(&mut self, now: f64) {
        for task in &self.tasks {
            self.queue
                .schedule_at(task.generation_time, SimEvent::TaskGenerated(task.id));
        }
        let first_tick = now + self.update_interval_s;
        if first_tick <= self.duration_s {
            self.queue.schedule_at(first_tick, SimEvent::EnergyTick);
            self.queue.schedule_at(first_tick, SimEvent::MobilityTick);
        }
    }

    // Task lifecycle.

    /// Checkpoint one: the task leaves its device for the orchestrator.
    fn on_task_generated(&mut self, task_id: TaskId, now: f64) {
        let device = self.tasks[task_id as usize].device;
        if !self.nodes[device.0].alive || !self.nodes[self.orchestrator.0].alive {
            self.fail_task(task_id, TaskFailureReason::DeviceDead, now);
            return;
        }

        let task = &mut self.tasks[task_id as usize];
        task.status = TaskStatus::SentToOrchestrator;
        task.sent_time = Some(now);
        let bits = task.request_bits;

        if device == self.orchestrator {
            self.route_task(task_id, now);
            return;
        }
        match self.engine.begin(
            &self.topology,
            &mut self.queue,
            now,
            task_id,
            TransferKind::TaskRequest,
            device,
            self.orchestrator,
            bits,
        ) {
            BeginOutcome::Started(_) => {}
            BeginOutcome::Unreachable => {
                self.fail_task(task_id, TaskFailureReason::Mobility, now)
            }
        }
    }

    /// Checkpoint two: the orchestrator places the task.
    fn route_task(&mut self, task_id: TaskId, now: f64) {
        if self.is_settled(task_id) {
            return;
        }
        let device = self.tasks[task_id as usize].device;
        if !self.nodes[device.0].alive {
            self.fail_task(task_id, TaskFailureReason::DeviceDead, now);
            return;
        }

        let snapshots = self.snapshots_for(device);
        let candidates = candidates_for(self.architecture, &snapshots);
        let info = self.task_info(task_id);
        let Some(chosen) = self.policy.select_destination(&info, &candidates) else {
            self.fail_task(task_id, TaskFailureReason::InsufficientResources, now);
            return;
        };
        if !candidates.iter().any(|c| c.id == chosen) {
            // A policy picked outside its candidate list; treat it as
            // having found nothing.
            self.fail_task(task_id, TaskFailureReason::InsufficientResources, now);
            return;
        }
        let destination = NodeId(chosen);

        let task = &self.tasks[task_id as usize];
        let needs_container = task.container_bits > 0.0;
        if needs_container
            && !self.nodes[destination.0].can_host(
                task.app,
                task.container_ram_mb,
                task.container_storage_mb,
            )
        {
            self.fail_task(task_id, TaskFailureReason::InsufficientResources, now);
            return;
        }

        let task = &mut self.tasks[task_id as usize];
        task.destination = Some(destination);
        task.status = TaskStatus::RoutedToDestination;
        trace!(task = task_id, destination = destination.0, "task routed");
        let bits = task.request_bits;

        if destination == self.orchestrator {
            self.arrive_at_destination(task_id, now);
            return;
        }
        match self.engine.begin(
            &self.topology,
            &mut self.queue,
            now,
            task_id,
            TransferKind::TaskRequest,
            self.orchestrator,
            destination,
            bits,
        ) {
            BeginOutcome::Started(_) => {}
            BeginOutcome::Unreachable => {
                self.fail_task(task_id, TaskFailureReason::Mobility, now)
            }
        }
    }

    /// Checkpoint three: the request reaches its destination.
    fn arrive_at_destination(&mut self, task_id: TaskId, now: f64) {
        if self.is_settled(task_id) {
            return;
        }
        let task = &self.tasks[task_id as usize];
        let device = task.device;
        let destination = task.destination.unwrap_or_else(|| {
            panic!("task {task_id} arrived at a destination before routing")
        });
        if !self.nodes[device.0].alive || !self.nodes[destination.0].alive {
            self.fail_task(task_id, TaskFailureReason::DeviceDead, now);
            return;
        }

        self.tasks[task_id as usize].received_time = Some(now);
        let task = &self.tasks[task_id as usize];
        let needs_container =
            task.container_bits > 0.0 && !self.nodes[destination.0].has_container(task.app);
        if needs_container {
            self.request_container(task_id, destination, now);
        } else {
            self.start_execution(task_id, destination, now);
        }
    }

    /// Fetch the container image from the cloud registry, coalescing
    /// concurrent fetches of the same image to the same destination.
    fn request_container(&mut self, task_id: TaskId, destination: NodeId, now: f64) {
        let app = self.tasks[task_id as usize].app;
        let bits = self.tasks[task_id as usize].container_bits;
        self.waiting_for_container
            .entry((destination, app))
            .or_default()
            .push(task_id);
        if !self.fetching.insert((destination, app)) {
            return; // already on its way
        }
        match self.engine.begin(
            &self.topology,
            &mut self.queue,
            now,
            task_id,
            TransferKind::ContainerImage,
            self.cloud,
            destination,
            bits,
        ) {
            BeginOutcome::Started(_) => {}
            BeginOutcome::Unreachable => {
                self.fetching.remove(&(destination, app));
                let waiters = self
                    .waiting_for_container
                    .remove(&(destination, app))
                    .unwrap_or_default();
                for waiter in waiters {
                    self.fail_task(waiter, TaskFailureReason::Mobility, now);
                }
            }
        }
    }

    fn on_container_arrived(&mut self, trigger_task: TaskId, destination: NodeId, now: f64) {
        let app = self.tasks[trigger_task as usize].app;
        let ram = self.tasks[trigger_task as usize].container_ram_mb;
        let storage = self.tasks[trigger_task as usize].container_storage_mb;
        self.nodes[destination.0].cache_container(app, ram, storage);
        self.fetching.remove(&(destination, app));

        let waiters = self
            .waiting_for_container
            .remove(&(destination, app))
            .unwrap_or_default();
        for waiter in waiters {
            if self.is_settled(waiter) {
                continue;
            }
            if !self.nodes[destination.0].alive
                || !self.nodes[self.tasks[waiter as usize].device.0].alive
            {
                self.fail_task(waiter, TaskFailureReason::DeviceDead, now);
                continue;
            }
            self.start_execution(waiter, destination, now);
        }
    }

    fn start_execution(&mut self, task_id: TaskId, destination: NodeId, now: f64) {
        let task = &self.tasks[task_id as usize];
        let length = task.length_mi;
        let cores = task.required_cores;

        match self.nodes[destination.0].submit_task(task_id, length, cores, now) {
            SubmitOutcome::Started { finish_time } => {
                let task = &mut self.tasks[task_id as usize];
                task.status = TaskStatus::Executing;
                task.exec_start_time = Some(now);
                self.queue.schedule_at(
                    finish_time,
                    SimEvent::ExecutionFinished {
                        node: destination,
                        task: task_id,
                    },
                );
            }
            SubmitOutcome::Queued => {}
        }
        // Dynamic draw is charged at dispatch and can empty the battery;
        // the node dies at this instant, not at the next energy tick.
        if self.nodes[destination.0].battery_exhausted() {
            self.handle_node_death(destination, now);
        }
    }

    /// Checkpoint four: execution done, return the result.
    fn on_execution_finished(&mut self, node: NodeId, task_id: TaskId, now: f64) {
        self.tasks[task_id as usize].exec_end_time = Some(now);

        if self.nodes[node.0].alive {
            let cores = self.tasks[task_id as usize].required_cores;
            if let Some((next, finish_time)) = self.nodes[node.0].finish_task(cores, now) {
                let next_task = &mut self.tasks[next as usize];
                next_task.status = TaskStatus::Executing;
                next_task.exec_start_time = Some(now);
                self.queue.schedule_at(
                    finish_time,
                    SimEvent::ExecutionFinished { node, task: next },
                );
            }
            if self.nodes[node.0].battery_exhausted() {
                self.handle_node_death(node, now);
            }
        }

        if self.is_settled(task_id) {
            return;
        }
        let device = self.tasks[task_id as usize].device;
        if !self.nodes[device.0].alive || !self.nodes[node.0].alive {
            self.fail_task(task_id, TaskFailureReason::DeviceDead, now);
            return;
        }
        // Mobility outranks latency: a detached device fails by mobility
        // even when its budget has also expired.
        if self.topology.path(node, device).is_none() {
            self.fail_task(task_id, TaskFailureReason::Mobility, now);
            return;
        }
        let task = &mut self.tasks[task_id as usize];
        if now - task.generation_time >= task.max_latency_s {
            self.fail_task(task_id, TaskFailureReason::Latency, now);
            return;
        }
        task.status = TaskStatus::ResultReturning;
        let bits = task.result_bits;

        match self.engine.begin(
            &self.topology,
            &mut self.queue,
            now,
            task_id,
            TransferKind::Result,
            node,
            device,
            bits,
        ) {
            BeginOutcome::Started(_) => {}
            BeginOutcome::Unreachable => {
                self.fail_task(task_id, TaskFailureReason::Mobility, now)
            }
        }
    }

    /// Final checkpoint: the result reaches the device.
    fn on_result_arrived(&mut self, task_id: TaskId, now: f64) {
        if self.is_settled(task_id) {
            return;
        }
        let device = self.tasks[task_id as usize].device;
        if !self.nodes[device.0].alive {
            self.fail_task(task_id, TaskFailureReason::DeviceDead, now);
            return;
        }
        let task = &mut self.tasks[task_id as usize];
        if now - task.generation_time >= task.max_latency_s {
            self.fail_task(task_id, TaskFailureReason::Latency, now);
            return;
        }
        task.status = TaskStatus::Finished;
        task.completion_time = Some(now);
        trace!(task = task_id, delay_s = now - task.generation_time, "task finished");
        self.settle_task(task_id);
    }

    fn on_transfer_completed(&mut self, id: TransferId, now: f64) {
        let Some(done) = self
            .engine
            .on_completed(&mut self.topology, &mut self.queue, now, id)
        else {
            return;
        };
        match done.kind {
            TransferKind::TaskRequest => {
                if self.tasks[done.task as usize].destination == Some(done.to) {
                    self.arrive_at_destination(done.task, now);
                } else {
                    self.route_task(done.task, now);
                }
            }
            TransferKind::ContainerImage => self.on_container_arrived(done.task, done.to, now),
            TransferKind::Result => self.on_result_arrived(done.task, now),
        }
    }

    // Periodic updates.

    fn on_energy_tick(&mut self, now: f64) {
        let mut died = Vec::new();
        for node in &mut self.nodes {
            if node.accrue_idle_energy(self.update_interval_s) {
                died.push(node.id);
            }
        }
        for id in died {
            self.handle_node_death(id, now);
        }
        let next = now + self.update_interval_s;
        if next <= self.duration_s {
            self.queue.schedule_at(next, SimEvent::EnergyTick);
        }
    }

    fn on_mobility_tick(&mut self, now: f64) {
        for &device in &self.devices.clone() {
            if !self.nodes[device.0].alive {
                continue;
            }
            self.nodes[device.0].advance_location(self.update_interval_s);
            self.update_attachment(device, now);
        }
        let next = now + self.update_interval_s;
        if next <= self.duration_s {
            self.queue.schedule_at(next, SimEvent::MobilityTick);
        }
    }

    /// Re-point the device's access links at the nearest covering edge
    /// data center, or at the cloud when no data centers exist at all. A
    /// device with data centers but none in range is disconnected; its
    /// in-flight transfers fail by mobility.
    fn update_attachment(&mut self, device: NodeId, now: f64) {
        let new_dc = if self.edge_dcs.is_empty() {
            Some(self.cloud)
        } else {
            let location = self.nodes[device.0].location;
            self.edge_dcs
                .iter()
                .map(|&dc| (dc, self.nodes[dc.0].location.distance_to(&location)))
                .filter(|(_, d)| *d <= self.coverage_m)
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
                .map(|(dc, _)| dc)
        };

        let previous = self.topology.attachment_of(device);
        if new_dc != previous {
            trace!(device = device.0, dc = ?new_dc.map(|d| d.0), "device handover");
        }
        self.topology.reattach_device(device, new_dc);

        if new_dc.is_none() {
            let aborted = self.engine.abort_involving(
                &mut self.topology,
                &mut self.queue,
                now,
                device,
            );
            for aborted in aborted {
                self.fail_task(aborted.task, TaskFailureReason::Mobility, now);
            }
            self.release_stranded_waiters(device, TaskFailureReason::Mobility, now);
        }
    }

    fn handle_node_death(&mut self, id: NodeId, now: f64) {
        debug!(node = id.0, time = now, "battery exhausted, node dies");
        self.nodes[id.0].mark_dead(now);
        let aborted =
            self.engine
                .abort_involving(&mut self.topology, &mut self.queue, now, id);
        for aborted in aborted {
            self.fail_task(aborted.task, TaskFailureReason::DeviceDead, now);
        }
        for queued in self.nodes[id.0].drain_queue() {
            self.fail_task(queued, TaskFailureReason::DeviceDead, now);
        }
        self.release_stranded_waiters(id, TaskFailureReason::DeviceDead, now);
    }

    /// Fail every task waiting on a container fetch bound for a node that
    /// just died or detached, and clear the in-flight fetch keys so later
    /// tasks do not coalesce onto a torn-down transfer.
    fn release_stranded_waiters(
        &mut self,
        destination: NodeId,
        reason: TaskFailureReason,
        now: f64,
    ) {
        let mut stranded: Vec<(NodeId, usize)> = self
            .waiting_for_container
            .keys()
            .filter(|(dest, _)| *dest == destination)
            .copied()
            .collect();
        stranded.sort_unstable();
        for key in stranded {
            self.fetching.remove(&key);
            for waiter in self.waiting_for_container.remove(&key).unwrap_or_default() {
                self.fail_task(waiter, reason, now);
            }
        }
    }

    // Bookkeeping.

    /// Whether the task has already reached a terminal state.
    fn is_settled(&self, task_id: TaskId) -> bool {
        self.recorded[task_id as usize]
    }

    fn fail_task(&mut self, task_id: TaskId, reason: TaskFailureReason, now: f64) {
        if self.is_settled(task_id) {
            return;
        }
        let task = &mut self.tasks[task_id as usize];
        task.status = TaskStatus::Failed;
        task.failure = reason;
        task.completion_time = Some(now);
        trace!(task = task_id, ?reason, "task failed");
        self.settle_task(task_id);
    }

    /// Emit the task's record exactly once.
    fn settle_task(&mut self, task_id: TaskId) {
        debug_assert!(!self.recorded[task_id as usize], "task {task_id} settled twice");
        self.recorded[task_id as usize] = true;
        self.collector
            .record(TaskRecord::from_task(&self.tasks[task_id as usize]));
    }

    fn task_info(&self, task_id: TaskId) -> TaskInfo {
        let task = &self.tasks[task_id as usize];
        TaskInfo {
            id: task.id,
            app: task.app,
            device: task.device.0,
            length_mi: task.length_mi,
            required_cores: task.required_cores,
            max_latency_s: task.max_latency_s,
            container_mb: task.container_storage_mb,
        }
    }

    /// Snapshot the whole roster for the policy, with one-way latency
    /// estimates from the task's device.
    fn snapshots_for(&self, device: NodeId) -> Vec<NodeSnapshot> {
        self.nodes
            .iter()
            .map(|node| {
                let latency = if node.id == device {
                    0.0
                } else {
                    self.topology
                        .path(device, node.id)
                        .map(|p| self.topology.path_latency(&p))
                        .unwrap_or(f64::INFINITY)
                };
                node.snapshot(latency)
            })
            .collect()
    }
}

//! Metrics collection and aggregation for simulation runs.
//!
//! The simulation records one [`TaskRecord`] per task, successful or not,
//! and rolls node and link accumulators into a [`ScenarioReport`] when the
//! run ends. Reports are plain serde data; rendering and persistence happen
//! at the CLI layer.

use crate::node::{ComputingNode, NodeKind};
use crate::task::{Task, TaskFailureReason, TaskStatus};
use crate::topology::{LinkType, Topology};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-task completion record, emitted exactly once per generated task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: u64,
    pub app: usize,
    pub device: usize,
    pub destination: Option<usize>,
    pub status: TaskStatus,
    pub failure: TaskFailureReason,
    pub total_delay_s: Option<f64>,
    pub execution_s: Option<f64>,
    pub waiting_s: Option<f64>,
    pub network_s: Option<f64>,
}

impl TaskRecord {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task: task.id,
            app: task.app,
            device: task.device.0,
            destination: task.destination.map(|d| d.0),
            status: task.status,
            failure: task.failure,
            total_delay_s: task.completion_time.map(|t| t - task.generation_time),
            execution_s: task.execution_time(),
            waiting_s: task.waiting_time(),
            network_s: task.network_time(),
        }
    }
}

/// Percentile values for a distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Percentiles {
    /// Compute percentiles from a slice of values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                p50: 0.0,
                p75: 0.0,
                p90: 0.0,
                p95: 0.0,
                p99: 0.0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Self {
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
            min: sorted[0],
            max: sorted[n - 1],
            mean,
        }
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Traffic and energy carried by one link class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkClassUsage {
    pub links: usize,
    pub bits_carried: f64,
    pub energy_j: f64,
}

/// Energy and utilization of one tier of nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierReport {
    pub nodes: usize,
    pub energy_j: f64,
    pub mean_cpu_utilization: f64,
    pub tasks_executed: u64,
}

/// Aggregated results of one scenario instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub policy: String,
    pub architecture: String,
    pub device_count: usize,
    pub duration_s: f64,

    pub total_tasks: u64,
    pub finished_tasks: u64,
    pub failed_latency: u64,
    pub failed_device_dead: u64,
    pub failed_mobility: u64,
    pub failed_resources: u64,
    pub success_rate: f64,

    pub total_delay: Percentiles,
    pub execution_time: Percentiles,
    pub waiting_time: Percentiles,
    pub network_time: Percentiles,

    /// Keyed by link class name ("wan", "wifi", ...).
    pub network_usage: HashMap<String, LinkClassUsage>,
    /// Keyed by tier name ("cloud", "edge", "mist").
    pub tiers: HashMap<String, TierReport>,
    pub total_energy_j: f64,

    pub dead_devices: u64,
    pub death_times_s: Vec<f64>,
    pub mean_remaining_battery: Option<f64>,

    /// Policy-specific counters.
    #[serde(default)]
    pub custom: HashMap<String, f64>,
}

/// Collects per-task records during a run.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    records: Vec<TaskRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: TaskRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Roll task records and node/link accumulators into a report.
    #[allow(clippy::too_many_arguments)]
    pub fn aggregate(
        &self,
        scenario_name: &str,
        policy: &str,
        architecture: &str,
        device_count: usize,
        duration_s: f64,
        nodes: &[ComputingNode],
        topology: &Topology,
        custom: HashMap<String, f64>,
    ) -> ScenarioReport {
        let total_tasks = self.records.len() as u64;
        let finished = self
            .records
            .iter()
            .filter(|r| r.status == TaskStatus::Finished)
            .count() as u64;
        let count_failure = |reason: TaskFailureReason| {
            self.records.iter().filter(|r| r.failure == reason).count() as u64
        };

        let delays: Vec<f64> = self.records.iter().filter_map(|r| r.total_delay_s).collect();
        let exec: Vec<f64> = self.records.iter().filter_map(|r| r.execution_s).collect();
        let wait: Vec<f64> = self.records.iter().filter_map(|r| r.waiting_s).collect();
        let net: Vec<f64> = self.records.iter().filter_map(|r| r.network_s).collect();

        let mut network_usage: HashMap<String, LinkClassUsage> = HashMap::new();
        // Summed in the fixed class order, not map order, so the float
        // total is identical across runs.
        let mut link_energy = 0.0;
        for link_type in LinkType::ALL {
            let mut usage = LinkClassUsage::default();
            for link in topology.links_by_type(link_type) {
                usage.links += 1;
                usage.bits_carried += link.bits_carried;
                usage.energy_j += link.energy_consumed_j;
            }
            if usage.links > 0 {
                link_energy += usage.energy_j;
                network_usage.insert(link_type.name().to_string(), usage);
            }
        }

        let mut tiers: HashMap<String, TierReport> = HashMap::new();
        for (kind, name) in [
            (NodeKind::Cloud, "cloud"),
            (NodeKind::EdgeDatacenter, "edge"),
            (NodeKind::EdgeDevice, "mist"),
        ] {
            let members: Vec<&ComputingNode> =
                nodes.iter().filter(|n| n.kind == kind).collect();
            if members.is_empty() {
                continue;
            }
            let report = TierReport {
                nodes: members.len(),
                energy_j: members.iter().map(|n| n.energy_consumed_j).sum(),
                mean_cpu_utilization: members
                    .iter()
                    .map(|n| n.cpu_utilization(duration_s))
                    .sum::<f64>()
                    / members.len() as f64,
                tasks_executed: members.iter().map(|n| n.tasks_executed).sum(),
            };
            tiers.insert(name.to_string(), report);
        }
        let node_energy: f64 = nodes.iter().map(|n| n.energy_consumed_j).sum();

        let batteries: Vec<f64> = nodes.iter().filter_map(|n| n.battery_level()).collect();
        let death_times_s: Vec<f64> = nodes.iter().filter_map(|n| n.death_time).collect();

        ScenarioReport {
            scenario_name: scenario_name.to_string(),
            policy: policy.to_string(),
            architecture: architecture.to_string(),
            device_count,
            duration_s,
            total_tasks,
            finished_tasks: finished,
            failed_latency: count_failure(TaskFailureReason::Latency),
            failed_device_dead: count_failure(TaskFailureReason::DeviceDead),
            failed_mobility: count_failure(TaskFailureReason::Mobility),
            failed_resources: count_failure(TaskFailureReason::InsufficientResources),
            success_rate: if total_tasks > 0 {
                finished as f64 / total_tasks as f64
            } else {
                0.0
            },
            total_delay: Percentiles::from_values(&delays),
            execution_time: Percentiles::from_values(&exec),
            waiting_time: Percentiles::from_values(&wait),
            network_time: Percentiles::from_values(&net),
            network_usage,
            tiers,
            total_energy_j: node_energy + link_energy,
            dead_devices: death_times_s.len() as u64,
            death_times_s,
            mean_remaining_battery: if batteries.is_empty() {
                None
            } else {
                Some(batteries.iter().sum::<f64>() / batteries.len() as f64)
            },
            custom,
        }
    }
}

/// Format one report as a pretty-printed table string.
pub fn format_table(report: &ScenarioReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<72}\n",
        format!(
            "  {} | {} | {} devices  ",
            report.policy, report.architecture, report.device_count
        )
    ));
    out.push_str(&format!(
        "  Duration: {:.0}s | Tasks: {} | Success: {:.1}%\n",
        report.duration_s,
        report.total_tasks,
        report.success_rate * 100.0
    ));
    out.push_str(&format!("{:-<72}\n", "  Failures  "));
    out.push_str(&format!(
        "  latency={} device_dead={} mobility={} resources={}\n",
        report.failed_latency,
        report.failed_device_dead,
        report.failed_mobility,
        report.failed_resources
    ));
    out.push_str(&format!("{:-<72}\n", "  Delay (s)  "));
    out.push_str(&format!(
        "  Total      P50={:>8.3}  P90={:>8.3}  P99={:>8.3}\n",
        report.total_delay.p50, report.total_delay.p90, report.total_delay.p99
    ));
    out.push_str(&format!(
        "  Execution  P50={:>8.3}  P90={:>8.3}  P99={:>8.3}\n",
        report.execution_time.p50, report.execution_time.p90, report.execution_time.p99
    ));
    out.push_str(&format!(
        "  Waiting    P50={:>8.3}  P90={:>8.3}  P99={:>8.3}\n",
        report.waiting_time.p50, report.waiting_time.p90, report.waiting_time.p99
    ));
    out.push_str(&format!(
        "  Network    P50={:>8.3}  P90={:>8.3}  P99={:>8.3}\n",
        report.network_time.p50, report.network_time.p90, report.network_time.p99
    ));
    out.push_str(&format!("{:-<72}\n", "  Network  "));
    let mut classes: Vec<_> = report.network_usage.iter().collect();
    classes.sort_by_key(|(name, _)| name.as_str());
    for (name, usage) in classes {
        out.push_str(&format!(
            "  {:<10} {:>3} links  {:>12.0} kb  {:>10.3} J\n",
            name,
            usage.links,
            usage.bits_carried / 1000.0,
            usage.energy_j
        ));
    }
    out.push_str(&format!("{:-<72}\n", "  Energy  "));
    let mut tiers: Vec<_> = report.tiers.iter().collect();
    tiers.sort_by_key(|(name, _)| name.as_str());
    for (name, tier) in tiers {
        out.push_str(&format!(
            "  {:<6} {:>4} nodes  {:>12.1} J  cpu={:>5.1}%  tasks={}\n",
            name,
            tier.nodes,
            tier.energy_j,
            tier.mean_cpu_utilization * 100.0,
            tier.tasks_executed
        ));
    }
    out.push_str(&format!("  Total: {:.1} J\n", report.total_energy_j));
    if let Some(battery) = report.mean_remaining_battery {
        out.push_str(&format!(
            "  Batteries: mean {:.1}% remaining, {} dead\n",
            battery * 100.0,
            report.dead_devices
        ));
    }
    for (key, value) in &report.custom {
        out.push_str(&format!("  {key}: {value:.3}\n"));
    }
    out.push_str(&format!("{:=<72}\n", ""));
    out
}

/// Format a comparison table across scenario instances.
pub fn format_comparison_table(reports: &[ScenarioReport]) -> String {
    if reports.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<100}\n", "  Scenario Comparison  "));
    out.push_str(&format!(
        "{:<14} {:<16} {:>8} {:>9} {:>10} {:>10} {:>10} {:>12}\n",
        "Policy", "Architecture", "Devices", "Success%", "Delay p50", "Delay p99", "Wait p50", "Energy (J)"
    ));
    out.push_str(&format!("{:-<100}\n", ""));
    for report in reports {
        out.push_str(&format!(
            "{:<14} {:<16} {:>8} {:>8.1}% {:>10.3} {:>10.3} {:>10.3} {:>12.1}\n",
            report.policy,
            report.architecture,
            report.device_count,
            report.success_rate * 100.0,
            report.total_delay.p50,
            report.total_delay.p99,
            report.waiting_time.p50,
            report.total_energy_j
        ));
    }
    out.push_str(&format!("{:=<100}\n", ""));
    out
}

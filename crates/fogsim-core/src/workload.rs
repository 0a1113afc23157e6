//! Deterministic workload generation.
//!
//! Each generating device runs an independent Poisson process per
//! application: exponential inter-arrival times sampled from a ChaCha8 RNG
//! seeded from the configuration. The full task list is materialized and
//! sorted before the kernel starts, so identical seeds yield identical
//! workloads regardless of how the simulation later unfolds.

use crate::config::SimConfig;
use crate::node::NodeId;
use crate::task::{Task, TaskFailureReason, TaskStatus};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Generate every task of one scenario instance up front.
///
/// `devices` lists the roster ids of the edge devices; only the first
/// `generation_share` fraction of them produce tasks.
pub fn generate_tasks(config: &SimConfig, devices: &[NodeId], seed: u64) -> Vec<Task> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let duration = config.simulation.duration_s;
    let generating = ((devices.len() as f64) * config.edge_devices.generation_share.clamp(0.0, 1.0))
        .round() as usize;

    let mut tasks = Vec::new();
    for &device in &devices[..generating.min(devices.len())] {
        for (app, spec) in config.applications.iter().enumerate() {
            let rate_per_s = spec.rate_per_min / 60.0;
            if rate_per_s <= 0.0 {
                continue;
            }
            let mut t = 0.0;
            loop {
                t += sample_exponential(&mut rng, rate_per_s);
                if t >= duration {
                    break;
                }
                tasks.push(Task {
                    id: 0, // assigned after sorting
                    app,
                    device,
                    destination: None,
                    length_mi: spec.length_mi,
                    required_cores: spec.cores,
                    request_bits: spec.request_bits(),
                    result_bits: spec.result_bits(),
                    container_bits: spec.container_bits(),
                    container_ram_mb: spec.container_ram_mb,
                    container_storage_mb: spec.container_storage_mb,
                    max_latency_s: spec.max_latency_s,
                    generation_time: t,
                    sent_time: None,
                    received_time: None,
                    exec_start_time: None,
                    exec_end_time: None,
                    completion_time: None,
                    status: TaskStatus::Generated,
                    failure: TaskFailureReason::None,
                });
            }
        }
    }

    tasks.sort_by(|a, b| {
        a.generation_time
            .total_cmp(&b.generation_time)
            .then(a.device.cmp(&b.device))
            .then(a.app.cmp(&b.app))
    });
    for (id, task) in tasks.iter_mut().enumerate() {
        task.id = id as u64;
    }
    debug!(
        tasks = tasks.len(),
        devices = generating,
        seed,
        "workload generated"
    );
    tasks
}

/// Inverse-CDF sample of an exponential inter-arrival time.
fn sample_exponential(rng: &mut ChaCha8Rng, rate_per_s: f64) -> f64 {
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    -u.ln() / rate_per_s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    fn devices(n: usize) -> Vec<NodeId> {
        (100..100 + n).map(NodeId).collect()
    }

    #[test]
    fn test_same_seed_same_workload() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        let a = generate_tasks(&config, &devices(5), 11);
        let b = generate_tasks(&config, &devices(5), 11);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.generation_time, y.generation_time);
            assert_eq!(x.device, y.device);
            assert_eq!(x.app, y.app);
        }
    }

    #[test]
    fn test_different_seed_different_workload() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        let a = generate_tasks(&config, &devices(5), 11);
        let b = generate_tasks(&config, &devices(5), 12);
        let times_a: Vec<f64> = a.iter().map(|t| t.generation_time).collect();
        let times_b: Vec<f64> = b.iter().map(|t| t.generation_time).collect();
        assert_ne!(times_a, times_b);
    }

    #[test]
    fn test_tasks_sorted_with_sequential_ids() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        let tasks = generate_tasks(&config, &devices(8), 3);
        assert!(!tasks.is_empty());
        for (i, window) in tasks.windows(2).enumerate() {
            assert!(window[0].generation_time <= window[1].generation_time);
            assert_eq!(window[0].id, i as u64);
        }
        assert!(tasks.iter().all(|t| t.generation_time < 60.0));
    }

    #[test]
    fn test_rate_roughly_matches_expectation() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        // 12 tasks/min over 60s for 10 devices: expect ~120, allow wide slack.
        let tasks = generate_tasks(&config, &devices(10), 5);
        assert!(tasks.len() > 60 && tasks.len() < 240, "got {}", tasks.len());
    }

    #[test]
    fn test_zero_rate_generates_nothing() {
        let mut config = SimConfig::from_str(SAMPLE).unwrap();
        config.applications[0].rate_per_min = 0.0;
        assert!(generate_tasks(&config, &devices(5), 1).is_empty());
    }
}

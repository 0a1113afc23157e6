//! Scenario grid and batch runner tests.

use fogsim_core::config::SimConfig;
use fogsim_core::scenario::{enumerate_scenarios, run_batch};
use fogsim_policies::Architecture;

fn grid_config() -> SimConfig {
    SimConfig::from_str(
        r#"
[simulation]
name = "grid"
seed = 21
duration_s = 30.0
update_interval_s = 1.0
area_m = 200.0

[cloud]
cores = 16
mips_per_core = 20000.0
ram_mb = 65536.0
storage_mb = 1048576.0
idle_w = 100.0
busy_w_per_core = 10.0

[edge_datacenters]
cores = 4
mips_per_core = 8000.0
ram_mb = 8192.0
storage_mb = 131072.0
idle_w = 40.0
busy_w_per_core = 8.0
coverage_m = 300.0

[[edge_datacenters.locations]]
x = 100.0
y = 100.0

[edge_devices]
cores = 2
mips_per_core = 2000.0
ram_mb = 2048.0
storage_mb = 16384.0
idle_w = 0.5
busy_w_per_core = 1.0
speed_m_s = 0.0
range_m = 300.0

[[applications]]
name = "mixed"
rate_per_min = 8.0
length_mi = 1500.0
request_kb = 50.0
result_kb = 25.0
max_latency_s = 10.0

[scenarios]
device_counts = [5, 10]
policies = ["round_robin", "least_load"]
architectures = ["edge_and_cloud", "all"]
"#,
    )
    .unwrap()
}

#[test]
fn test_batch_covers_the_whole_grid_in_order() {
    let config = grid_config();
    let scenarios = enumerate_scenarios(&config).unwrap();
    let reports = run_batch(&config).unwrap();
    assert_eq!(reports.len(), 8);
    for (scenario, report) in scenarios.iter().zip(&reports) {
        assert_eq!(report.device_count, scenario.device_count);
        assert_eq!(report.policy, scenario.policy);
        assert_eq!(report.architecture, scenario.architecture.name());
    }
}

#[test]
fn test_batch_reports_are_self_consistent() {
    let config = grid_config();
    for report in run_batch(&config).unwrap() {
        let settled = report.finished_tasks
            + report.failed_latency
            + report.failed_device_dead
            + report.failed_mobility
            + report.failed_resources;
        assert!(settled <= report.total_tasks);
        assert!(report.success_rate >= 0.0 && report.success_rate <= 1.0);
        assert!(report.total_energy_j > 0.0, "idle energy must accrue");
        assert!(report.tiers.contains_key("cloud"));
        assert!(report.tiers.contains_key("mist"));
    }
}

#[test]
fn test_compare_policies_runs_each_once() {
    let config = grid_config();
    let reports = fogsim_core::compare_policies(
        &config,
        5,
        Architecture::EdgeAndCloud,
        &["round_robin", "fastest_cpu"],
    );
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].policy, "round_robin");
    assert_eq!(reports[1].policy, "fastest_cpu");
}

#[test]
fn test_json_round_trip_of_reports() {
    let config = grid_config();
    let reports = run_batch(&config).unwrap();
    let json = serde_json::to_string_pretty(&reports).unwrap();
    let parsed: Vec<fogsim_core::ScenarioReport> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), reports.len());
    assert_eq!(parsed[0].total_tasks, reports[0].total_tasks);
}

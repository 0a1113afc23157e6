use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fogsim_core::config::SimConfig;
use fogsim_core::scenario::{run_scenario, Scenario};
use fogsim_policies::Architecture;

fn bench_config(duration_s: f64) -> SimConfig {
    SimConfig::from_str(&format!(
        r#"
[simulation]
name = "bench"
seed = 42
duration_s = {duration_s}
update_interval_s = 1.0
area_m = 200.0

[cloud]
cores = 32
mips_per_core = 40000.0
ram_mb = 131072.0
storage_mb = 1048576.0
idle_w = 300.0
busy_w_per_core = 20.0

[edge_datacenters]
cores = 8
mips_per_core = 20000.0
ram_mb = 16384.0
storage_mb = 262144.0
idle_w = 80.0
busy_w_per_core = 15.0
coverage_m = 150.0

[[edge_datacenters.locations]]
x = 50.0
y = 50.0

[[edge_datacenters.locations]]
x = 150.0
y = 150.0

[edge_devices]
cores = 2
mips_per_core = 4000.0
ram_mb = 2048.0
storage_mb = 16384.0
idle_w = 1.5
busy_w_per_core = 3.0
speed_m_s = 0.0
range_m = 150.0

[[applications]]
name = "bench_app"
rate_per_min = 30.0
length_mi = 3000.0
request_kb = 25.0
result_kb = 20.0
container_kb = 500.0
container_ram_mb = 64.0
container_storage_mb = 32.0
max_latency_s = 5.0

[scenarios]
device_counts = [50]
policies = ["round_robin"]
architectures = ["edge_and_cloud"]
"#
    ))
    .unwrap()
}

fn bench_scenario(c: &mut Criterion, name: &str, duration_s: f64, devices: usize) {
    let config = bench_config(duration_s);
    let scenario = Scenario {
        device_count: devices,
        policy: "round_robin".to_string(),
        architecture: Architecture::EdgeAndCloud,
    };
    c.bench_function(name, |b| {
        b.iter(|| run_scenario(black_box(&config), black_box(&scenario)).unwrap())
    });
}

fn bench_small(c: &mut Criterion) {
    bench_scenario(c, "simulate_60s_20_devices", 60.0, 20);
}

fn bench_large(c: &mut Criterion) {
    bench_scenario(c, "simulate_300s_100_devices", 300.0, 100);
}

criterion_group!(benches, bench_small, bench_large);
criterion_main!(benches);

//! FogSim CLI — Benchmark edge/fog/cloud offloading policies.

use clap::{Parser, Subcommand};
use fogsim_core::config::SimConfig;
use fogsim_core::node::NodeId;
use fogsim_core::{metrics, scenario, workload};
use fogsim_policies::{available_policies, Architecture};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "fogsim",
    about = "Benchmark edge/fog/cloud offloading policies without a testbed",
    version
)]
struct Cli {
    /// Log verbosity when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full scenario grid from the configuration.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare a subset of policies on one scenario shape.
    Compare {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated list of policy names.
        #[arg(short = 'P', long, value_delimiter = ',')]
        policies: Vec<String>,
        /// Number of edge devices.
        #[arg(short, long, default_value = "20")]
        devices: usize,
        /// Architecture name (cloud_only, edge_and_cloud, all, ...).
        #[arg(short, long, default_value = "all")]
        architecture: String,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate the workload for inspection and write it as JSONL.
    GenWorkload {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Number of edge devices.
        #[arg(short, long, default_value = "20")]
        devices: usize,
        /// Output file path.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List available orchestration policies.
    ListPolicies,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run { config, output } => {
            let sim_config = load_config(&config);
            let reports = scenario::run_batch(&sim_config).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            });
            for report in &reports {
                print!("{}", metrics::format_table(report));
            }
            print!("{}", metrics::format_comparison_table(&reports));
            write_json(output.as_deref(), &reports);
        }
        Commands::Compare {
            config,
            policies,
            devices,
            architecture,
            output,
        } => {
            let sim_config = load_config(&config);
            let architecture = Architecture::from_name(&architecture).unwrap_or_else(|| {
                eprintln!(
                    "Error: unknown architecture '{architecture}'"
                );
                std::process::exit(1);
            });
            let names: Vec<&str> = if policies.is_empty() {
                available_policies()
            } else {
                policies.iter().map(String::as_str).collect()
            };
            let reports =
                fogsim_core::compare_policies(&sim_config, devices, architecture, &names);
            print!("{}", metrics::format_comparison_table(&reports));
            write_json(output.as_deref(), &reports);
        }
        Commands::GenWorkload {
            config,
            devices,
            output,
        } => {
            let sim_config = load_config(&config);
            let roster: Vec<NodeId> = (0..devices).map(NodeId).collect();
            let tasks = workload::generate_tasks(
                &sim_config,
                &roster,
                sim_config.simulation.seed.wrapping_add(1),
            );
            let mut lines = String::new();
            for task in &tasks {
                let line = serde_json::json!({
                    "id": task.id,
                    "app": task.app,
                    "device": task.device.0,
                    "generation_time_s": task.generation_time,
                    "length_mi": task.length_mi,
                    "request_bits": task.request_bits,
                    "result_bits": task.result_bits,
                    "max_latency_s": task.max_latency_s,
                });
                lines.push_str(&line.to_string());
                lines.push('\n');
            }
            std::fs::write(&output, lines).unwrap_or_else(|e| {
                eprintln!("Error writing workload: {e}");
                std::process::exit(1);
            });
            println!("Wrote {} tasks to {}", tasks.len(), output.display());
        }
        Commands::ListPolicies => {
            println!("Available policies:");
            for name in available_policies() {
                println!("  {name}");
            }
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fogsim_core={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: &std::path::Path) -> SimConfig {
    SimConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {e}");
        std::process::exit(1);
    })
}

fn write_json(path: Option<&std::path::Path>, reports: &[metrics::ScenarioReport]) {
    let Some(path) = path else { return };
    let json = serde_json::to_string_pretty(reports).unwrap_or_else(|e| {
        eprintln!("Error serializing results: {e}");
        std::process::exit(1);
    });
    std::fs::write(path, json).unwrap_or_else(|e| {
        eprintln!("Error writing results: {e}");
        std::process::exit(1);
    });
    println!("Results written to {}", path.display());
}

//! TOML configuration parsing for FogSim.
//!
//! Defines the complete configuration schema for simulation runs: the node
//! roster (cloud, edge data centers, edge devices), network link parameters,
//! the application catalog, and the scenario grid. Configuration is loaded
//! and validated once before the simulation starts and treated as immutable
//! afterwards.

use fogsim_policies::{available_policies, Architecture};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub simulation: SimulationSection,
    pub cloud: CloudSection,
    #[serde(default)]
    pub edge_datacenters: EdgeDatacenterSection,
    pub edge_devices: EdgeDeviceSection,
    #[serde(default)]
    pub network: NetworkSection,
    pub applications: Vec<ApplicationSpec>,
    pub scenarios: ScenarioSection,
}

/// General simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for reproducible workload generation and placement.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Simulated duration in seconds.
    #[serde(default = "default_duration")]
    pub duration_s: f64,
    /// Interval of the periodic energy and mobility updates, seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval_s: f64,
    /// Side of the square deployment area, meters.
    #[serde(default = "default_area")]
    pub area_m: f64,
}

fn default_sim_name() -> String {
    "fogsim".to_string()
}
fn default_seed() -> u64 {
    42
}
fn default_duration() -> f64 {
    600.0
}
fn default_update_interval() -> f64 {
    1.0
}
fn default_area() -> f64 {
    200.0
}

/// Hardware profile shared by the nodes of one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub cores: u32,
    pub mips_per_core: f64,
    pub ram_mb: f64,
    pub storage_mb: f64,
    #[serde(default)]
    pub idle_w: f64,
    #[serde(default)]
    pub busy_w_per_core: f64,
}

/// The cloud data center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSection {
    #[serde(flatten)]
    pub host: HostSpec,
}

/// Edge data centers and where they stand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDatacenterSection {
    #[serde(flatten)]
    pub host: Option<HostSpec>,
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    /// Radio coverage radius of each data center, meters.
    #[serde(default = "default_coverage")]
    pub coverage_m: f64,
}

fn default_coverage() -> f64 {
    100.0
}

impl Default for EdgeDatacenterSection {
    fn default() -> Self {
        Self {
            host: None,
            locations: Vec::new(),
            coverage_m: default_coverage(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationSpec {
    pub x: f64,
    pub y: f64,
}

/// Edge device profile. Devices are placed uniformly at random in the
/// deployment area using the simulation seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDeviceSection {
    #[serde(flatten)]
    pub host: HostSpec,
    /// Battery capacity in watt-hours; absent means mains-powered.
    pub battery_capacity_wh: Option<f64>,
    /// Constant movement speed, meters per second. Zero keeps devices
    /// stationary.
    #[serde(default)]
    pub speed_m_s: f64,
    /// Radio range of the device, meters.
    #[serde(default = "default_range")]
    pub range_m: f64,
    /// Fraction of devices that generate tasks, in [0, 1].
    #[serde(default = "default_generation_share")]
    pub generation_share: f64,
}

fn default_range() -> f64 {
    50.0
}
fn default_generation_share() -> f64 {
    1.0
}

/// One link class: capacity, propagation latency, per-bit energy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkSpec {
    pub bandwidth_mbps: f64,
    pub latency_s: f64,
    #[serde(default)]
    pub nanojoules_per_bit: f64,
}

impl LinkSpec {
    pub fn bandwidth_bps(&self) -> f64 {
        self.bandwidth_mbps * 1e6
    }

    pub fn energy_per_bit_j(&self) -> f64 {
        self.nanojoules_per_bit * 1e-9
    }
}

/// Device access link: same shape as [`LinkSpec`] plus asymmetric per-bit
/// energy for the radio up and down directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSpec {
    /// "wifi", "cellular", "ethernet", or "lan".
    #[serde(default = "default_access_type")]
    pub link_type: String,
    pub bandwidth_mbps: f64,
    pub latency_s: f64,
    #[serde(default)]
    pub nanojoules_per_bit_up: f64,
    #[serde(default)]
    pub nanojoules_per_bit_down: f64,
}

fn default_access_type() -> String {
    "wifi".to_string()
}

impl AccessSpec {
    pub fn bandwidth_bps(&self) -> f64 {
        self.bandwidth_mbps * 1e6
    }
}

/// Network link parameters by class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    /// Edge data center to cloud.
    #[serde(default = "default_wan")]
    pub wan: LinkSpec,
    /// Edge data center mesh.
    #[serde(default = "default_man")]
    pub man: LinkSpec,
    /// Device to its serving edge data center.
    #[serde(default = "default_access")]
    pub access: AccessSpec,
}

fn default_wan() -> LinkSpec {
    LinkSpec {
        bandwidth_mbps: 1000.0,
        latency_s: 0.06,
        nanojoules_per_bit: 40.0,
    }
}
fn default_man() -> LinkSpec {
    LinkSpec {
        bandwidth_mbps: 1000.0,
        latency_s: 0.005,
        nanojoules_per_bit: 10.0,
    }
}
fn default_access() -> AccessSpec {
    AccessSpec {
        link_type: default_access_type(),
        bandwidth_mbps: 100.0,
        latency_s: 0.002,
        nanojoules_per_bit_up: 280.0,
        nanojoules_per_bit_down: 120.0,
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            wan: default_wan(),
            man: default_man(),
            access: default_access(),
        }
    }
}

/// One entry of the application catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    /// Mean tasks generated per device per minute.
    pub rate_per_min: f64,
    /// Task CPU length in million instructions.
    pub length_mi: f64,
    /// Cores the task occupies while executing.
    #[serde(default = "default_task_cores")]
    pub cores: u32,
    /// Offloading request size, kilobytes.
    pub request_kb: f64,
    /// Result size, kilobytes.
    pub result_kb: f64,
    /// Container image size, kilobytes.
    #[serde(default)]
    pub container_kb: f64,
    /// RAM the container needs at the destination, MB.
    #[serde(default)]
    pub container_ram_mb: f64,
    /// Storage the container needs at the destination, MB.
    #[serde(default)]
    pub container_storage_mb: f64,
    /// Maximum tolerable delay, generation to result, seconds.
    pub max_latency_s: f64,
}

fn default_task_cores() -> u32 {
    1
}

impl ApplicationSpec {
    pub fn request_bits(&self) -> f64 {
        self.request_kb * 8000.0
    }

    pub fn result_bits(&self) -> f64 {
        self.result_kb * 8000.0
    }

    pub fn container_bits(&self) -> f64 {
        self.container_kb * 8000.0
    }
}

/// The scenario grid: the cross product of these lists is simulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSection {
    pub device_counts: Vec<usize>,
    pub policies: Vec<String>,
    pub architectures: Vec<String>,
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.duration_s <= 0.0 {
            return Err(ConfigError::Validation(
                "simulation.duration_s must be positive".to_string(),
            ));
        }
        if self.simulation.update_interval_s <= 0.0
            || self.simulation.update_interval_s > self.simulation.duration_s
        {
            return Err(ConfigError::Validation(
                "simulation.update_interval_s must be positive and no longer than the duration"
                    .to_string(),
            ));
        }

        for (tier, host) in [
            ("cloud", Some(&self.cloud.host)),
            ("edge_datacenters", self.edge_datacenters.host.as_ref()),
            ("edge_devices", Some(&self.edge_devices.host)),
        ] {
            let Some(host) = host else { continue };
            if host.cores == 0 || host.mips_per_core <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{tier} must have at least one core and positive MIPS"
                )));
            }
        }
        if !self.edge_datacenters.locations.is_empty() && self.edge_datacenters.host.is_none() {
            return Err(ConfigError::Validation(
                "edge_datacenters.locations given without a host profile".to_string(),
            ));
        }

        for (name, bandwidth) in [
            ("network.wan", self.network.wan.bandwidth_mbps),
            ("network.man", self.network.man.bandwidth_mbps),
            ("network.access", self.network.access.bandwidth_mbps),
        ] {
            if bandwidth <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} bandwidth must be positive"
                )));
            }
        }
        crate::topology::parse_link_type(&self.network.access.link_type).ok_or_else(|| {
            ConfigError::Validation(format!(
                "Unknown access link type '{}'",
                self.network.access.link_type
            ))
        })?;

        if self.applications.is_empty() {
            return Err(ConfigError::Validation(
                "At least one application is required".to_string(),
            ));
        }
        for app in &self.applications {
            if app.length_mi <= 0.0 || app.max_latency_s <= 0.0 || app.cores == 0 {
                return Err(ConfigError::Validation(format!(
                    "Application '{}' must have positive length, latency budget, and cores",
                    app.name
                )));
            }
            if app.rate_per_min < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "Application '{}' has a negative generation rate",
                    app.name
                )));
            }
        }

        if self.scenarios.device_counts.is_empty()
            || self.scenarios.device_counts.contains(&0)
        {
            return Err(ConfigError::Validation(
                "scenarios.device_counts must be non-empty and non-zero".to_string(),
            ));
        }
        for policy in &self.scenarios.policies {
            if !available_policies().contains(&policy.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Unknown policy '{policy}'; available: {}",
                    available_policies().join(", ")
                )));
            }
        }
        for arch in &self.scenarios.architectures {
            if Architecture::from_name(arch).is_none() {
                return Err(ConfigError::Validation(format!(
                    "Unknown architecture '{arch}'"
                )));
            }
        }
        if self.scenarios.policies.is_empty() || self.scenarios.architectures.is_empty() {
            return Err(ConfigError::Validation(
                "scenarios.policies and scenarios.architectures must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
        [simulation]
        name = "smoke"
        seed = 7
        duration_s = 60.0
        update_interval_s = 1.0

        [cloud]
        cores = 16
        mips_per_core = 40000.0
        ram_mb = 65536.0
        storage_mb = 1048576.0
        idle_w = 200.0
        busy_w_per_core = 25.0

        [edge_datacenters]
        cores = 8
        mips_per_core = 20000.0
        ram_mb = 16384.0
        storage_mb = 262144.0
        idle_w = 80.0
        busy_w_per_core = 15.0
        coverage_m = 100.0

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
        battery_capacity_wh = 18.5
        speed_m_s = 1.4
        range_m = 50.0

        [[applications]]
        name = "augmented_reality"
        rate_per_min = 12.0
        length_mi = 2000.0
        request_kb = 25.0
        result_kb = 20.0
        container_kb = 2500.0
        container_ram_mb = 128.0
        container_storage_mb = 64.0
        max_latency_s = 1.0

        [scenarios]
        device_counts = [10, 20]
        policies = ["round_robin", "trade_off"]
        architectures = ["edge_and_cloud"]
    "#;

    #[test]
    fn test_parse_sample() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.edge_datacenters.locations.len(), 2);
        assert_eq!(config.applications[0].request_bits(), 200_000.0);
        assert_eq!(config.scenarios.device_counts, vec![10, 20]);
    }

    #[test]
    fn test_defaults_fill_in() {
        let config = SimConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.network.wan.bandwidth_mbps, 1000.0);
        assert_eq!(config.network.access.link_type, "wifi");
        assert_eq!(config.edge_devices.generation_share, 1.0);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let bad = SAMPLE.replace("round_robin", "psychic");
        let err = SimConfig::from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_unknown_architecture() {
        let bad = SAMPLE.replace("edge_and_cloud", "edge_and_mainframe");
        assert!(SimConfig::from_str(&bad).is_err());
    }

    #[test]
    fn test_rejects_zero_device_count() {
        let bad = SAMPLE.replace("[10, 20]", "[0]");
        assert!(SimConfig::from_str(&bad).is_err());
    }

    #[test]
    fn test_rejects_empty_applications() {
        let mut config = SimConfig::from_str(SAMPLE).unwrap();
        config.applications.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_duration() {
        let bad = SAMPLE.replace("duration_s = 60.0", "duration_s = 0.0");
        assert!(SimConfig::from_str(&bad).is_err());
    }
}

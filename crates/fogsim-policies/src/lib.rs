//! Built-in orchestration policies for FogSim.
//!
//! This crate provides the [`OrchestrationPolicy`] trait and several built-in
//! placement strategies for edge/fog/cloud task offloading:
//!
//! | Policy | Strategy | Best For |
//! |--------|----------|----------|
//! | [`RoundRobin`] | Cycle through candidates | Uniform workloads |
//! | [`LeastLoad`] | Fewest queued + running tasks | Variable task lengths |
//! | [`FastestCpu`] | Most free MIPS | CPU-bound tasks |
//! | [`TradeOff`] | Weighted latency/energy score | Mixed tiers |

pub mod fastest_cpu;
pub mod least_load;
pub mod round_robin;
pub mod trade_off;
pub mod traits;

pub use fastest_cpu::FastestCpu;
pub use least_load::LeastLoad;
pub use round_robin::RoundRobin;
pub use trade_off::TradeOff;
pub use traits::*;

/// Create an orchestration policy by name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn OrchestrationPolicy>> {
    match name {
        "round_robin" => Some(Box::new(RoundRobin::new())),
        "least_load" => Some(Box::new(LeastLoad::new())),
        "fastest_cpu" => Some(Box::new(FastestCpu::new())),
        "trade_off" => Some(Box::new(TradeOff::new())),
        _ => None,
    }
}

/// List all available built-in policy names.
pub fn available_policies() -> Vec<&'static str> {
    vec!["round_robin", "least_load", "fastest_cpu", "trade_off"]
}

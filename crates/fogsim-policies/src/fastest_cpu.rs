//! Fastest-CPU placement policy.
//!
//! Greedily routes to the candidate with the most free processing capacity
//! (free cores × MIPS per core). Minimizes execution time for CPU-bound
//! tasks at the cost of concentrating load on the biggest machines.

use crate::traits::*;

/// Pick the node with the highest free MIPS.
pub struct FastestCpu;

impl FastestCpu {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FastestCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationPolicy for FastestCpu {
    fn select_destination(
        &mut self,
        task: &TaskInfo,
        candidates: &[NodeSnapshot],
    ) -> Option<usize> {
        candidates
            .iter()
            .filter(|n| n.total_cores >= task.required_cores)
            .max_by(|a, b| {
                let fa = a.available_cores as f64 * a.mips_per_core;
                let fb = b.available_cores as f64 * b.mips_per_core;
                // Ties broken toward the lower id for determinism.
                fa.partial_cmp(&fb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.id.cmp(&a.id))
            })
            .map(|n| n.id)
    }

    fn name(&self) -> &str {
        "fastest_cpu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{dummy_task, make_candidates};

    #[test]
    fn test_fastest_cpu_picks_most_free_mips() {
        let mut policy = FastestCpu::new();
        let mut candidates = make_candidates(3, NodeTier::Edge);
        candidates[1].mips_per_core = 40_000.0;
        assert_eq!(
            policy.select_destination(&dummy_task(), &candidates),
            Some(1)
        );
    }

    #[test]
    fn test_fastest_cpu_skips_small_nodes() {
        let mut policy = FastestCpu::new();
        let mut candidates = make_candidates(2, NodeTier::Mist);
        candidates[0].total_cores = 1;
        candidates[0].available_cores = 1;
        candidates[0].mips_per_core = 1e9;

        let mut task = dummy_task();
        task.required_cores = 2;
        assert_eq!(policy.select_destination(&task, &candidates), Some(1));
    }

    #[test]
    fn test_fastest_cpu_tie_breaks_by_id() {
        let mut policy = FastestCpu::new();
        let candidates = make_candidates(4, NodeTier::Cloud);
        assert_eq!(
            policy.select_destination(&dummy_task(), &candidates),
            Some(0)
        );
    }
}

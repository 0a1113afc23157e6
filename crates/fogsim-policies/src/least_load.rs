//! Least-load placement policy.
//!
//! Routes each task to the candidate with the fewest tasks competing for its
//! cores: queued tasks plus cores already occupied. Reacts well to uneven
//! task lengths, unlike round-robin.

use crate::traits::*;

/// Pick the node with the lowest (queue length + busy cores) figure.
pub struct LeastLoad;

impl LeastLoad {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationPolicy for LeastLoad {
    fn select_destination(
        &mut self,
        _task: &TaskInfo,
        candidates: &[NodeSnapshot],
    ) -> Option<usize> {
        candidates
            .iter()
            .min_by_key(|n| {
                let busy = (n.total_cores - n.available_cores) as usize;
                // Ties broken by id for determinism.
                (n.queue_len + busy, n.id)
            })
            .map(|n| n.id)
    }

    fn name(&self) -> &str {
        "least_load"
    }
}

//! Round-robin placement policy.
//!
//! The simplest strategy: cycles through candidate nodes in id order.
//! Provides good fairness but ignores node state (load, battery, latency).

use crate::traits::*;

/// Round-robin placement.
///
/// Tracks the last-used node by id rather than positional index, so the
/// rotation is stable even when nodes die or the candidate set shrinks.
pub struct RoundRobin {
    /// Id of the last node we placed on (None on first call).
    last_node_id: Option<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { last_node_id: None }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationPolicy for RoundRobin {
    fn select_destination(
        &mut self,
        _task: &TaskInfo,
        candidates: &[NodeSnapshot],
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }

        // Find the first candidate with id > last_id, wrapping around.
        let chosen = match self.last_node_id {
            Some(last_id) => candidates
                .iter()
                .find(|n| n.id > last_id)
                .or_else(|| candidates.first())?,
            None => candidates.first()?,
        };

        self.last_node_id = Some(chosen.id);
        Some(chosen.id)
    }

    fn name(&self) -> &str {
        "round_robin"
    }
}

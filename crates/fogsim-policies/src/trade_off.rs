//! Latency/energy trade-off placement policy.
//!
//! Scores every candidate on a weighted combination of estimated completion
//! time and energy sensitivity, then picks the lowest score. Long tasks drift
//! toward the cloud (fast cores amortize the WAN round trip), short
//! latency-sensitive tasks stay near the device, and battery-powered
//! candidates are penalized so the policy does not drain the mist tier.

use crate::traits::*;
use std::collections::HashMap;

/// Weighted latency/energy/capacity scoring.
pub struct TradeOff {
    /// Weight applied to the estimated completion time (per second).
    time_weight: f64,
    /// Penalty applied to battery-powered candidates, scaled by how empty
    /// the battery is.
    battery_weight: f64,
    /// Number of placement decisions made.
    decisions: u64,
    /// Running sum of winning scores, for custom metrics.
    score_sum: f64,
}

impl TradeOff {
    pub fn new() -> Self {
        Self::with_weights(1.0, 0.5)
    }

    pub fn with_weights(time_weight: f64, battery_weight: f64) -> Self {
        Self {
            time_weight,
            battery_weight,
            decisions: 0,
            score_sum: 0.0,
        }
    }

    /// Score a candidate for a task; lower is better.
    fn score(&self, task: &TaskInfo, node: &NodeSnapshot) -> f64 {
        // Waiting tasks share the cores ahead of us; approximate the backlog
        // as whole extra task lengths.
        let backlog = node.queue_len as f64 + 1.0;
        let exec_s = task.length_mi * backlog / node.mips_per_core.max(1.0);
        let round_trip_s = 2.0 * node.latency_to_device_s;

        let battery_penalty = match node.battery_level {
            // An empty battery makes the node nearly unusable.
            Some(level) => self.battery_weight * (1.0 - level.clamp(0.0, 1.0) + 0.1),
            None => 0.0,
        };

        self.time_weight * (exec_s + round_trip_s) + battery_penalty
    }
}

impl Default for TradeOff {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationPolicy for TradeOff {
    fn select_destination(
        &mut self,
        task: &TaskInfo,
        candidates: &[NodeSnapshot],
    ) -> Option<usize> {
        let best = candidates
            .iter()
            .filter(|n| n.total_cores >= task.required_cores)
            .map(|n| (self.score(task, n), n.id))
            .min_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            })?;

        self.decisions += 1;
        self.score_sum += best.0;
        Some(best.1)
    }

    fn name(&self) -> &str {
        "trade_off"
    }

    fn custom_metrics(&self) -> HashMap<String, f64> {
        let mut m = HashMap::new();
        m.insert("trade_off_decisions".to_string(), self.decisions as f64);
        if self.decisions > 0 {
            m.insert(
                "trade_off_mean_score".to_string(),
                self.score_sum / self.decisions as f64,
            );
        }
        m
    }
}

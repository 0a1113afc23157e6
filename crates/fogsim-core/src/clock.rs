//! Virtual clock for discrete-event simulation.
//!
//! The [`SimClock`] tracks simulated time independently of wall-clock time,
//! advancing only when events are dequeued. This makes runs deterministic and
//! repeatable regardless of host machine speed.

use serde::{Deserialize, Serialize};

/// Virtual simulation clock.
///
/// Time is a double-precision count of simulated seconds, owned exclusively
/// by the event kernel and advanced only by dequeuing the next event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time in seconds.
    current_s: f64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    pub fn new() -> Self {
        Self { current_s: 0.0 }
    }

    /// Current time in seconds.
    pub fn now(&self) -> f64 {
        self.current_s
    }

    /// Advance the clock to a specific time in seconds.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `t` is in the past. Moving the clock
    /// backwards is a programming error, not a runtime condition.
    pub fn advance_to(&mut self, t: f64) {
        debug_assert!(
            t >= self.current_s,
            "Cannot move clock backwards: current={}s, target={}s",
            self.current_s,
            t,
        );
        self.current_s = t;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

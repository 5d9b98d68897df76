use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accumulated counts and timings for the simulation loop.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct SimMetrics {
    pub total_ticks: u64,
    pub decision_passes: u64,
    pub objects_moved: u64,
    pub contacts: u64,
    pub expired: u64,
    pub delayed_resumed: u64,
    pub conditions_fired: u64,
    pub swept: u64,
    pub total_time: Duration,
    pub decision_time: Duration,
    pub motion_time: Duration,
    pub collision_time: Duration,
    /// Delayed actions plus condition checks.
    pub action_time: Duration,
    /// Wall clock time from first tick to last
    pub wall_time: Duration,
}

impl SimMetrics {
    pub fn tick_avg_ms(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() * 1000.0 / self.total_ticks as f64
        }
    }

    pub fn ticks_per_second(&self) -> f64 {
        if self.total_time.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.total_ticks as f64 / self.total_time.as_secs_f64()
        }
    }
}

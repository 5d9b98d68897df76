//! Per-tick world systems, run by [`step_world`](crate::step::step_world)
//! in the order they are listed here.

pub mod aging;
pub mod collision;
pub mod motion;
pub mod proximity;

pub use aging::run_aging_tick;
pub use collision::run_collision_tick;
pub use motion::run_motion_tick;
pub use proximity::run_proximity_tick;

//! # Antares Simulation Core
//!
//! Deterministic simulation of tactical space combat: ships, projectiles and
//! scenario scripting stepped in fixed ticks.
//!
//! Every peer that starts from the same [`Scenario`] and feeds the same
//! [`PlayerInputs`] computes the same [`WorldState`], tick for tick. All
//! arithmetic is integer or Q24.8 fixed point, and every object draws from
//! its own seeded random stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │   Players   │────▶│ PlayerInputs │────▶│ step_world  │
//! │   (keys)    │     │ (per tick)   │     │             │
//! └─────────────┘     └──────────────┘     └──────┬──────┘
//!                                                 │
//!        ┌──────────────┬─────────────────────────┤
//!        ▼              ▼                         ▼
//! ┌─────────────┐ ┌─────────────┐          ┌─────────────┐
//! │ ai::decide  │ │   systems   │          │   action    │
//! │ (NPC keys)  │ │ (motion...) │          │ (scripts)   │
//! └─────────────┘ └─────────────┘          └──────┬──────┘
//!                                                 │
//!                     ┌──────────────┐     ┌──────▼──────┐
//!                     │  EffectSink  │◀────│ WorldState  │
//!                     │ (sound, fx)  │     │             │
//!                     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Fixed`] | Q24.8 fixed-point number |
//! | [`Random`] | Per-object deterministic random stream |
//! | [`ObjectTable`] | Slot table addressed by generation-checked [`ObjectRef`]s |
//! | [`Scenario`] | Immutable object types, action table, initials and conditions |
//! | [`WorldState`] | Everything that changes during play |
//! | [`step_world`] | Advance the world by one tick |
//! | [`EffectSink`] | Receiver for sounds, messages and visual effects |
//!
//! ## Scripting
//!
//! Object types and scenario conditions refer to ranges of the scenario's
//! action table. [`action::execute`] runs a range against a subject and a
//! direct object; a DELAY action parks the rest of the range in the
//! world's [`ActionQueue`](action::ActionQueue) until it comes due.

pub mod action;
pub mod ai;
pub mod combat;
pub mod conditions;
pub mod config;
pub mod effects;
pub mod fixed;
pub mod input;
pub mod lifecycle;
pub mod metrics;
pub mod object;
pub mod profiling;
pub mod random;
pub mod registry;
pub mod rotation;
pub mod scenario;
pub mod state;
pub mod step;
pub mod systems;
pub mod testing;

pub use config::SimConfig;
pub use effects::{EffectEvent, EffectLog, EffectSink, NullSink};
pub use fixed::{Coord, Fixed, FixedPoint};
pub use input::{keys, Command, PlayerInputs};
pub use metrics::SimMetrics;
pub use object::SpaceObject;
pub use random::Random;
pub use registry::{ObjectRef, ObjectTable};
pub use scenario::{Scenario, ScenarioError};
pub use state::WorldState;
pub use step::{step_world, FrameClock, TickReport};

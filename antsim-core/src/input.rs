use crate::registry::ObjectRef;
use crate::scenario::AdmiralId;
use serde::{Deserialize, Serialize};

/// Key bits held in an object's `keys_down`.
pub mod keys {
    pub const UP: u32 = 0x0000_0001;
    pub const DOWN: u32 = 0x0000_0002;
    pub const LEFT: u32 = 0x0000_0004;
    pub const RIGHT: u32 = 0x0000_0008;
    pub const FIRE_1: u32 = 0x0000_0010;
    pub const FIRE_2: u32 = 0x0000_0020;
    pub const FIRE_SPECIAL: u32 = 0x0000_0040;
    pub const WARP: u32 = 0x0000_0080;
    /// Head for the admiral's selected target.
    pub const ADOPT_TARGET: u32 = 0x0000_0800;
    /// Send the admiral's control object to the selected target.
    pub const GIVE_COMMAND: u32 = 0x0000_1000;
    pub const AUTOPILOT: u32 = 0x0100_0000;
    /// Keys were set by a player this pass; computer decisions must not replace them.
    pub const MANUAL_OVERRIDE: u32 = 0x0200_0000;

    pub const MOTION: u32 = UP | DOWN | LEFT | RIGHT;
    pub const WEAPON: u32 = FIRE_1 | FIRE_2 | FIRE_SPECIAL;
    pub const MISC: u32 = WARP;
    /// One-shot requests consumed by the decision pass.
    pub const SPECIAL: u32 = ADOPT_TARGET | GIVE_COMMAND | AUTOPILOT;
}

/// Inputs for one tick from one admiral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInputs {
    pub admiral: AdmiralId,
    /// Key bits for the admiral's flagship.
    pub keys: u32,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Choose the object that receives orders.
    SelectControl { object: ObjectRef },
    /// Choose the object orders refer to.
    SelectTarget { object: ObjectRef },
}

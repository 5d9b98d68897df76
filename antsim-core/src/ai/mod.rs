//! Decision engine for computer-flown objects.
//!
//! Every few ticks, each object that can think (or that a person flies)
//! gets one decision pass. The pass never moves anything directly: it
//! decides which *keys* the object would be holding, exactly as if a player
//! were at the controls, and then applies held keys uniformly for both.
//!
//! # Pass Order
//!
//! 1. Presence-specific decision ([`Presence`]): fight, flee or travel in
//!    normal space; charge, fly or drop out of warp; land.
//! 2. Turn keys toward the heading goal, for autonomous objects.
//! 3. Merge computed keys into held keys. Near enemies, motion keys only
//!    change with a per-type skill probability and weapon keys one pass in
//!    three, which keeps ships from wiggling.
//! 4. One-shot special keys (adopt target, autopilot, give command).
//! 5. Apply held keys: turn rate, thrust, recharge, weapon fire, warp.
//!
//! # Determinism
//!
//! Every random draw comes from the deciding object's own stream, so a
//! pass over the same world with the same inputs yields the same keys.
//! Objects are visited in slot order.

mod engage;
mod presence;
mod target;

pub use engage::select_weapon;
pub use target::{
    coord_vector, resolve_destination, resolve_target, should_switch_target, DestinationFix,
    TargetFix,
};

use crate::action::{execute, Invocation};
use crate::combat;
use crate::effects::EffectSink;
use crate::fixed::{Coord, Fixed};
use crate::input::keys;
use crate::lifecycle;
use crate::object::{attr, Presence, SpaceObject};
use crate::registry::ObjectRef;
use crate::rotation::angle_difference;
use crate::scenario::{BaseObject, Scenario, WeaponSlot};
use crate::state::WorldState;
use tracing::instrument;

/// Heading error tolerated before a new heading goal is set.
pub const DIRECTION_ERROR: i32 = 5;
/// Half-width of the firing cone for weapons that do not aim themselves.
pub const SHOOT_ANGLE: i32 = 15;
/// A target facing us within this angle is considered dangerous.
pub const PARANOIA_ANGLE: i32 = 30;
pub const EVADE_ANGLE: i32 = 30;
/// Squared-distance drift before an object corrects its range to a target.
pub const MOTION_MARGIN: u32 = 5000;
pub const LANDING_DISTANCE: u32 = 1000;
/// Squared distance beyond which travelling objects try to warp.
pub const WARP_IN_DISTANCE: u32 = 16_777_216;
/// Warp needs more than `energy >> WARP_IN_ENERGY_FACTOR` to start, and
/// costs that much again to enter.
pub const WARP_IN_ENERGY_FACTOR: i32 = 3;
/// Turn rate for objects whose shape does not follow their heading.
pub const DEFAULT_TURN_RATE: Fixed = Fixed::from_raw(0x200);
/// Minimum squared distance at which objects notice enemies.
pub const ENGAGE_RANGE: u32 = 1_048_576;
/// Ticks spent fighting away from the destination before heading home.
pub const TIME_TO_CHECK_HOME: i32 = 900;
/// Speed shed per pass while dropping out of warp.
pub const WARP_ACCELERATION: Fixed = Fixed::ONE;
/// Guided objects give up on a target that swings further off the nose.
const GUIDED_LOCK_ANGLE: i32 = 60;
/// Ticks between recharge cycles, counted per decision pass.
const RECHARGE_CYCLE: i32 = combat::RECHARGE_SPEED;

/// Fire key for a weapon slot.
pub fn fire_key(slot: WeaponSlot) -> u32 {
    match slot {
        WeaponSlot::Pulse => keys::FIRE_1,
        WeaponSlot::Beam => keys::FIRE_2,
        WeaponSlot::Special => keys::FIRE_SPECIAL,
    }
}

/// Computer-flown: not under a person's hands, or on autopilot.
pub fn is_autonomous(obj: &SpaceObject) -> bool {
    !obj.has(attr::REMOTE_OR_HUMAN) || obj.has(attr::ON_AUTOPILOT)
}

/// Steer toward `angle`. Objects with a heading goal only move the goal,
/// and only when it is off by more than [`DIRECTION_ERROR`]; the returned
/// value is how far the current heading is from the goal. Objects without
/// one snap to the heading and return zero.
pub(crate) fn aim(obj: &mut SpaceObject, angle: i32) -> i32 {
    if obj.has(attr::HAS_DIRECTION_GOAL) {
        if angle_difference(angle, obj.direction_goal).abs() > DIRECTION_ERROR {
            obj.direction_goal = angle;
        }
        angle_difference(obj.direction, obj.direction_goal).abs()
    } else {
        obj.direction = angle;
        0
    }
}

/// Run the object's arrive action, once per destination.
pub(crate) fn arrive(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    direct: Option<ObjectRef>,
) {
    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    if obj.has_arrived {
        return;
    }
    let Some(range) = scenario
        .bases
        .get(obj.base)
        .map(|b| b.actions.arrive)
        .filter(|range| !range.is_empty())
    else {
        return;
    };
    obj.has_arrived = true;
    log::debug!("{:?} arrived", r);
    execute(
        state,
        scenario,
        sink,
        Invocation::new(range, Some(r), direct)
            .with_offset(Some(Coord::new(0, 0)))
            .delayable(),
    );
}

/// One decision pass over every thinking or person-flown object.
/// `time_pass` is the number of ticks since the previous pass. Returns the
/// number of objects that decided.
#[instrument(skip_all, name = "decision_tick")]
pub fn decision_tick(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    time_pass: i32,
) -> usize {
    state.sync_value = state.compute_sync_value();
    for admiral in &mut state.admirals {
        admiral.ships_left = 0;
    }

    let mut decided = 0;
    for r in state.objects.active_refs() {
        let thinks = state
            .objects
            .get(r)
            .is_some_and(|o| o.is_active() && o.has(attr::CAN_THINK | attr::REMOTE_OR_HUMAN));
        if thinks {
            think(state, scenario, sink, r, time_pass);
            decided += 1;
        }
    }
    log::trace!("Decision pass at tick {}: {} objects", state.tick, decided);
    decided
}

fn think(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    time_pass: i32,
) {
    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    let Some(base) = scenario.bases.get(obj.base) else {
        return;
    };
    obj.target_angle = obj.direction;
    obj.direction_goal = obj.direction;
    let (phase, owner) = (obj.presence, obj.owner);
    if let Some(admiral) = owner.and_then(|o| state.admirals.get_mut(o)) {
        admiral.ships_left += 1;
    }

    let mut pressed = match phase {
        Presence::Normal => presence::normal(state, scenario, sink, r, base, time_pass),
        Presence::WarpIn { .. } => presence::warp_in(state, scenario, sink, r, base, time_pass),
        Presence::Warping { .. } => presence::warping(state, r, base),
        Presence::WarpOut { .. } => presence::warp_out(state, scenario, sink, r, base),
        Presence::Landing { .. } => presence::landing(state, scenario, sink, r),
        Presence::Takeoff => state
            .objects
            .get(r)
            .map_or(0, |o| o.keys_down & keys::SPECIAL),
    };
    if !state.objects.is_active(r) {
        return;
    }

    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    if is_autonomous(obj) {
        pressed |= turn_keys(obj, base);
        merge_keys(obj, base, pressed);
    }

    let specials = obj.keys_down & keys::SPECIAL;
    obj.keys_down &= !keys::SPECIAL;
    if specials & keys::ADOPT_TARGET != 0 {
        lifecycle::set_destination(state, r, None);
    }
    if specials & keys::AUTOPILOT != 0 {
        lifecycle::toggle_autopilot(state, r);
    }
    if specials & keys::GIVE_COMMAND != 0 {
        if let Some(owner) = owner {
            lifecycle::give_command(state, owner);
        }
    }

    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    if obj.offline_time > 0 {
        if obj.random.next(obj.offline_time) > 5 {
            obj.keys_down = 0;
        }
        obj.offline_time -= 1;
    }
    apply_keys(obj, base, scenario);
    fire_weapons(state, scenario, sink, r, time_pass);
    apply_warp_key(state, r, base);
}

/// Turn keys toward the heading goal.
fn turn_keys(obj: &mut SpaceObject, base: &BaseObject) -> u32 {
    if !obj.has(attr::HAS_DIRECTION_GOAL) {
        return 0;
    }
    let rate = if obj.has(attr::SHAPE_FROM_DIRECTION) {
        if obj.has(attr::IS_GUIDED)
            && obj.target.is_some()
            && angle_difference(obj.target_angle, obj.direction).abs() > GUIDED_LOCK_ANGLE
        {
            obj.target = None;
            obj.direction_goal = obj.direction;
        }
        base.turn_rate
    } else {
        DEFAULT_TURN_RATE
    };
    let threshold = (rate << 1).to_int();
    let off = angle_difference(obj.direction_goal, obj.direction);
    if off.abs() <= threshold {
        0
    } else if off < 0 {
        keys::RIGHT
    } else {
        keys::LEFT
    }
}

/// Fold freshly computed keys into the held keys. A player's keys set this
/// pass win over the computer's.
fn merge_keys(obj: &mut SpaceObject, base: &BaseObject, pressed: u32) {
    if obj.keys_down & keys::MANUAL_OVERRIDE != 0 {
        obj.keys_down &= !keys::MANUAL_OVERRIDE;
        return;
    }
    if obj.closest_distance < ENGAGE_RANGE {
        if obj.random.next(base.skill_den) < base.skill_num {
            obj.keys_down = (obj.keys_down & !keys::MOTION) | (pressed & keys::MOTION);
        }
        if obj.random.next(3) == 1 {
            obj.keys_down = (obj.keys_down & !keys::WEAPON) | (pressed & keys::WEAPON);
        }
        obj.keys_down = (obj.keys_down & !keys::MISC) | (pressed & keys::MISC);
    } else {
        obj.keys_down = (obj.keys_down & keys::SPECIAL) | pressed;
    }
}

/// Turn, thrust and recharge from held keys.
fn apply_keys(obj: &mut SpaceObject, base: &BaseObject, scenario: &Scenario) {
    if obj.has(attr::HAS_DIRECTION_GOAL) && obj.offline_time <= 0 {
        let rate = if obj.has(attr::SHAPE_FROM_DIRECTION) {
            base.turn_rate
        } else {
            DEFAULT_TURN_RATE
        };
        obj.turn_velocity = if obj.keys_down & keys::LEFT != 0 {
            rate
        } else if obj.keys_down & keys::RIGHT != 0 {
            -rate
        } else {
            Fixed::ZERO
        };
    }

    obj.thrust = if obj.keys_down & keys::UP != 0 {
        if obj.presence.is_warp() {
            obj.thrust
        } else {
            base.max_thrust
        }
    } else if obj.keys_down & keys::DOWN != 0 {
        -base.max_thrust
    } else {
        Fixed::ZERO
    };

    if obj.recharge_time < RECHARGE_CYCLE {
        obj.recharge_time += 1;
        return;
    }
    obj.recharge_time = 0;
    match obj.presence {
        Presence::Warping { .. } => {
            obj.energy = (obj.energy - 1).max(0);
            obj.warp_energy_collected += 1;
        }
        Presence::Normal => combat::recharge(obj, scenario),
        _ => {}
    }
}

/// Count weapon cooldowns down and fire the weapons whose keys are held.
fn fire_weapons(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    time_pass: i32,
) {
    for slot in WeaponSlot::ALL {
        let Some(obj) = state.objects.get_mut(r).filter(|o| o.is_active()) else {
            return;
        };
        let target = obj.target;
        let held = obj.keys_down & fire_key(slot) != 0;
        let weapon = obj.weapon_mut(slot);
        if weapon.base.is_none() {
            continue;
        }
        if weapon.time > 0 {
            weapon.time -= time_pass;
        }
        if !held || weapon.time > 0 {
            continue;
        }
        let target = state.objects.resolve(target);
        if let Err(e) = combat::fire_weapon(state, scenario, sink, r, slot, target) {
            log::trace!("{:?} holds fire: {}", r, e);
        }
    }
}

/// Enter, hold or leave warp according to the warp key.
fn apply_warp_key(state: &mut WorldState, r: ObjectRef, base: &BaseObject) {
    let Some(obj) = state.objects.get_mut(r).filter(|o| o.is_active()) else {
        return;
    };
    let holding =
        obj.keys_down & keys::WARP != 0 && base.warp_speed.raw() > 0 && obj.energy > 0;
    if holding {
        match obj.presence {
            Presence::Warping { speed } | Presence::WarpOut { speed } => {
                obj.thrust = base.max_thrust.mul(speed);
            }
            Presence::Normal if obj.energy > base.energy >> WARP_IN_ENERGY_FACTOR => {
                obj.presence = Presence::WarpIn {
                    progress: 0,
                    cues: 0,
                };
                log::debug!("{:?} charging warp", r);
            }
            _ => {}
        }
    } else {
        match obj.presence {
            Presence::WarpIn { .. } => obj.presence = Presence::Normal,
            Presence::Warping { speed } => obj.presence = Presence::WarpOut { speed },
            Presence::WarpOut { speed } => obj.thrust = base.max_thrust.mul(speed),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;

//! Per-presence decisions. Each function returns the keys the object wants
//! held this pass.

use super::engage::{engage_target, evade, human_aim, mounted, TargetView};
use super::target::{coord_vector, resolve_destination, resolve_target};
use super::{
    aim, arrive, is_autonomous, DIRECTION_ERROR, ENGAGE_RANGE, EVADE_ANGLE, LANDING_DISTANCE,
    MOTION_MARGIN, PARANOIA_ANGLE, TIME_TO_CHECK_HOME, WARP_ACCELERATION, WARP_IN_DISTANCE,
    WARP_IN_ENERGY_FACTOR,
};
use crate::combat;
use crate::effects::EffectSink;
use crate::fixed::{Coord, FixedPoint};
use crate::input::keys;
use crate::lifecycle;
use crate::object::{attr, usage, Destination, Presence};
use crate::registry::ObjectRef;
use crate::rotation::{angle_difference, rot_point};
use crate::scenario::{BaseId, BaseObject, Scenario, WeaponSlot};
use crate::state::WorldState;

/// Progress a warp charge-up must pass before the object enters warp.
const WARP_IN_COMPLETE: i32 = 100;
/// Progress thresholds for the second, third and fourth charge-up cues.
const WARP_CUE_THRESHOLDS: [(u8, i32); 3] = [(2, 25), (3, 50), (4, 75)];
/// How far off a guided threat's heading an object flees.
const GUIDED_SWERVE: i32 = 90;

fn held_specials(state: &WorldState, r: ObjectRef) -> u32 {
    state
        .objects
        .get(r)
        .map_or(0, |o| o.keys_down & keys::SPECIAL)
}

/// Normal flight: fight, flee or travel.
pub(super) fn normal(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    base: &BaseObject,
    time_pass: i32,
) -> u32 {
    let mut pressed = held_specials(state, r);
    let Some(autonomous) = state.objects.get(r).map(is_autonomous) else {
        return pressed;
    };
    let fix = resolve_target(state, r);

    if !autonomous {
        if let Some(target) = fix.target {
            human_aim(state, scenario, r, target, fix.at, fix.distance);
        }
        return pressed;
    }

    let Some(me) = state.objects.get(r) else {
        return pressed;
    };
    let (attributes, engage_range, time_from_origin, health, longest, destination) = (
        me.attributes,
        me.engage_range,
        me.time_from_origin,
        me.health,
        me.longest_weapon_range,
        me.destination,
    );
    let has = |bits: u32| attributes & bits != 0;
    let view = fix
        .target
        .and_then(|t| TargetView::of(state, t).map(|v| (t, v)));
    let distance = fix.distance;

    if let Some((target, view)) = view {
        let engaged = has(attr::IS_GUIDED)
            || (has(attr::CAN_ENGAGE)
                && !has(attr::REMOTE_OR_HUMAN)
                && distance < engage_range
                && time_from_origin < TIME_TO_CHECK_HOME
                && view.has(attr::CAN_BE_ENGAGED));
        if engaged {
            let (fire, theta) = engage_target(state, scenario, r, &view, distance, time_pass);
            pressed |= fire;

            let afraid = has(attr::CAN_EVADE)
                && view.has(attr::CAN_BE_EVADED)
                && distance < view.longest_weapon_range
                && view.has(attr::HATED)
                && theta.abs() < PARANOIA_ANGLE
                && (!view.has(attr::CAN_BE_ENGAGED) || health <= view.health);
            if afraid {
                let swerve = if view.has(attr::IS_GUIDED) {
                    GUIDED_SWERVE
                } else {
                    EVADE_ANGLE
                };
                pressed |= evade(state, scenario, r, &view, theta, swerve, true);
            } else {
                pressed |= close_distance(state, r, distance, has(attr::IS_GUIDED));
            }

            if destination == Destination::Object(target)
                && distance < base.arrive_distance_squared()
            {
                arrive(state, scenario, sink, r, Some(target));
            }
            return pressed;
        }
    }

    if has(attr::IS_GUIDED) {
        return pressed | keys::UP;
    }

    if let Some((_, view)) = view {
        if !has(attr::REMOTE_OR_HUMAN) && distance < engage_range {
            let (fire, theta) = engage_target(state, scenario, r, &view, distance, time_pass);
            pressed |= fire;
            let attacking = view.has(attr::CAN_BE_ENGAGED)
                && has(attr::CAN_ENGAGE)
                && distance < longest
                && view.has(attr::HATED);
            let threatened = (distance < view.longest_weapon_range
                && theta.abs() < PARANOIA_ANGLE)
                || view.has(attr::IS_GUIDED);
            if !attacking
                && has(attr::CAN_EVADE)
                && view.has(attr::HATED)
                && view.has(attr::CAN_BE_EVADED)
                && threatened
            {
                let defend = distance < longest;
                pressed |= evade(state, scenario, r, &view, theta, EVADE_ANGLE, defend);
            }
        }
    }

    pressed | steer_to_destination(state, scenario, sink, r, base)
}

/// Hold the preferred distance from a target: close in until the shortest
/// weapon reaches, then back off or close up only when the distance has
/// drifted by more than the margin.
fn close_distance(state: &mut WorldState, r: ObjectRef, distance: u32, guided: bool) -> u32 {
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    if distance > obj.shortest_weapon_range || guided {
        return keys::UP;
    }
    if distance < MOTION_MARGIN || distance.saturating_add(MOTION_MARGIN) < obj.last_target_distance
    {
        obj.last_target_distance = distance;
        keys::DOWN
    } else if distance.saturating_sub(MOTION_MARGIN) > obj.last_target_distance {
        obj.last_target_distance = distance;
        keys::UP
    } else {
        0
    }
}

fn steer_to_destination(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    base: &BaseObject,
) -> u32 {
    let dest = resolve_destination(state, r);
    let leader = dest.object.and_then(|d| state.objects.get(d)).map(|d| {
        (
            d.owner,
            d.attributes,
            d.direction,
            d.keys_down & keys::WARP != 0,
        )
    });
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    if dest.idle {
        obj.time_from_origin = 0;
        return keys::DOWN;
    }
    if dest.lost {
        return keys::DOWN;
    }

    let (distance, angle) = coord_vector(obj.location, obj.direction, dest.at);
    let theta = aim(obj, angle);
    if distance < ENGAGE_RANGE {
        obj.time_from_origin = 0;
    }

    let mut pressed = 0;
    if distance > base.arrive_distance_squared() {
        if theta < EVADE_ANGLE {
            pressed |= keys::UP;
        }
        obj.last_target_distance = distance;
        if distance > WARP_IN_DISTANCE && theta <= DIRECTION_ERROR {
            pressed |= transport_keys(scenario, obj);
            if base.warp_speed.raw() > 0 && obj.energy > base.energy >> WARP_IN_ENERGY_FACTOR {
                pressed |= keys::WARP;
            }
        }
        return pressed;
    }

    if let Some((owner, their_attributes, their_direction, warping)) = leader {
        if owner == obj.owner && their_attributes & obj.attributes & attr::HAS_DIRECTION_GOAL != 0 {
            obj.direction_goal = their_direction;
            if warping
                && base.warp_speed.raw() > 0
                && angle_difference(obj.direction, their_direction).abs() < DIRECTION_ERROR
            {
                pressed |= keys::WARP;
            }
        }
    }

    if distance.saturating_add(MOTION_MARGIN) < obj.last_target_distance {
        obj.last_target_distance = distance;
        pressed |= keys::DOWN;
    } else if distance.saturating_sub(MOTION_MARGIN) > obj.last_target_distance {
        obj.last_target_distance = distance;
        pressed |= if theta < EVADE_ANGLE { keys::UP } else { keys::DOWN };
    }

    if distance < base.arrive_distance_squared() {
        arrive(state, scenario, sink, r, dest.object);
    }
    pressed
}

/// Charging up for warp.
pub(super) fn warp_in(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    base: &BaseObject,
    time_pass: i32,
) -> u32 {
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    let mut pressed = obj.keys_down & keys::SPECIAL;
    if is_autonomous(obj) {
        pressed = keys::WARP;
    }
    let Presence::WarpIn { progress, mut cues } = obj.presence else {
        return pressed;
    };
    let progress = progress.saturating_add(time_pass);

    if cues & 1 == 0 {
        cues |= 1;
        sink.warp_cue(r, 1);
    }
    for (stage, threshold) in WARP_CUE_THRESHOLDS {
        let bit = 1 << (stage - 1);
        if cues & bit == 0 && progress > threshold {
            cues |= bit;
            sink.warp_cue(r, stage);
        }
    }
    obj.presence = Presence::WarpIn { progress, cues };

    if progress > WARP_IN_COMPLETE {
        let cost = base.energy >> WARP_IN_ENERGY_FACTOR;
        obj.energy -= cost;
        obj.warp_energy_collected += cost;
        if obj.energy <= 0 {
            obj.presence = Presence::Normal;
            obj.energy = 0;
            log::debug!("{:?} ran dry charging warp", r);
        } else {
            obj.presence = Presence::Warping {
                speed: base.warp_speed,
            };
            obj.attributes &= !attr::OCCUPIES_SPACE;
            let (at, direction) = (obj.location, obj.direction);
            log::debug!("{:?} entered warp", r);
            spawn_flare(state, scenario, sink, scenario.warp_in_flare, at, direction);
        }
    }
    pressed
}

/// In warp: keep heading for the destination until close enough to drop out.
pub(super) fn warping(state: &mut WorldState, r: ObjectRef, base: &BaseObject) -> u32 {
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    let mut pressed = obj.keys_down & keys::SPECIAL;
    if obj.energy <= 0 {
        if let Presence::Warping { speed } = obj.presence {
            obj.presence = Presence::WarpOut { speed };
        }
    }
    if !is_autonomous(obj) {
        return pressed;
    }

    let dest = resolve_destination(state, r);
    if dest.idle || dest.lost {
        return pressed;
    }
    let dest_presence = dest
        .object
        .and_then(|d| state.objects.get(d))
        .map(|d| d.presence);
    let Some(obj) = state.objects.get_mut(r) else {
        return pressed;
    };
    let (distance, angle) = coord_vector(obj.location, obj.direction, dest.at);
    aim(obj, angle);

    if distance >= base.warp_out_distance_squared()
        || matches!(
            dest_presence,
            Some(Presence::WarpIn { .. } | Presence::Warping { .. })
        )
    {
        pressed |= keys::WARP;
    }
    pressed
}

/// Dropping out of warp: shed speed until back under normal maximum.
pub(super) fn warp_out(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    base: &BaseObject,
) -> u32 {
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    let pressed = obj.keys_down & keys::SPECIAL;
    let Presence::WarpOut { speed } = obj.presence else {
        return pressed;
    };
    let speed = speed - WARP_ACCELERATION;
    if speed >= obj.max_velocity {
        obj.presence = Presence::WarpOut { speed };
        return pressed;
    }

    let collected = std::mem::take(&mut obj.warp_energy_collected);
    combat::alter_battery(obj, base, collected);
    obj.presence = Presence::Normal;
    obj.attributes |= base.attributes & attr::OCCUPIES_SPACE;
    let (cos, sin) = rot_point(obj.direction);
    obj.velocity = FixedPoint::new(obj.max_velocity.mul(cos), obj.max_velocity.mul(sin));
    let (at, direction) = (obj.location, obj.direction);
    log::debug!("{:?} left warp", r);
    spawn_flare(state, scenario, sink, scenario.warp_out_flare, at, direction);
    pressed
}

/// Landing on the destination: approach, then shrink until gone.
pub(super) fn landing(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
) -> u32 {
    let dest = resolve_destination(state, r);
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    let Presence::Landing { mut scale, speed } = obj.presence else {
        return 0;
    };

    let mut pressed = 0;
    let (distance, theta) = if dest.idle || dest.lost {
        pressed |= keys::DOWN;
        (0, 0)
    } else {
        let (distance, angle) = coord_vector(obj.location, obj.direction, dest.at);
        (distance, aim(obj, angle))
    };

    if distance > LANDING_DISTANCE {
        pressed |= if theta < EVADE_ANGLE { keys::UP } else { keys::DOWN };
        obj.last_target_distance = distance;
    } else {
        pressed |= keys::DOWN;
        scale -= speed;
    }

    if scale <= 0 {
        log::debug!("{:?} landed", r);
        lifecycle::expire(state, scenario, sink, r, dest.object);
    } else {
        obj.presence = Presence::Landing { scale, speed };
        obj.scale = scale;
    }
    pressed
}

/// Create a motionless warp flare with no owner.
fn spawn_flare(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    flare: Option<BaseId>,
    at: Coord,
    direction: i32,
) {
    let Some(flare) = flare else {
        return;
    };
    let Some(r) = state.spawn(scenario, flare, at, direction, None) else {
        return;
    };
    if let Some(obj) = state.objects.get_mut(r) {
        obj.velocity = FixedPoint::ZERO;
    }
    lifecycle::finish_creation(state, scenario, sink, r);
}

/// Fire key for a special weapon that carries its owner across distance.
fn transport_keys(scenario: &Scenario, obj: &crate::object::SpaceObject) -> u32 {
    mounted(scenario, obj)
        .filter(|(slot, _, stats)| {
            *slot == WeaponSlot::Special && stats.usage & usage::TRANSPORTATION != 0
        })
        .fold(0, |acc, _| acc | keys::FIRE_SPECIAL)
}

//! Attack and evasion steering.

use super::target::CLOAK_BLUR_STATE;
use super::{fire_key, DIRECTION_ERROR, EVADE_ANGLE, SHOOT_ANGLE};
use crate::fixed::{isqrt, Coord, Fixed};
use crate::input::keys;
use crate::object::{attr, usage, SpaceObject};
use crate::registry::ObjectRef;
use crate::rotation::{add_angle, angle_between, angle_difference, ROT_180};
use crate::scenario::{BaseObject, Scenario, WeaponSlot, WeaponStats};
use crate::state::WorldState;

/// Aim jitter applied to the position of a well-cloaked target.
const CLOAK_POSITION_JITTER: i32 = 70;
/// Aim jitter applied to the heading toward a well-cloaked target.
const CLOAK_ANGLE_JITTER: i32 = 45;

/// Weapons mounted on `obj`, with their types.
pub(super) fn mounted<'a>(
    scenario: &'a Scenario,
    obj: &SpaceObject,
) -> impl Iterator<Item = (WeaponSlot, &'a BaseObject, &'a WeaponStats)> + 'a {
    let bases = WeaponSlot::ALL.map(|slot| (slot, obj.weapon(slot).base));
    bases.into_iter().filter_map(move |(slot, base)| {
        let weapon_type = scenario.bases.get(base?)?;
        let stats = weapon_type.weapon.as_ref()?;
        Some((slot, weapon_type, stats))
    })
}

/// The tightest sufficient weapon: the smallest range that still covers
/// `distance`. Ties go to the earlier candidate.
pub fn select_weapon(
    candidates: impl IntoIterator<Item = (WeaponSlot, u32)>,
    distance: u32,
) -> Option<WeaponSlot> {
    let mut best: Option<(WeaponSlot, u32)> = None;
    for (slot, range) in candidates {
        if range >= distance && best.map_or(true, |(_, r)| range < r) {
            best = Some((slot, range));
        }
    }
    best.map(|(slot, _)| slot)
}

/// Squared ranges of `obj`'s attacking weapons, for [`select_weapon`].
fn attacking_ranges(scenario: &Scenario, obj: &SpaceObject) -> Vec<(WeaponSlot, u32)> {
    mounted(scenario, obj)
        .filter(|(_, _, stats)| stats.usage & usage::ATTACKING != 0)
        .map(|(slot, _, stats)| (slot, stats.range_squared()))
        .collect()
}

fn jitter(random: &mut crate::random::Random, at: Coord) -> Coord {
    let span = CLOAK_POSITION_JITTER * 2;
    Coord::new(
        at.h - CLOAK_POSITION_JITTER + random.next(span),
        at.v - CLOAK_POSITION_JITTER + random.next(span),
    )
}

/// What the target looks like from the attacker's side.
#[derive(Debug, Clone, Copy)]
pub(super) struct TargetView {
    pub at: Coord,
    pub direction: i32,
    pub attributes: u32,
    pub cloak: i32,
    pub health: i32,
    pub longest_weapon_range: u32,
}

impl TargetView {
    pub fn of(state: &WorldState, target: ObjectRef) -> Option<Self> {
        state.objects.get(target).map(|t| TargetView {
            at: t.location,
            direction: t.direction,
            attributes: t.attributes,
            cloak: t.cloak_state,
            health: t.health,
            longest_weapon_range: t.longest_weapon_range,
        })
    }

    pub fn has(&self, bits: u32) -> bool {
        self.attributes & bits != 0
    }
}

/// Turn toward `target` and press the fire keys of every attacking weapon
/// that has it in range and in its cone. Returns the keys and the angle
/// between the target's tail and the line of approach, which evasion uses
/// to judge whether the target is looking back.
pub(super) fn engage_target(
    state: &mut WorldState,
    scenario: &Scenario,
    r: ObjectRef,
    target: &TargetView,
    distance: u32,
    time_pass: i32,
) -> (u32, i32) {
    let Some(obj) = state.objects.get_mut(r) else {
        return (0, 0);
    };
    let mut dest = target.at;
    if target.cloak > CLOAK_BLUR_STATE {
        dest = jitter(&mut obj.random, dest);
    }

    let in_range = distance < obj.longest_weapon_range && target.has(attr::HATED);
    if in_range && target.has(attr::CAN_BE_ENGAGED) && obj.has(attr::CAN_ACCEPT_DESTINATION) {
        obj.time_from_origin = obj.time_from_origin.saturating_add(time_pass);
    }

    let mut angle = angle_between(obj.location, dest).unwrap_or(obj.direction);
    if target.cloak > CLOAK_BLUR_STATE {
        let wobble = obj.random.next(CLOAK_ANGLE_JITTER * 2);
        angle = add_angle(angle, wobble - CLOAK_ANGLE_JITTER);
    }
    obj.target_angle = angle;

    let theta = if obj.has(attr::HAS_DIRECTION_GOAL) {
        if angle_difference(angle, obj.direction_goal).abs() > DIRECTION_ERROR
            || !obj.has(attr::IS_GUIDED)
        {
            obj.direction_goal = angle;
        }
        angle_difference(add_angle(target.direction, ROT_180), angle)
    } else {
        obj.direction = angle;
        0
    };

    let mut pressed = 0;
    if in_range {
        let off_bore = angle_difference(obj.direction, angle).abs();
        for (slot, weapon_type, stats) in mounted(scenario, obj) {
            if stats.usage & usage::ATTACKING != 0
                && (off_bore <= SHOOT_ANGLE || weapon_type.attributes & attr::AUTO_TARGET != 0)
                && distance < stats.range_squared()
            {
                pressed |= fire_key(slot);
            }
        }
    }
    (pressed, theta)
}

/// Fire keys of weapons usable for defense.
fn defensive_keys(scenario: &Scenario, obj: &SpaceObject) -> u32 {
    mounted(scenario, obj)
        .filter(|(_, _, stats)| stats.usage & usage::DEFENSE != 0)
        .fold(0, |acc, (slot, ..)| acc | fire_key(slot))
}

/// Turn away from `target` and thrust. `swerve` is how far off the target's
/// heading to run; `defend` also fires defensive weapons.
pub(super) fn evade(
    state: &mut WorldState,
    scenario: &Scenario,
    r: ObjectRef,
    target: &TargetView,
    theta: i32,
    swerve: i32,
    defend: bool,
) -> u32 {
    let Some(obj) = state.objects.get_mut(r) else {
        return 0;
    };
    let mut pressed = keys::UP;
    if obj.has(attr::HAS_DIRECTION_GOAL) {
        if defend {
            pressed |= defensive_keys(scenario, obj);
        }
        let side = match theta.signum() {
            1 => swerve,
            -1 => -swerve,
            _ if obj.location.h & 1 != 0 => -swerve,
            _ => swerve,
        };
        obj.direction_goal = add_angle(target.direction, side);
    } else {
        let side = if obj.random.next(2) != 0 {
            -EVADE_ANGLE
        } else {
            EVADE_ANGLE
        };
        obj.direction = add_angle(obj.direction, side);
    }
    pressed
}

/// Aim a person-flown object's target marker, leading a moving target with
/// the tightest weapon that reaches it.
pub(super) fn human_aim(
    state: &mut WorldState,
    scenario: &Scenario,
    r: ObjectRef,
    target: ObjectRef,
    at: Coord,
    distance: u32,
) {
    let Some(t) = state.objects.get(target) else {
        return;
    };
    let (target_velocity, target_hated, cloak) =
        (t.velocity, t.has(attr::HATED), t.cloak_state);
    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    if !obj.has(attr::CAN_ENGAGE) || distance >= obj.engage_range {
        return;
    }

    let mut dest = at;
    if distance < obj.longest_weapon_range && target_hated {
        let best = select_weapon(attacking_ranges(scenario, obj), distance);
        let inverse_speed = best
            .and_then(|slot| obj.weapon(slot).base)
            .and_then(|b| scenario.bases.get(b))
            .and_then(|b| b.weapon.as_ref())
            .map(|w| w.inverse_speed);
        if let Some(inverse_speed) = inverse_speed {
            let flight = inverse_speed.mul(Fixed::from_int(isqrt(distance) as i32));
            let lead_h = (target_velocity.h - obj.velocity.h).mul(flight).to_int();
            let lead_v = (target_velocity.v - obj.velocity.v).mul(flight).to_int();
            dest = Coord::new(dest.h.wrapping_add(lead_h), dest.v.wrapping_add(lead_v));
        }
    }

    let mut angle = angle_between(obj.location, dest).unwrap_or(obj.direction);
    if cloak > CLOAK_BLUR_STATE {
        let wobble = obj.random.next(CLOAK_ANGLE_JITTER * 2);
        angle = add_angle(angle, wobble - CLOAK_ANGLE_JITTER);
    }
    obj.target_angle = angle;
}

//! Damage, energy and weapons.

use crate::action::{execute, Invocation};
use crate::effects::EffectSink;
use crate::fixed::{Coord, FixedPoint};
use crate::object::{SpaceObject, CLOAK_OFF_STATE_MAX};
use crate::registry::ObjectRef;
use crate::rotation::{add_angle, rot_point};
use crate::scenario::{BaseObject, Scenario, WeaponSlot};
use crate::state::WorldState;
use thiserror::Error;

/// Battery capacity as a multiple of maximum energy.
pub const BATTERY_RATIO: i32 = 5;
/// Ticks between recharge cycles.
pub const RECHARGE_SPEED: i32 = 4;
/// Energy spent per point of health repaired.
pub const HEALTH_RATIO: i32 = 5;
/// Energy spent per unit of weapon charge.
pub const WEAPON_RATIO: i32 = 2;
/// Energy moved from the battery per recharge cycle.
pub const ENERGY_CHUNK: i32 = 11;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeaponError {
    #[error("object is gone")]
    MissingObject,
    #[error("no weapon in {0:?} slot")]
    NotEquipped(WeaponSlot),
    #[error("{slot:?} cooling down for {remaining} ticks")]
    CoolingDown { slot: WeaponSlot, remaining: i32 },
    #[error("{slot:?} needs {needed} energy, have {have}")]
    NoEnergy {
        slot: WeaponSlot,
        needed: i32,
        have: i32,
    },
    #[error("{0:?} out of ammunition")]
    NoAmmo(WeaponSlot),
}

/// Add `amount` to health, saturating. Objects dropping below zero are
/// destroyed. An object already flagged for removal keeps its health.
pub fn alter_health(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    amount: i32,
) {
    let Some(obj) = state.objects.get_mut(r).filter(|o| o.is_active()) else {
        return;
    };
    obj.health = obj.health.saturating_add(amount);
    if obj.health < 0 {
        destroy(state, scenario, sink, r);
    }
}

/// Add `amount` to energy. Energy never drops below zero; the excess over
/// the type's maximum spills into the battery. Dying objects are left alone.
pub fn alter_energy(obj: &mut SpaceObject, base: &BaseObject, amount: i32) {
    if !obj.is_active() {
        return;
    }
    obj.energy = obj.energy.saturating_add(amount);
    if obj.energy < 0 {
        obj.energy = 0;
    } else if obj.energy > base.energy {
        let excess = obj.energy - base.energy;
        obj.energy = base.energy;
        alter_battery(obj, base, excess);
    }
}

pub fn alter_battery(obj: &mut SpaceObject, base: &BaseObject, amount: i32) {
    let capacity = base.energy.saturating_mul(BATTERY_RATIO);
    obj.battery = obj.battery.saturating_add(amount).clamp(0, capacity.max(0));
}

/// Start cloaking if not already cloaked.
pub fn cloak(obj: &mut SpaceObject) {
    if obj.cloak_state == 0 {
        obj.cloak_state = 1;
    }
}

/// Drop an active or partial cloak; the object fades back in over time.
pub fn uncloak(obj: &mut SpaceObject) {
    if obj.cloak_state > 0 {
        obj.cloak_state = CLOAK_OFF_STATE_MAX;
    }
}

/// Run an object's destroy action and, unless its type survives
/// destruction, flag it for removal and count the loss.
pub fn destroy(state: &mut WorldState, scenario: &Scenario, sink: &mut dyn EffectSink, r: ObjectRef) {
    let Some(obj) = state.objects.get(r).filter(|o| o.is_active()) else {
        return;
    };
    let (base_id, owner) = (obj.base, obj.owner);
    let Some(base) = scenario.bases.get(base_id) else {
        return;
    };

    if !base.actions.destroy_dont_die {
        state.objects.mark_for_removal(r);
        if let Some(admiral) = owner.and_then(|o| state.admirals.get_mut(o)) {
            admiral.losses += 1;
        }
        log::debug!("Destroyed {} ({:?})", base.name, r);
        sink.destroyed(r, base_id, owner);
    }
    execute(
        state,
        scenario,
        sink,
        Invocation::new(base.actions.destroy, Some(r), None).delayable(),
    );
}

/// `target` was struck by `source`: apply the source's damage and run the
/// source's collide action.
pub fn hit_object(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    target: ObjectRef,
    source: ObjectRef,
) {
    let Some(src) = state.objects.get(source) else {
        return;
    };
    let (damage, collide, source_active) = match scenario.bases.get(src.base) {
        Some(b) => (b.damage, b.actions.collide, src.is_active()),
        None => return,
    };
    let Some(obj) = state.objects.get_mut(target).filter(|o| o.is_active()) else {
        return;
    };
    obj.time_from_origin = 0;
    if obj.cloak_state > 0 {
        obj.cloak_state = 1;
    }
    alter_health(state, scenario, sink, target, damage.saturating_neg());

    if source_active {
        execute(
            state,
            scenario,
            sink,
            Invocation::new(collide, Some(source), Some(target)).delayable(),
        );
    }
}

/// Firing offset of mount `position` for an object facing `direction`.
pub fn mount_offset(position: FixedPoint, direction: i32) -> Coord {
    let (cos, sin) = rot_point(add_angle(direction, -90));
    let (fcos, fsin) = (-cos, -sin);
    let h = position.h.mul(fcos) - position.v.mul(fsin);
    let v = position.h.mul(fsin) + position.v.mul(fcos);
    Coord::new(h.to_int_floor(), v.to_int_floor())
}

/// Fire one weapon now, ignoring keys: pays energy and ammunition, starts
/// the cooldown and runs the weapon's activate action aimed at `target`.
pub fn fire_weapon(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    slot: WeaponSlot,
    target: Option<ObjectRef>,
) -> Result<(), WeaponError> {
    let obj = state
        .objects
        .get_mut(r)
        .filter(|o| o.is_active())
        .ok_or(WeaponError::MissingObject)?;
    let weapon_base = obj.weapon(slot).base.ok_or(WeaponError::NotEquipped(slot))?;
    let weapon_type = scenario
        .bases
        .get(weapon_base)
        .ok_or(WeaponError::NotEquipped(slot))?;
    let stats = weapon_type
        .weapon
        .as_ref()
        .ok_or(WeaponError::NotEquipped(slot))?;
    let positions = scenario
        .bases
        .get(obj.base)
        .and_then(|b| b.mount(slot))
        .map_or(&[][..], |m| m.positions.as_slice());

    let state_now = *obj.weapon(slot);
    if state_now.time > 0 {
        return Err(WeaponError::CoolingDown {
            slot,
            remaining: state_now.time,
        });
    }
    if obj.energy < stats.energy_cost {
        return Err(WeaponError::NoEnergy {
            slot,
            needed: stats.energy_cost,
            have: obj.energy,
        });
    }
    if stats.ammo > 0 && state_now.ammo <= 0 {
        return Err(WeaponError::NoAmmo(slot));
    }

    if slot != WeaponSlot::Special {
        uncloak(obj);
    }
    obj.energy -= stats.energy_cost;
    let direction = obj.direction;
    let weapon = obj.weapon_mut(slot);
    weapon.position = if positions.is_empty() {
        0
    } else {
        (weapon.position + 1) % positions.len()
    };
    let offset = match slot {
        WeaponSlot::Special => None,
        _ => Some(mount_offset(
            positions.get(weapon.position).copied().unwrap_or_default(),
            direction,
        )),
    };
    weapon.time = stats.fire_time;
    if stats.ammo > 0 {
        weapon.ammo -= 1;
    }

    execute(
        state,
        scenario,
        sink,
        Invocation::new(weapon_type.actions.activate, Some(r), target)
            .with_offset(offset)
            .delayable(),
    );
    Ok(())
}

/// One recharge cycle for an object in normal space: battery to energy,
/// energy to health below half, energy to weapon restock.
pub fn recharge(obj: &mut SpaceObject, scenario: &Scenario) {
    let Some(base) = scenario.bases.get(obj.base) else {
        return;
    };
    if obj.energy < base.energy - ENERGY_CHUNK && obj.battery > ENERGY_CHUNK {
        obj.battery -= ENERGY_CHUNK;
        obj.energy += ENERGY_CHUNK;
    }
    if obj.health < base.health / 2 && obj.energy > HEALTH_RATIO {
        obj.health += 1;
        obj.energy -= HEALTH_RATIO;
    }
    for slot in WeaponSlot::ALL {
        let Some(stats) = obj
            .weapon(slot)
            .base
            .and_then(|b| scenario.bases.get(b))
            .and_then(|b| b.weapon.as_ref())
        else {
            continue;
        };
        let energy = obj.energy;
        let weapon = obj.weapon_mut(slot);
        if weapon.ammo < stats.ammo >> 1 && energy >= WEAPON_RATIO {
            weapon.charge += 1;
            obj.energy -= WEAPON_RATIO;
            let weapon = obj.weapon_mut(slot);
            if stats.restock_cost >= 0 && weapon.charge >= stats.restock_cost {
                weapon.charge -= stats.restock_cost;
                weapon.ammo += 1;
            }
        }
    }
}

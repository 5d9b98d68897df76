//! Simulation objects: ships, projectiles, planets, flares.
//!
//! A [`SpaceObject`] is a live instance of a [`BaseObject`](crate::scenario::BaseObject)
//! type. Objects live in the [`ObjectTable`](crate::registry::ObjectTable) and
//! are referred to by [`ObjectRef`] handles that carry the object's identity,
//! so references held across ticks can always be checked for staleness.

use crate::fixed::{Coord, Fixed, FixedPoint};
use crate::random::Random;
use crate::registry::ObjectRef;
use crate::scenario::{AdmiralId, BaseId, BaseObject, Scenario, WeaponSlot};
use serde::{Deserialize, Serialize};

/// Attribute bits carried by base types and live objects.
pub mod attr {
    pub const CAN_TURN: u32 = 0x0000_0001;
    pub const CAN_BE_ENGAGED: u32 = 0x0000_0002;
    pub const HAS_DIRECTION_GOAL: u32 = 0x0000_0004;
    pub const IS_REMOTE: u32 = 0x0000_0008;
    pub const IS_HUMAN_CONTROLLED: u32 = 0x0000_0010;
    pub const IS_BEAM: u32 = 0x0000_0020;
    pub const DOES_BOUNCE: u32 = 0x0000_0040;
    pub const IS_SELF_ANIMATED: u32 = 0x0000_0080;
    pub const SHAPE_FROM_DIRECTION: u32 = 0x0000_0100;
    pub const IS_PLAYER_SHIP: u32 = 0x0000_0200;
    pub const CAN_BE_DESTINATION: u32 = 0x0000_0400;
    pub const CAN_ENGAGE: u32 = 0x0000_0800;
    pub const CAN_EVADE: u32 = 0x0000_1000;
    pub const CAN_ACCEPT_MESSAGES: u32 = 0x0000_2000;
    pub const CAN_ACCEPT_BUILD: u32 = 0x0000_4000;
    pub const CAN_ACCEPT_DESTINATION: u32 = 0x0000_8000;
    pub const AUTO_TARGET: u32 = 0x0001_0000;
    pub const ANIMATION_CYCLE: u32 = 0x0002_0000;
    pub const CAN_COLLIDE: u32 = 0x0004_0000;
    pub const CAN_BE_HIT: u32 = 0x0008_0000;
    pub const IS_DESTINATION: u32 = 0x0010_0000;
    pub const HIDE_EFFECT: u32 = 0x0020_0000;
    pub const RELEASE_ENERGY_ON_DEATH: u32 = 0x0040_0000;
    pub const HATED: u32 = 0x0080_0000;
    pub const OCCUPIES_SPACE: u32 = 0x0100_0000;
    pub const STATIC_DESTINATION: u32 = 0x0200_0000;
    pub const CAN_BE_EVADED: u32 = 0x0400_0000;
    pub const NEUTRAL_DEATH: u32 = 0x0800_0000;
    pub const IS_GUIDED: u32 = 0x1000_0000;
    pub const APPEAR_ON_RADAR: u32 = 0x2000_0000;
    pub const ON_AUTOPILOT: u32 = 0x8000_0000;

    pub const CAN_THINK: u32 = CAN_ENGAGE | CAN_EVADE | CAN_ACCEPT_DESTINATION;
    pub const REMOTE_OR_HUMAN: u32 = IS_REMOTE | IS_HUMAN_CONTROLLED;
    pub const POTENTIAL_TARGET: u32 = CAN_BE_ENGAGED | CAN_BE_EVADED;

    /// Flags set at runtime that survive a change of base type.
    pub const RUNTIME_FLAGS: u32 =
        STATIC_DESTINATION | ON_AUTOPILOT | IS_REMOTE | IS_HUMAN_CONTROLLED | IS_PLAYER_SHIP;
}

/// Weapon usage bits on a weapon type.
pub mod usage {
    pub const TRANSPORTATION: u32 = 0x01;
    pub const ATTACKING: u32 = 0x02;
    pub const DEFENSE: u32 = 0x04;
}

/// Marker for objects that never age out.
pub const IMMORTAL: i32 = -1;

/// Sprite scale at full size; landing shrinks toward zero.
pub const NATURAL_SCALE: i32 = 4096;

pub const CLOAK_ON_STATE_MAX: i32 = 254;
pub const CLOAK_OFF_STATE_MAX: i32 = -252;
pub const CLOAK_RATE: i32 = 2;

/// Whether a slot holds a live object or one waiting for the end-of-tick sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    InUse,
    ToBeFreed,
}

/// Warp and landing lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    Normal,
    /// Charging up; `progress` runs to 100 and `cues` records which sound cues fired.
    WarpIn { progress: i32, cues: u8 },
    Warping { speed: Fixed },
    WarpOut { speed: Fixed },
    Landing { scale: i32, speed: i32 },
    Takeoff,
}

impl Presence {
    pub fn is_warp(&self) -> bool {
        matches!(
            self,
            Presence::WarpIn { .. } | Presence::Warping { .. } | Presence::WarpOut { .. }
        )
    }
}

/// Where an object is headed. An object destination and a coordinate are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Destination {
    #[default]
    None,
    Object(ObjectRef),
    Point(Coord),
}

/// Runtime state of one weapon slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WeaponState {
    pub base: Option<BaseId>,
    pub ammo: i32,
    /// Ticks until the weapon may fire again.
    pub time: i32,
    /// Index of the next firing mount.
    pub position: usize,
    /// Energy banked toward the next restocked round.
    pub charge: i32,
}

impl WeaponState {
    pub fn equipped(scenario: &Scenario, base: BaseId) -> Self {
        let ammo = scenario
            .bases
            .get(base)
            .and_then(|b| b.weapon.as_ref())
            .map_or(0, |w| w.ammo);
        Self {
            base: Some(base),
            ammo,
            time: 0,
            position: 0,
            charge: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceObject {
    pub handle: ObjectRef,
    pub active: Activity,
    pub base: BaseId,
    pub owner: Option<AdmiralId>,
    pub attributes: u32,

    pub location: Coord,
    pub velocity: FixedPoint,
    pub motion_fraction: FixedPoint,
    pub max_velocity: Fixed,
    pub thrust: Fixed,
    pub direction: i32,
    pub direction_goal: i32,
    pub target_angle: i32,
    pub turn_velocity: Fixed,
    pub turn_fraction: Fixed,

    pub presence: Presence,
    pub keys_down: u32,

    pub destination: Destination,
    /// Last known position of the destination object.
    pub destination_location: Option<Coord>,
    /// The destination object's own destination, followed when it disappears.
    pub dest_object_dest: Option<ObjectRef>,
    pub target: Option<ObjectRef>,
    pub closest: Option<ObjectRef>,
    pub closest_distance: u32,
    pub engage_range: u32,
    pub longest_weapon_range: u32,
    pub shortest_weapon_range: u32,
    pub last_target_distance: u32,
    pub time_from_origin: i32,

    pub health: i32,
    pub energy: i32,
    pub battery: i32,
    pub warp_energy_collected: i32,
    pub recharge_time: i32,
    pub pulse: WeaponState,
    pub beam: WeaponState,
    pub special: WeaponState,

    pub random: Random,
    pub age: i32,
    pub offline_time: i32,
    pub cloak_state: i32,
    pub occupation: i32,
    pub has_arrived: bool,
    pub scale: i32,
}

impl SpaceObject {
    /// Instantiate `base` at `location`. The handle is assigned by the table on insert.
    pub fn new(
        scenario: &Scenario,
        base_id: BaseId,
        base: &BaseObject,
        location: Coord,
        direction: i32,
        owner: Option<AdmiralId>,
        random: Random,
    ) -> Self {
        let mut obj = SpaceObject {
            handle: ObjectRef::NONE,
            active: Activity::InUse,
            base: base_id,
            owner,
            attributes: base.attributes,
            location,
            velocity: FixedPoint::ZERO,
            motion_fraction: FixedPoint::ZERO,
            max_velocity: base.max_velocity,
            thrust: Fixed::ZERO,
            direction,
            direction_goal: direction,
            target_angle: direction,
            turn_velocity: Fixed::ZERO,
            turn_fraction: Fixed::ZERO,
            presence: Presence::Normal,
            keys_down: 0,
            destination: Destination::None,
            destination_location: None,
            dest_object_dest: None,
            target: None,
            closest: None,
            closest_distance: u32::MAX,
            engage_range: 0,
            longest_weapon_range: 0,
            shortest_weapon_range: 0,
            last_target_distance: 0,
            time_from_origin: 0,
            health: base.health,
            energy: base.energy,
            battery: base.energy.saturating_mul(crate::combat::BATTERY_RATIO),
            warp_energy_collected: 0,
            recharge_time: 0,
            pulse: WeaponState::default(),
            beam: WeaponState::default(),
            special: WeaponState::default(),
            random,
            age: IMMORTAL,
            offline_time: 0,
            cloak_state: 0,
            occupation: 0,
            has_arrived: false,
            scale: NATURAL_SCALE,
        };
        obj.equip_from_base(scenario, base, false);
        obj
    }

    pub fn weapon(&self, slot: WeaponSlot) -> &WeaponState {
        match slot {
            WeaponSlot::Pulse => &self.pulse,
            WeaponSlot::Beam => &self.beam,
            WeaponSlot::Special => &self.special,
        }
    }

    pub fn weapon_mut(&mut self, slot: WeaponSlot) -> &mut WeaponState {
        match slot {
            WeaponSlot::Pulse => &mut self.pulse,
            WeaponSlot::Beam => &mut self.beam,
            WeaponSlot::Special => &mut self.special,
        }
    }

    #[inline]
    pub fn has(&self, bits: u32) -> bool {
        self.attributes & bits != 0
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active == Activity::InUse
    }

    /// Mount the weapons named by `base`. With `keep_ammo`, a slot that keeps
    /// its weapon type also keeps its ammunition count.
    pub fn equip_from_base(&mut self, scenario: &Scenario, base: &BaseObject, keep_ammo: bool) {
        for slot in WeaponSlot::ALL {
            let mounted = base.mount(slot).map(|m| m.base);
            let previous = *self.weapon(slot);
            let mut next = match mounted {
                Some(weapon) => WeaponState::equipped(scenario, weapon),
                None => WeaponState::default(),
            };
            if keep_ammo && previous.base.is_some() && previous.base == next.base {
                next.ammo = previous.ammo;
            }
            *self.weapon_mut(slot) = next;
        }
        self.recompute_weapon_ranges(scenario);
    }

    /// Refresh cached squared weapon ranges and the engage range.
    pub fn recompute_weapon_ranges(&mut self, scenario: &Scenario) {
        let mut longest = 0u32;
        let mut shortest = u32::MAX;
        for slot in WeaponSlot::ALL {
            let Some(stats) = self
                .weapon(slot)
                .base
                .and_then(|b| scenario.bases.get(b))
                .and_then(|b| b.weapon.as_ref())
            else {
                continue;
            };
            if stats.usage & usage::ATTACKING == 0 {
                continue;
            }
            let range = stats.range_squared();
            longest = longest.max(range);
            shortest = shortest.min(range);
        }
        self.longest_weapon_range = longest;
        self.shortest_weapon_range = if shortest == u32::MAX { 0 } else { shortest };
        self.engage_range = crate::ai::ENGAGE_RANGE.max(longest);
    }
}

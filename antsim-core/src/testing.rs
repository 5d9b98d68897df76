//! Builders for small worlds in tests.

use crate::fixed::{Coord, Fixed};
use crate::object::{attr, usage};
use crate::scenario::{
    AdmiralDef, AdmiralId, BaseActions, BaseId, BaseObject, Initial, InitialId, Scenario,
    WeaponStats,
};
use crate::state::WorldState;

/// A thinking warship with no weapons.
pub fn ship_base(name: &str) -> BaseObject {
    BaseObject {
        name: name.to_string(),
        attributes: attr::CAN_TURN
            | attr::CAN_BE_ENGAGED
            | attr::CAN_BE_EVADED
            | attr::HAS_DIRECTION_GOAL
            | attr::CAN_ENGAGE
            | attr::CAN_EVADE
            | attr::CAN_ACCEPT_DESTINATION
            | attr::CAN_COLLIDE
            | attr::CAN_BE_HIT
            | attr::HATED
            | attr::OCCUPIES_SPACE
            | attr::SHAPE_FROM_DIRECTION,
        tags: Default::default(),
        health: 100,
        energy: 100,
        damage: 0,
        max_velocity: Fixed::from_int(4),
        max_thrust: Fixed::HALF,
        warp_speed: Fixed::ZERO,
        warp_out_distance: 0,
        turn_rate: Fixed::from_int(2),
        initial_velocity: Fixed::ZERO,
        initial_direction: None,
        initial_age: None,
        skill_num: 1,
        skill_den: 1,
        arrive_distance: 0,
        collision_radius: 0,
        occupy_count: 0,
        pulse: None,
        beam: None,
        special: None,
        weapon: None,
        actions: BaseActions::default(),
    }
}

/// An attacking weapon type with the given linear range, free to fire.
pub fn weapon_base(name: &str, range: u32) -> BaseObject {
    BaseObject {
        attributes: 0,
        health: 0,
        energy: 0,
        weapon: Some(WeaponStats {
            usage: usage::ATTACKING,
            range,
            fire_time: 10,
            ammo: 0,
            energy_cost: 0,
            restock_cost: -1,
            inverse_speed: Fixed::ZERO,
        }),
        ..ship_base(name)
    }
}

/// Fluent world construction. Objects are placed as scenario initials, so
/// their order is their slot order.
pub struct WorldBuilder {
    scenario: Scenario,
    flagships: Vec<(AdmiralId, InitialId)>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            scenario: Scenario {
                name: "test".to_string(),
                seed: 0,
                bases: Vec::new(),
                actions: Vec::new(),
                admirals: Vec::new(),
                initials: Vec::new(),
                conditions: Vec::new(),
                warp_in_flare: None,
                warp_out_flare: None,
            },
            flagships: Vec::new(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.scenario.seed = seed;
        self
    }

    pub fn with_base(mut self, base: BaseObject) -> Self {
        self.scenario.bases.push(base);
        self
    }

    pub fn with_admiral(mut self, name: &str) -> Self {
        self.scenario.admirals.push(AdmiralDef {
            name: name.to_string(),
            cash: Fixed::ZERO,
            human: false,
        });
        self
    }

    pub fn with_human(mut self, name: &str) -> Self {
        self.scenario.admirals.push(AdmiralDef {
            name: name.to_string(),
            cash: Fixed::ZERO,
            human: true,
        });
        self
    }

    pub fn with_object(mut self, base: BaseId, owner: Option<AdmiralId>, at: Coord) -> Self {
        self.scenario.initials.push(Initial {
            base,
            owner,
            at,
            direction: 0,
            flagship: false,
            hidden: false,
            target: None,
            destination: None,
        });
        self
    }

    /// Make the object placed `initial`-th the admiral's flagship and
    /// control object, whoever owns it.
    pub fn with_flagship(mut self, admiral: AdmiralId, initial: InitialId) -> Self {
        match self.scenario.initials.get_mut(initial) {
            Some(i) if i.owner == Some(admiral) => i.flagship = true,
            _ => self.flagships.push((admiral, initial)),
        }
        self
    }

    pub fn build(self) -> (WorldState, Scenario) {
        let mut state = WorldState::new(&self.scenario);
        for (admiral, initial) in self.flagships {
            let r = state.initials.get(initial).copied().flatten();
            if let Some(a) = state.admirals.get_mut(admiral) {
                a.flagship = r;
                a.control = r;
            }
        }
        (state, self.scenario)
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use crate::action::ActionQueue;
use crate::fixed::{Coord, Fixed, FixedPoint};
use crate::object::{attr, Destination, SpaceObject};
use crate::random::Random;
use crate::registry::{ObjectRef, ObjectTable};
use crate::rotation::rot_point;
use crate::scenario::{AdmiralId, BaseId, InitialId, Scenario, SCORE_SLOTS};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A player, human or computer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admiral {
    pub name: String,
    pub score: [i32; SCORE_SLOTS],
    pub cash: Fixed,
    /// Thinking ships owned, recounted every decision pass.
    pub ships_left: i32,
    pub losses: i32,
    pub flagship: Option<ObjectRef>,
    /// Object currently selected for orders.
    pub control: Option<ObjectRef>,
    /// Object currently selected as a target.
    pub target: Option<ObjectRef>,
    pub human: bool,
}

/// How the scenario ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victory {
    pub winner: Option<AdmiralId>,
    pub next: Option<String>,
    pub text: String,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionState {
    pub enabled: bool,
    /// Number of times the condition has fired.
    pub fired: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub tick: u64,
    /// World stream; seeds new objects and picks random sounds.
    pub random: Random,
    pub objects: ObjectTable,
    pub admirals: Vec<Admiral>,
    /// Live object for each scenario initial, once created.
    pub initials: Vec<Option<ObjectRef>>,
    pub conditions: Vec<ConditionState>,
    pub queue: ActionQueue,
    /// Player keys switched off by actions.
    pub disabled_keys: u32,
    pub victory: Option<Victory>,
    /// Seed plus the sum of object positions at the last decision pass.
    pub sync_value: i32,
}

impl WorldState {
    /// Build the starting world: admirals, visible initial objects and
    /// their targets and destinations.
    pub fn new(scenario: &Scenario) -> Self {
        let mut state = WorldState {
            tick: 0,
            random: Random::seed_from_u64(scenario.seed),
            objects: ObjectTable::new(),
            admirals: scenario
                .admirals
                .iter()
                .map(|def| Admiral {
                    name: def.name.clone(),
                    score: [0; SCORE_SLOTS],
                    cash: def.cash,
                    ships_left: 0,
                    losses: 0,
                    flagship: None,
                    control: None,
                    target: None,
                    human: def.human,
                })
                .collect(),
            initials: vec![None; scenario.initials.len()],
            conditions: scenario
                .conditions
                .iter()
                .map(|c| ConditionState {
                    enabled: c.enabled,
                    fired: 0,
                })
                .collect(),
            queue: ActionQueue::new(),
            disabled_keys: 0,
            victory: None,
            sync_value: 0,
        };

        let visible: Vec<InitialId> = (0..scenario.initials.len())
            .filter(|&i| !scenario.initials[i].hidden)
            .collect();
        for &i in &visible {
            state.create_initial(scenario, i);
        }
        for &i in &visible {
            state.link_initial(scenario, i);
        }
        log::info!(
            "World '{}' ready: {} objects, {} admirals",
            scenario.name,
            state.objects.active_count(),
            state.admirals.len()
        );
        state
    }

    /// Allocate a new object of type `base`. Draws the object's seed from
    /// the world stream; runs no actions. Returns `None` when the type is
    /// unknown or the table is full.
    pub fn spawn(
        &mut self,
        scenario: &Scenario,
        base: BaseId,
        at: Coord,
        direction: i32,
        owner: Option<AdmiralId>,
    ) -> Option<ObjectRef> {
        let base_type = scenario.bases.get(base)?;
        let random = Random::new(self.random.next(0x7fff));
        let mut obj = SpaceObject::new(scenario, base, base_type, at, direction, owner, random);
        if let Some(age) = base_type.initial_age {
            obj.age = age.sample(&mut obj.random);
        }
        let (cos, sin) = rot_point(direction);
        obj.velocity = FixedPoint::new(
            cos.mul(base_type.initial_velocity),
            sin.mul(base_type.initial_velocity),
        );
        let r = self.objects.insert(obj);
        if r.is_none() {
            log::warn!("Object table full; could not create {}", base_type.name);
        }
        r
    }

    /// Create the object for scenario initial `index` and record it. A
    /// flagship becomes its owner's control object; a human owner's flagship
    /// takes player input.
    pub fn create_initial(&mut self, scenario: &Scenario, index: InitialId) -> Option<ObjectRef> {
        let initial = scenario.initials.get(index)?;
        if let Some(existing) = self.initials[index].filter(|&r| self.objects.is_active(r)) {
            return Some(existing);
        }
        let r = self.spawn(
            scenario,
            initial.base,
            initial.at,
            initial.direction,
            initial.owner,
        )?;
        self.initials[index] = Some(r);
        if initial.flagship {
            if let Some(admiral) = initial.owner.and_then(|o| self.admirals.get_mut(o)) {
                admiral.flagship = Some(r);
                admiral.control = Some(r);
                if admiral.human {
                    if let Some(obj) = self.objects.get_mut(r) {
                        obj.attributes |= attr::IS_HUMAN_CONTROLLED | attr::IS_PLAYER_SHIP;
                    }
                }
            }
        }
        Some(r)
    }

    /// Point initial `index` at its scenario target and destination, if
    /// those exist yet.
    pub fn link_initial(&mut self, scenario: &Scenario, index: InitialId) {
        let Some(initial) = scenario.initials.get(index) else {
            return;
        };
        let Some(r) = self.initials.get(index).copied().flatten() else {
            return;
        };
        let lookup = |i: Option<InitialId>| i.and_then(|i| self.initials.get(i).copied().flatten());
        let target = lookup(initial.target);
        let destination = lookup(initial.destination)
            .and_then(|d| self.objects.get(d).map(|o| (d, o.location)));
        let Some(obj) = self.objects.get_mut(r) else {
            return;
        };
        if target.is_some() {
            obj.target = target;
        }
        if let Some((d, at)) = destination {
            obj.destination = Destination::Object(d);
            obj.destination_location = Some(at);
        }
    }

    /// World seed plus every live object's position, wrapping. Two peers
    /// running the same inputs agree on this value every decision pass.
    pub fn compute_sync_value(&self) -> i32 {
        self.objects.iter_active().fold(self.random.seed, |acc, o| {
            acc.wrapping_add(o.location.h).wrapping_add(o.location.v)
        })
    }

    /// Deterministic hash of the simulation-relevant state, for desync detection.
    pub fn checksum(&self) -> u64 {
        use rustc_hash::FxHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = FxHasher::default();

        self.tick.hash(&mut hasher);
        self.random.hash(&mut hasher);
        self.disabled_keys.hash(&mut hasher);

        // Objects in slot order
        for obj in self.objects.iter() {
            obj.handle.hash(&mut hasher);
            obj.active.hash(&mut hasher);
            obj.base.hash(&mut hasher);
            obj.owner.hash(&mut hasher);
            obj.attributes.hash(&mut hasher);
            obj.location.hash(&mut hasher);
            obj.velocity.hash(&mut hasher);
            obj.direction.hash(&mut hasher);
            obj.presence.hash(&mut hasher);
            obj.keys_down.hash(&mut hasher);
            obj.health.hash(&mut hasher);
            obj.energy.hash(&mut hasher);
            obj.battery.hash(&mut hasher);
            obj.age.hash(&mut hasher);
            obj.random.hash(&mut hasher);
            obj.target.hash(&mut hasher);
            obj.destination.hash(&mut hasher);
        }

        for admiral in &self.admirals {
            admiral.score.hash(&mut hasher);
            admiral.cash.hash(&mut hasher);
            admiral.losses.hash(&mut hasher);
        }

        for condition in &self.conditions {
            condition.enabled.hash(&mut hasher);
        }
        self.queue.len().hash(&mut hasher);
        self.victory.is_some().hash(&mut hasher);

        hasher.finish()
    }
}

//! Scenario tables: object types, the action table, admirals, initial
//! objects and conditions.
//!
//! Tables are loaded once from JSON, validated, and then only read. All
//! cross-references are plain indices; validation guarantees every index is
//! in bounds so the simulation never has to handle a dangling one.
//!
//! Fixed-point fields are written as raw Q24.8 integers (`256` is `1.0`).

use crate::action::{Action, ActionKind, ActionRange, ObjectSelector, Tags, ValueRange};
use crate::fixed::{Coord, Fixed, FixedPoint};
use crate::registry::MAXIMUM_RELEVANT_DISTANCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type BaseId = usize;
pub type AdmiralId = usize;
pub type InitialId = usize;
pub type ConditionId = usize;

/// Number of score slots per admiral.
pub const SCORE_SLOTS: usize = 3;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{owner}: action range {start}+{count} exceeds action table of {len}")]
    ActionRange {
        owner: String,
        start: usize,
        count: usize,
        len: usize,
    },
    #[error("{context}: unknown base type {index}")]
    UnknownBase { context: String, index: usize },
    #[error("{context}: unknown admiral {index}")]
    UnknownAdmiral { context: String, index: usize },
    #[error("{context}: unknown condition {index}")]
    UnknownCondition { context: String, index: usize },
    #[error("{context}: unknown initial {index}")]
    UnknownInitial { context: String, index: usize },
    #[error("{context}: score slot {index} out of range")]
    ScoreSlot { context: String, index: usize },
    #[error("base {base}: {slot:?} mount uses {weapon}, which has no weapon stats")]
    NotAWeapon {
        base: String,
        slot: WeaponSlot,
        weapon: String,
    },
    #[error("base {base}: skill denominator must be positive, got {den}")]
    InvalidSkill { base: String, den: i32 },
    #[error("base {base}: weapon range {range} exceeds {max}")]
    WeaponRange { base: String, range: u32, max: u32 },
}

/// The three weapon slots of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSlot {
    Pulse,
    Beam,
    Special,
}

impl WeaponSlot {
    pub const ALL: [WeaponSlot; 3] = [WeaponSlot::Pulse, WeaponSlot::Beam, WeaponSlot::Special];
}

/// Stats of a type that is fired as a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Bits from [`crate::object::usage`].
    pub usage: u32,
    /// Linear range; compared squared at runtime.
    pub range: u32,
    /// Cooldown between shots, in ticks.
    pub fire_time: i32,
    /// Rounds carried; zero means unlimited.
    #[serde(default)]
    pub ammo: i32,
    #[serde(default)]
    pub energy_cost: i32,
    /// Charge needed to restock one round; negative disables restocking.
    #[serde(default = "no_restock")]
    pub restock_cost: i32,
    /// Reciprocal of projectile speed, for lead targeting.
    #[serde(default)]
    pub inverse_speed: Fixed,
}

fn no_restock() -> i32 {
    -1
}

impl WeaponStats {
    pub fn range_squared(&self) -> u32 {
        self.range.saturating_mul(self.range)
    }
}

/// A weapon mounted on a type. Firing positions are relative to the object
/// and rotate with it; see [`crate::combat::mount_offset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponMount {
    pub base: BaseId,
    #[serde(default)]
    pub positions: Vec<FixedPoint>,
}

/// Action hooks of a type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseActions {
    #[serde(default)]
    pub destroy: ActionRange,
    /// Run the destroy action without removing the object.
    #[serde(default)]
    pub destroy_dont_die: bool,
    #[serde(default)]
    pub expire: ActionRange,
    #[serde(default)]
    pub create: ActionRange,
    #[serde(default)]
    pub collide: ActionRange,
    #[serde(default)]
    pub activate: ActionRange,
    #[serde(default)]
    pub arrive: ActionRange,
}

/// An object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseObject {
    pub name: String,
    #[serde(default)]
    pub attributes: u32,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub energy: i32,
    /// Damage dealt to objects this one collides with.
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub max_velocity: Fixed,
    #[serde(default)]
    pub max_thrust: Fixed,
    #[serde(default)]
    pub warp_speed: Fixed,
    /// Linear distance at which warping objects drop out of warp.
    #[serde(default)]
    pub warp_out_distance: u32,
    #[serde(default)]
    pub turn_rate: Fixed,
    /// Speed along the initial heading when created.
    #[serde(default)]
    pub initial_velocity: Fixed,
    /// Random heading offset added when created.
    #[serde(default)]
    pub initial_direction: Option<ValueRange<i32>>,
    /// Lifetime in ticks; absent means immortal.
    #[serde(default)]
    pub initial_age: Option<ValueRange<i32>>,
    #[serde(default = "one")]
    pub skill_num: i32,
    #[serde(default = "one")]
    pub skill_den: i32,
    /// Linear distance at which the arrive action fires.
    #[serde(default)]
    pub arrive_distance: u32,
    /// Collision radius; zero never collides.
    #[serde(default)]
    pub collision_radius: i32,
    /// Occupation needed before an occupy action captures this object.
    #[serde(default)]
    pub occupy_count: i32,
    #[serde(default)]
    pub pulse: Option<WeaponMount>,
    #[serde(default)]
    pub beam: Option<WeaponMount>,
    #[serde(default)]
    pub special: Option<WeaponMount>,
    #[serde(default)]
    pub weapon: Option<WeaponStats>,
    #[serde(default)]
    pub actions: BaseActions,
}

fn one() -> i32 {
    1
}

impl BaseObject {
    pub fn mount(&self, slot: WeaponSlot) -> Option<&WeaponMount> {
        match slot {
            WeaponSlot::Pulse => self.pulse.as_ref(),
            WeaponSlot::Beam => self.beam.as_ref(),
            WeaponSlot::Special => self.special.as_ref(),
        }
    }

    pub fn arrive_distance_squared(&self) -> u32 {
        self.arrive_distance.saturating_mul(self.arrive_distance)
    }

    pub fn warp_out_distance_squared(&self) -> u32 {
        self.warp_out_distance.saturating_mul(self.warp_out_distance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmiralDef {
    pub name: String,
    #[serde(default)]
    pub cash: Fixed,
    /// Controlled by a human through player inputs.
    #[serde(default)]
    pub human: bool,
}

/// An object placed at scenario start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initial {
    pub base: BaseId,
    #[serde(default)]
    pub owner: Option<AdmiralId>,
    pub at: Coord,
    #[serde(default)]
    pub direction: i32,
    /// Becomes its owner's flagship and control object.
    #[serde(default)]
    pub flagship: bool,
    /// Not created until revealed by an action.
    #[serde(default)]
    pub hidden: bool,
    /// Initial index to target.
    #[serde(default)]
    pub target: Option<InitialId>,
    /// Initial index to head for.
    #[serde(default)]
    pub destination: Option<InitialId>,
}

/// What makes a condition fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionTrigger {
    /// Tick count reached.
    Time { ticks: u64 },
    /// The initial's object is gone.
    Destroyed { initial: InitialId },
    /// The initial's object belongs to `player` (absent: nobody).
    Owner {
        initial: InitialId,
        player: Option<AdmiralId>,
    },
    /// The admiral has at most this many thinking ships left.
    Ships { player: AdmiralId, at_most: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Keep firing every check while true instead of disabling after the first.
    #[serde(default)]
    pub persistent: bool,
    /// Without a trigger the condition is a plain flag.
    #[serde(default)]
    pub trigger: Option<ConditionTrigger>,
    #[serde(default)]
    pub subject: Option<ObjectSelector>,
    #[serde(default)]
    pub direct: Option<ObjectSelector>,
    #[serde(default)]
    pub action: ActionRange,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    pub bases: Vec<BaseObject>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub admirals: Vec<AdmiralDef>,
    #[serde(default)]
    pub initials: Vec<Initial>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub warp_in_flare: Option<BaseId>,
    #[serde(default)]
    pub warp_out_flare: Option<BaseId>,
}

impl Scenario {
    /// Parse and validate a scenario from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        log::info!(
            "Loaded scenario '{}': {} bases, {} actions, {} initials",
            scenario.name,
            scenario.bases.len(),
            scenario.actions.len(),
            scenario.initials.len()
        );
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn action_slice(&self, range: ActionRange) -> &[Action] {
        self.actions
            .get(range.start..range.end())
            .unwrap_or_default()
    }

    /// Check every cross-reference. Filters that no type can ever satisfy
    /// are reported as warnings, not errors.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for base in &self.bases {
            if base.skill_den <= 0 {
                return Err(ScenarioError::InvalidSkill {
                    base: base.name.clone(),
                    den: base.skill_den,
                });
            }
            if let Some(weapon) = &base.weapon {
                if weapon.range > MAXIMUM_RELEVANT_DISTANCE {
                    return Err(ScenarioError::WeaponRange {
                        base: base.name.clone(),
                        range: weapon.range,
                        max: MAXIMUM_RELEVANT_DISTANCE,
                    });
                }
            }
            for slot in WeaponSlot::ALL {
                if let Some(mount) = base.mount(slot) {
                    let weapon = self.base(mount.base, &base.name)?;
                    if weapon.weapon.is_none() {
                        return Err(ScenarioError::NotAWeapon {
                            base: base.name.clone(),
                            slot,
                            weapon: weapon.name.clone(),
                        });
                    }
                }
            }
            let a = &base.actions;
            for (hook, range) in [
                ("destroy", a.destroy),
                ("expire", a.expire),
                ("create", a.create),
                ("collide", a.collide),
                ("activate", a.activate),
                ("arrive", a.arrive),
            ] {
                self.range(range, || format!("base {} {}", base.name, hook))?;
            }
        }

        for flare in [self.warp_in_flare, self.warp_out_flare].into_iter().flatten() {
            self.base(flare, "warp flare")?;
        }

        for (i, initial) in self.initials.iter().enumerate() {
            let context = format!("initial {}", i);
            self.base(initial.base, &context)?;
            if let Some(owner) = initial.owner {
                self.admiral(owner, &context)?;
            }
            for index in [initial.target, initial.destination].into_iter().flatten() {
                self.initial(index, &context)?;
            }
        }

        for condition in &self.conditions {
            let context = format!("condition {}", condition.name);
            self.range(condition.action, || context.clone())?;
            for selector in [condition.subject, condition.direct].into_iter().flatten() {
                self.selector(selector, &context)?;
            }
            match &condition.trigger {
                Some(ConditionTrigger::Destroyed { initial }) => {
                    self.initial(*initial, &context)?;
                }
                Some(ConditionTrigger::Owner { initial, player }) => {
                    self.initial(*initial, &context)?;
                    if let Some(p) = player {
                        self.admiral(*p, &context)?;
                    }
                }
                Some(ConditionTrigger::Ships { player, .. }) => {
                    self.admiral(*player, &context)?;
                }
                Some(ConditionTrigger::Time { .. }) | None => {}
            }
        }

        for (i, action) in self.actions.iter().enumerate() {
            self.validate_action(i, action)?;
        }
        Ok(())
    }

    fn validate_action(&self, i: usize, action: &Action) -> Result<(), ScenarioError> {
        let context = format!("action {} ({})", i, action.kind.name());
        for selector in [action.override_.subject, action.override_.direct]
            .into_iter()
            .flatten()
        {
            self.selector(selector, &context)?;
        }
        match &action.kind {
            ActionKind::Create { base, .. }
            | ActionKind::Equip { base, .. }
            | ActionKind::Morph { base, .. } => {
                self.base(*base, &context)?;
            }
            ActionKind::Capture { player } | ActionKind::Pay { player, .. } => {
                if let Some(p) = player {
                    self.admiral(*p, &context)?;
                }
            }
            ActionKind::Win { player, .. } => {
                if let Some(p) = player {
                    self.admiral(*p, &context)?;
                }
            }
            ActionKind::Score { player, which, .. } => {
                if let Some(p) = player {
                    self.admiral(*p, &context)?;
                }
                if *which >= SCORE_SLOTS {
                    return Err(ScenarioError::ScoreSlot {
                        context,
                        index: *which,
                    });
                }
            }
            ActionKind::Condition { enable, disable } => {
                for &c in enable.iter().chain(disable) {
                    if c >= self.conditions.len() {
                        return Err(ScenarioError::UnknownCondition { context, index: c });
                    }
                }
            }
            ActionKind::Reveal { initial } => {
                for &index in initial {
                    self.initial(index, &context)?;
                }
            }
            _ => {}
        }
        if !action.filter.is_empty()
            && (action.filter.attributes != 0 || !action.filter.tags.is_empty())
            && !self.bases.iter().any(|b| action.filter.applies_to_base(b))
        {
            log::warn!("{}: filter matches no object type", context);
        }
        Ok(())
    }

    fn range(&self, range: ActionRange, owner: impl FnOnce() -> String) -> Result<(), ScenarioError> {
        if range.end() > self.actions.len() {
            return Err(ScenarioError::ActionRange {
                owner: owner(),
                start: range.start,
                count: range.count,
                len: self.actions.len(),
            });
        }
        Ok(())
    }

    fn base(&self, index: BaseId, context: &str) -> Result<&BaseObject, ScenarioError> {
        self.bases
            .get(index)
            .ok_or_else(|| ScenarioError::UnknownBase {
                context: context.to_string(),
                index,
            })
    }

    fn admiral(&self, index: AdmiralId, context: &str) -> Result<(), ScenarioError> {
        if index >= self.admirals.len() {
            return Err(ScenarioError::UnknownAdmiral {
                context: context.to_string(),
                index,
            });
        }
        Ok(())
    }

    fn initial(&self, index: InitialId, context: &str) -> Result<(), ScenarioError> {
        if index >= self.initials.len() {
            return Err(ScenarioError::UnknownInitial {
                context: context.to_string(),
                index,
            });
        }
        Ok(())
    }

    fn selector(&self, selector: ObjectSelector, context: &str) -> Result<(), ScenarioError> {
        match selector {
            ObjectSelector::Initial(i) => self.initial(i, context),
            ObjectSelector::Flagship(a) | ObjectSelector::Control(a) | ObjectSelector::Target(a) => {
                self.admiral(a, context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Filter, KillKind};
    use crate::testing::{ship_base, weapon_base};

    fn minimal() -> Scenario {
        Scenario {
            name: "test".to_string(),
            seed: 1,
            bases: vec![ship_base("fighter")],
            actions: vec![],
            admirals: vec![],
            initials: vec![],
            conditions: vec![],
            warp_in_flare: None,
            warp_out_flare: None,
        }
    }

    #[test]
    fn test_from_json_minimal() {
        let json = r#"{
            "name": "duel",
            "seed": 7,
            "bases": [{"name": "rock", "health": 50}],
            "admirals": [{"name": "red"}],
            "initials": [{"base": 0, "owner": 0, "at": {"h": 10, "v": -4}}]
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.bases[0].skill_den, 1);
        assert_eq!(scenario.initials[0].at, Coord::new(10, -4));
        assert!(!scenario.initials[0].hidden);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Scenario::from_json("{\"name\": 3}"),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_range_past_table() {
        let mut scenario = minimal();
        scenario.bases[0].actions.destroy = ActionRange::new(0, 2);
        scenario.actions.push(Action::new(ActionKind::Kill {
            kind: KillKind::Expire,
        }));
        let err = scenario.validate().unwrap_err();
        assert!(matches!(err, ScenarioError::ActionRange { len: 1, .. }));
        assert!(err.to_string().contains("destroy"));
    }

    #[test]
    fn test_rejects_unknown_references() {
        let mut scenario = minimal();
        scenario.actions.push(Action::new(ActionKind::Score {
            player: Some(2),
            which: 0,
            value: 1,
        }));
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownAdmiral { index: 2, .. })
        ));

        let mut scenario = minimal();
        scenario.actions.push(Action::new(ActionKind::Morph {
            keep_ammo: false,
            base: 9,
        }));
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownBase { index: 9, .. })
        ));

        let mut scenario = minimal();
        scenario.actions.push(Action::new(ActionKind::Condition {
            enable: vec![0],
            disable: vec![],
        }));
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownCondition { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_mount_without_weapon_stats() {
        let mut scenario = minimal();
        scenario.bases.push(ship_base("not-a-gun"));
        scenario.bases[0].pulse = Some(WeaponMount {
            base: 1,
            positions: vec![],
        });
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::NotAWeapon { .. })
        ));

        scenario.bases[1] = weapon_base("gun", 300);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_skill_and_range() {
        let mut scenario = minimal();
        scenario.bases[0].skill_den = 0;
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::InvalidSkill { den: 0, .. })
        ));

        let mut scenario = minimal();
        scenario.bases.push(weapon_base("lance", 50_000));
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::WeaponRange { range: 50_000, .. })
        ));
    }

    #[test]
    fn test_unsatisfiable_filter_is_only_a_warning() {
        let mut scenario = minimal();
        scenario.actions.push(
            Action::new(ActionKind::Heal { value: 1 }).with_filter(Filter {
                attributes: crate::object::attr::IS_GUIDED,
                ..Filter::default()
            }),
        );
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}

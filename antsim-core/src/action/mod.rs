//! Data-driven actions.
//!
//! Actions are immutable templates loaded with the scenario. Base types name
//! contiguous [`ActionRange`]s of the action table for their destroy, expire,
//! create, collide, activate and arrive hooks; the interpreter in [`exec`]
//! runs a range against a subject and a direct object.
//!
//! JSON shape, one action:
//!
//! ```json
//! {"type": "heal", "value": -15, "reflexive": false,
//!  "filter": {"attributes": 2, "tags": ["ship"], "owner": "different"}}
//! ```

pub mod exec;
pub mod filter;
mod handlers;
pub mod queue;

use crate::fixed::{Coord, Fixed};
use crate::random::Random;
use crate::scenario::{AdmiralId, BaseId, ConditionId, InitialId, WeaponSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use exec::{execute, Invocation};
pub use filter::{resolve_focus, Filter};
pub use queue::{drain, ActionQueue, QueuedAction, DEFAULT_MAX_ACTIONS_PER_DRAIN};

/// A contiguous slice of the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionRange {
    pub start: usize,
    pub count: usize,
}

impl ActionRange {
    pub const EMPTY: ActionRange = ActionRange { start: 0, count: 0 };

    pub const fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.count)
    }

    /// The part of the range after index `i` (absolute), used to resume after a delay.
    pub fn after(&self, i: usize) -> ActionRange {
        let start = (i + 1).min(self.end());
        ActionRange::new(start, self.end() - start)
    }
}

/// Inclusive-exclusive value range sampled with an object's random stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub begin: T,
    pub end: T,
}

impl ValueRange<i32> {
    pub fn fixed(value: i32) -> Self {
        Self {
            begin: value,
            end: value,
        }
    }

    pub fn sample(&self, random: &mut Random) -> i32 {
        let span = self.end.wrapping_sub(self.begin);
        if span > 1 {
            self.begin.wrapping_add(random.next(span))
        } else {
            self.begin
        }
    }
}

impl ValueRange<Fixed> {
    pub fn sample(&self, random: &mut Random) -> Fixed {
        let span = (self.end - self.begin).raw();
        if span > 1 {
            self.begin + Fixed::from_raw(random.next(span))
        } else {
            self.begin
        }
    }
}

/// Owner relation between the focus and the subject required by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerRelation {
    #[default]
    Any,
    Same,
    Different,
}

/// Explicit reference that replaces the subject or direct object of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ObjectSelector {
    /// The object created from scenario initial `n`.
    Initial(InitialId),
    Flagship(AdmiralId),
    /// The admiral's currently selected control object.
    Control(AdmiralId),
    /// The admiral's currently selected target.
    Target(AdmiralId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Override {
    #[serde(default)]
    pub subject: Option<ObjectSelector>,
    #[serde(default)]
    pub direct: Option<ObjectSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Within {
    #[default]
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillKind {
    /// Remove the focus without further effects.
    None,
    /// Remove the subject without further effects.
    Expire,
    /// Remove the focus and run its destroy action.
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOrigin {
    #[default]
    Level,
    Subject,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    /// Zero the focus velocity.
    Stop,
    /// Impart the subject's velocity like a collision.
    Collide,
    /// Scale the focus velocity down.
    Decelerate,
    /// Set the focus velocity along the subject's heading.
    Set,
    /// Add to the focus velocity along the subject's heading.
    Boost,
    /// Set the focus velocity along its own heading.
    Cruise,
}

/// Input keys that actions may enable or disable for human players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    Fire1 = 4,
    Fire2 = 5,
    FireSpecial = 6,
    Warp = 7,
    SelectFriend = 8,
    SelectFoe = 9,
    SelectBase = 10,
    Target = 11,
    Order = 12,
    ZoomIn = 13,
    ZoomOut = 14,
    CompUp = 15,
    CompDown = 16,
    CompAccept = 17,
    CompBack = 18,
    CompMessage = 26,
    CompSpecial = 27,
    CompBuild = 28,
    ZoomShortcut = 29,
    SendMessage = 30,
    Mouse = 31,
}

impl Key {
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn mask(keys: &[Key]) -> u32 {
        keys.iter().fold(0, |m, k| m | k.bit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hue {
    Gray,
    Orange,
    Yellow,
    Blue,
    Green,
    Purple,
    Indigo,
    Salmon,
    Gold,
    Aqua,
    Pink,
    PaleGreen,
    PalePurple,
    SkyBlue,
    Tan,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Main,
    Build,
    Special,
    Message,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zoom {
    Double,
    Actual,
    Half,
    Quarter,
    Sixteenth,
    Foe,
    Object,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// The effect payload of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Set the focus age, or add to it when `relative`.
    Age {
        #[serde(default)]
        relative: bool,
        value: ValueRange<i32>,
    },
    /// Make the focus stand in for initial `which` (plus the first admiral's first score).
    Assume { which: usize },
    /// Set the focus speed cap; absent restores the type default.
    CapSpeed { value: Option<Fixed> },
    Capture { player: Option<AdmiralId> },
    /// Evaluate scenario conditions immediately.
    Check,
    Cloak,
    Condition {
        #[serde(default)]
        enable: Vec<ConditionId>,
        #[serde(default)]
        disable: Vec<ConditionId>,
    },
    Create {
        base: BaseId,
        count: Option<ValueRange<i32>>,
        #[serde(default)]
        relative_velocity: bool,
        #[serde(default)]
        relative_direction: bool,
        distance: Option<i32>,
        #[serde(default)]
        within: Within,
        /// Products target the creator's target instead of the direct object.
        #[serde(default)]
        inherit: bool,
        /// Consume a random draw from the creator even when the count is fixed.
        #[serde(default)]
        legacy_random: bool,
    },
    /// Defer the rest of the range by `duration` ticks.
    Delay { duration: u32 },
    Disable { value: ValueRange<Fixed> },
    Energize { value: i32 },
    Equip { which: WeaponSlot, base: BaseId },
    Fire { which: WeaponSlot },
    Flash {
        duration: u32,
        #[serde(default)]
        color: Rgb,
    },
    Heal { value: i32 },
    Hold,
    Key {
        #[serde(default)]
        disable: Vec<Key>,
        #[serde(default)]
        enable: Vec<Key>,
    },
    Kill { kind: KillKind },
    Land { speed: i32 },
    Message {
        id: Option<i64>,
        #[serde(default)]
        pages: Vec<String>,
    },
    Morph {
        #[serde(default)]
        keep_ammo: bool,
        base: BaseId,
    },
    Move {
        #[serde(default)]
        origin: MoveOrigin,
        to: Option<Coord>,
        distance: Option<i32>,
        #[serde(default)]
        within: Within,
    },
    Occupy { value: i32 },
    Order,
    Pay {
        value: Fixed,
        player: Option<AdmiralId>,
    },
    Push { kind: PushKind, value: Fixed },
    Reveal { initial: Vec<InitialId> },
    Score {
        player: Option<AdmiralId>,
        which: usize,
        value: i32,
    },
    Select { screen: Screen, line: i32 },
    Play {
        #[serde(default)]
        priority: u8,
        #[serde(default)]
        persistence: u32,
        #[serde(default)]
        absolute: bool,
        #[serde(default)]
        volume: i32,
        sound: Option<String>,
        #[serde(default)]
        any: Vec<String>,
    },
    Spark {
        count: i32,
        hue: Hue,
        decay: i32,
        velocity: Fixed,
    },
    Spin { value: ValueRange<Fixed> },
    Thrust { value: ValueRange<Fixed> },
    Warp,
    Win {
        player: Option<AdmiralId>,
        next: Option<String>,
        #[serde(default)]
        text: String,
    },
    Zoom { value: Zoom },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Age { .. } => "age",
            ActionKind::Assume { .. } => "assume",
            ActionKind::CapSpeed { .. } => "cap_speed",
            ActionKind::Capture { .. } => "capture",
            ActionKind::Check => "check",
            ActionKind::Cloak => "cloak",
            ActionKind::Condition { .. } => "condition",
            ActionKind::Create { .. } => "create",
            ActionKind::Delay { .. } => "delay",
            ActionKind::Disable { .. } => "disable",
            ActionKind::Energize { .. } => "energize",
            ActionKind::Equip { .. } => "equip",
            ActionKind::Fire { .. } => "fire",
            ActionKind::Flash { .. } => "flash",
            ActionKind::Heal { .. } => "heal",
            ActionKind::Hold => "hold",
            ActionKind::Key { .. } => "key",
            ActionKind::Kill { .. } => "kill",
            ActionKind::Land { .. } => "land",
            ActionKind::Message { .. } => "message",
            ActionKind::Morph { .. } => "morph",
            ActionKind::Move { .. } => "move",
            ActionKind::Occupy { .. } => "occupy",
            ActionKind::Order => "order",
            ActionKind::Pay { .. } => "pay",
            ActionKind::Push { .. } => "push",
            ActionKind::Reveal { .. } => "reveal",
            ActionKind::Score { .. } => "score",
            ActionKind::Select { .. } => "select",
            ActionKind::Play { .. } => "play",
            ActionKind::Spark { .. } => "spark",
            ActionKind::Spin { .. } => "spin",
            ActionKind::Thrust { .. } => "thrust",
            ActionKind::Warp => "warp",
            ActionKind::Win { .. } => "win",
            ActionKind::Zoom { .. } => "zoom",
        }
    }

    /// Kinds that fall back to the subject when neither an override nor the
    /// reflexive/direct choice yields a focus.
    pub fn focus_defaults_to_subject(&self) -> bool {
        matches!(
            self,
            ActionKind::Create { .. }
                | ActionKind::Play { .. }
                | ActionKind::Spark { .. }
                | ActionKind::Kill {
                    kind: KillKind::Expire
                }
                | ActionKind::Order
        )
    }

    /// Kinds whose effect does not touch any object, so they run with no focus.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            ActionKind::Check
                | ActionKind::Condition { .. }
                | ActionKind::Delay { .. }
                | ActionKind::Flash { .. }
                | ActionKind::Key { .. }
                | ActionKind::Message { .. }
                | ActionKind::Reveal { .. }
                | ActionKind::Select { .. }
                | ActionKind::Zoom { .. }
        )
    }

    /// Kinds naming an explicit player run without consulting the filter.
    pub fn is_unconditional(&self) -> bool {
        matches!(
            self,
            ActionKind::Score {
                player: Some(_),
                ..
            } | ActionKind::Win {
                player: Some(_),
                ..
            } | ActionKind::Pay {
                player: Some(_),
                ..
            }
        )
    }
}

/// One action template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Apply the effect to the subject instead of the direct object.
    #[serde(default)]
    pub reflexive: Option<bool>,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default, rename = "override")]
    pub override_: Override,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            reflexive: None,
            filter: Filter::default(),
            override_: Override::default(),
        }
    }

    pub fn reflexive(mut self) -> Self {
        self.reflexive = Some(true);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_override(mut self, override_: Override) -> Self {
        self.override_ = override_;
        self
    }
}

/// Tags carried by base types and required by filters.
pub type Tags = BTreeSet<String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_shape() {
        let json = r#"{"type":"heal","value":-15,"reflexive":true,
            "filter":{"attributes":2,"tags":["ship"],"owner":"different"}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind, ActionKind::Heal { value: -15 });
        assert_eq!(action.reflexive, Some(true));
        assert_eq!(action.filter.owner, OwnerRelation::Different);
        assert!(action.filter.tags.contains("ship"));
        assert_eq!(action.override_, Override::default());
    }

    #[test]
    fn test_action_defaults() {
        let action: Action =
            serde_json::from_str(r#"{"type":"create","base":3}"#).unwrap();
        match action.kind {
            ActionKind::Create {
                base,
                count,
                within,
                inherit,
                ..
            } => {
                assert_eq!(base, 3);
                assert_eq!(count, None);
                assert_eq!(within, Within::Circle);
                assert!(!inherit);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(action.reflexive, None);
    }

    #[test]
    fn test_override_selector_json() {
        let json = r#"{"type":"warp","override":{"subject":{"kind":"flagship","value":1}}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.override_.subject, Some(ObjectSelector::Flagship(1)));
    }

    #[test]
    fn test_range_after() {
        let r = ActionRange::new(4, 5);
        assert_eq!(r.after(4), ActionRange::new(5, 4));
        assert_eq!(r.after(8), ActionRange::new(9, 0));
    }

    #[test]
    fn test_value_range_sampling() {
        let mut random = Random::new(1);
        assert_eq!(ValueRange::fixed(7).sample(&mut random), 7);
        assert_eq!(random.seed, 1, "fixed ranges draw nothing");
        let range = ValueRange { begin: 10, end: 20 };
        for _ in 0..50 {
            let v = range.sample(&mut random);
            assert!((10..20).contains(&v));
        }
    }

    #[test]
    fn test_key_bits() {
        assert_eq!(Key::Up.bit(), 0x1);
        assert_eq!(Key::Warp.bit(), 0x80);
        assert_eq!(Key::Mouse.bit(), 0x8000_0000);
        assert_eq!(Key::mask(&[Key::Left, Key::Right]), 0xc);
    }
}

//! Deferred action chains and the per-drain work list.
//!
//! A DELAY action parks the remainder of its range here, keyed by the tick
//! it becomes due. [`drain`] runs everything due at or before the current
//! tick, in the order it was scheduled.
//!
//! The same struct holds the FIFO work list used by
//! [`execute`](super::execute): while a chain is running, nested chains
//! (destroy actions triggered by damage, create actions of new objects) are
//! appended instead of recursing.

use super::exec::{execute, Invocation};
use super::ActionRange;
use crate::effects::EffectSink;
use crate::fixed::Coord;
use crate::registry::ObjectRef;
use crate::scenario::Scenario;
use crate::state::WorldState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Default cap on actions run by one top-level execution.
pub const DEFAULT_MAX_ACTIONS_PER_DRAIN: usize = 4096;

/// The remainder of a delayed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub range: ActionRange,
    pub subject: Option<ObjectRef>,
    pub direct: Option<ObjectRef>,
    pub offset: Option<Coord>,
}

/// Counters since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub executed: u64,
    pub skipped: u64,
    pub delayed: u64,
    pub overflows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionQueue {
    scheduled: BTreeMap<u64, Vec<QueuedAction>>,
    pending: VecDeque<Invocation>,
    draining: bool,
    pub max_actions_per_drain: usize,
    pub stats: QueueStats,
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self {
            scheduled: BTreeMap::new(),
            pending: VecDeque::new(),
            draining: false,
            max_actions_per_drain: DEFAULT_MAX_ACTIONS_PER_DRAIN,
            stats: QueueStats::default(),
        }
    }
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: u64, action: QueuedAction) {
        self.stats.delayed += 1;
        self.scheduled.entry(due).or_default().push(action);
    }

    /// Number of delayed chains not yet run.
    pub fn len(&self) -> usize {
        self.scheduled.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Earliest tick with work due.
    pub fn next_due(&self) -> Option<u64> {
        self.scheduled.keys().next().copied()
    }

    /// Remove and return everything due at or before `tick`, oldest first.
    pub fn take_due(&mut self, tick: u64) -> Vec<QueuedAction> {
        let later = self.scheduled.split_off(&(tick.saturating_add(1)));
        let due = std::mem::replace(&mut self.scheduled, later);
        due.into_values().flatten().collect()
    }

    pub fn clear(&mut self) {
        self.scheduled.clear();
        self.pending.clear();
    }

    pub(crate) fn is_draining(&self) -> bool {
        self.draining
    }

    pub(crate) fn set_draining(&mut self, draining: bool) {
        self.draining = draining;
    }

    pub(crate) fn push_pending(&mut self, invocation: Invocation) {
        self.pending.push_back(invocation);
    }

    pub(crate) fn pop_pending(&mut self) -> Option<Invocation> {
        self.pending.pop_front()
    }

    /// Drop the work list after hitting the per-drain cap. Returns how many
    /// chains were discarded.
    pub(crate) fn abandon_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        self.stats.overflows += 1;
        n
    }
}

/// Run every delayed chain due at or before `tick`. Delays inside a resumed
/// chain are honoured again. Returns the number of chains resumed.
pub fn drain(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    tick: u64,
) -> usize {
    let due = state.queue.take_due(tick);
    let n = due.len();
    for item in due {
        execute(
            state,
            scenario,
            sink,
            Invocation {
                range: item.range,
                subject: item.subject,
                direct: item.direct,
                offset: item.offset,
                allow_delay: true,
            },
        );
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionKind};
    use crate::effects::NullSink;
    use crate::fixed::Coord;
    use crate::testing::{ship_base, WorldBuilder};

    fn world_with(actions: Vec<Action>) -> (WorldState, Scenario, ObjectRef) {
        let (state, mut scenario) = WorldBuilder::new()
            .with_base(ship_base("fighter"))
            .with_admiral("red")
            .with_object(0, Some(0), Coord::new(0, 0))
            .build();
        scenario.actions = actions;
        let r = state.objects.active_refs()[0];
        (state, scenario, r)
    }

    fn score(value: i32) -> Action {
        Action::new(ActionKind::Score {
            player: Some(0),
            which: 0,
            value,
        })
    }

    #[test]
    fn test_delay_runs_once_when_due() {
        let (mut state, scenario, r) = world_with(vec![
            Action::new(ActionKind::Delay { duration: 3 }),
            score(1),
        ]);
        state.tick = 10;
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 2), Some(r), None).delayable(),
        );
        assert_eq!(state.admirals[0].score[0], 0);
        assert_eq!(state.queue.next_due(), Some(13));

        for tick in 10..13 {
            assert_eq!(drain(&mut state, &scenario, &mut NullSink, tick), 0);
        }
        assert_eq!(drain(&mut state, &scenario, &mut NullSink, 13), 1);
        assert_eq!(state.admirals[0].score[0], 1);
        assert_eq!(drain(&mut state, &scenario, &mut NullSink, 13), 0);
        assert_eq!(drain(&mut state, &scenario, &mut NullSink, 20), 0);
        assert_eq!(state.admirals[0].score[0], 1);
    }

    #[test]
    fn test_delay_without_permission_runs_inline() {
        let (mut state, scenario, r) = world_with(vec![
            Action::new(ActionKind::Delay { duration: 3 }),
            score(5),
        ]);
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 2), Some(r), None),
        );
        assert_eq!(state.admirals[0].score[0], 5);
        assert!(state.queue.is_empty());
    }

    #[test]
    fn test_chained_delays_reschedule() {
        let (mut state, scenario, r) = world_with(vec![
            Action::new(ActionKind::Delay { duration: 2 }),
            score(1),
            Action::new(ActionKind::Delay { duration: 2 }),
            score(10),
        ]);
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 4), Some(r), None).delayable(),
        );
        state.tick = 2;
        drain(&mut state, &scenario, &mut NullSink, 2);
        assert_eq!(state.admirals[0].score[0], 1);
        assert_eq!(state.queue.next_due(), Some(4));
        assert_eq!(drain(&mut state, &scenario, &mut NullSink, 3), 0);
        assert_eq!(drain(&mut state, &scenario, &mut NullSink, 4), 1);
        assert_eq!(state.admirals[0].score[0], 11);
    }

    #[test]
    fn test_due_order_is_fifo() {
        let mut queue = ActionQueue::new();
        let item = |start| QueuedAction {
            range: ActionRange::new(start, 1),
            subject: None,
            direct: None,
            offset: None,
        };
        queue.schedule(5, item(1));
        queue.schedule(3, item(2));
        queue.schedule(5, item(3));
        queue.schedule(9, item(4));
        let due: Vec<_> = queue.take_due(5).iter().map(|q| q.range.start).collect();
        assert_eq!(due, vec![2, 1, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(), Some(9));
    }

    #[test]
    fn test_stale_subject_is_skipped_not_fatal() {
        let (mut state, scenario, r) = world_with(vec![
            Action::new(ActionKind::Delay { duration: 1 }),
            Action::new(ActionKind::Heal { value: 5 }).reflexive(),
            score(1),
        ]);
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 3), Some(r), None).delayable(),
        );
        state.objects.mark_for_removal(r);
        state.objects.sweep();
        drain(&mut state, &scenario, &mut NullSink, 1);
        // heal had no focus; the unconditional score still ran
        assert_eq!(state.admirals[0].score[0], 1);
        assert_eq!(state.queue.stats.skipped, 1);
    }
}

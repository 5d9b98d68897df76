//! The action interpreter.
//!
//! Ranges run strictly in order. Each action re-resolves its references,
//! because an earlier action in the same range may have removed the subject
//! or direct object. Work triggered while a range is running is appended to a
//! FIFO list and run once the current range finishes, so destroy chains never
//! recurse.

use super::filter::resolve_focus;
use super::queue::QueuedAction;
use super::{handlers, Action, ActionKind, ActionRange};
use crate::effects::EffectSink;
use crate::fixed::Coord;
use crate::registry::ObjectRef;
use crate::scenario::Scenario;
use crate::state::WorldState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One request to run a range of the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub range: ActionRange,
    pub subject: Option<ObjectRef>,
    pub direct: Option<ObjectRef>,
    /// Position offset applied by actions that place objects.
    pub offset: Option<Coord>,
    /// Whether DELAY may defer the rest of the range.
    pub allow_delay: bool,
}

impl Invocation {
    pub fn new(range: ActionRange, subject: Option<ObjectRef>, direct: Option<ObjectRef>) -> Self {
        Self {
            range,
            subject,
            direct,
            offset: None,
            allow_delay: false,
        }
    }

    pub fn delayable(mut self) -> Self {
        self.allow_delay = true;
        self
    }

    pub fn with_offset(mut self, offset: Option<Coord>) -> Self {
        self.offset = offset;
        self
    }
}

/// Run a range. Called while another range is running, the request is
/// queued behind it instead.
pub fn execute(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    invocation: Invocation,
) {
    if invocation.range.is_empty() {
        return;
    }
    state.queue.push_pending(invocation);
    if state.queue.is_draining() {
        return;
    }

    state.queue.set_draining(true);
    let mut budget = state.queue.max_actions_per_drain;
    while let Some(next) = state.queue.pop_pending() {
        if run_range(state, scenario, sink, next, &mut budget) {
            let dropped = state.queue.abandon_pending();
            log::warn!(
                "Action chain exceeded {} actions at tick {}; dropped {} pending ranges",
                state.queue.max_actions_per_drain,
                state.tick,
                dropped
            );
            break;
        }
    }
    state.queue.set_draining(false);
}

/// Returns true if the budget ran out before the range finished.
#[instrument(skip_all, name = "action_range")]
fn run_range(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    invocation: Invocation,
    budget: &mut usize,
) -> bool {
    let ActionRange { start, .. } = invocation.range;
    for (i, action) in scenario
        .action_slice(invocation.range)
        .iter()
        .enumerate()
        .map(|(k, a)| (start + k, a))
    {
        if *budget == 0 {
            return true;
        }
        *budget -= 1;

        if let ActionKind::Delay { duration } = action.kind {
            if invocation.allow_delay {
                let due = state.tick.saturating_add(duration as u64);
                log::trace!("Delaying actions {}.. until tick {}", i + 1, due);
                state.queue.schedule(
                    due,
                    QueuedAction {
                        range: invocation.range.after(i),
                        subject: invocation.subject,
                        direct: invocation.direct,
                        offset: invocation.offset,
                    },
                );
                return false;
            }
            continue;
        }

        dispatch(state, scenario, sink, action, &invocation);
    }
    false
}

fn dispatch(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    action: &Action,
    invocation: &Invocation,
) {
    let resolved = resolve_focus(state, action, invocation.subject, invocation.direct);
    let kind = &action.kind;

    match resolved.focus {
        None if !kind.is_global() && !kind.is_unconditional() => {
            log::trace!("Skipping {}: no focus", kind.name());
            state.queue.stats.skipped += 1;
            return;
        }
        Some(focus) if !kind.is_unconditional() && !action.filter.is_empty() => {
            let subject_owner = resolved
                .subject
                .and_then(|s| state.objects.get(s))
                .and_then(|o| o.owner);
            let passes = state.objects.get(focus).is_some_and(|obj| {
                scenario
                    .bases
                    .get(obj.base)
                    .is_some_and(|base| action.filter.applies_to(obj, base, subject_owner))
            });
            if !passes {
                log::trace!("Skipping {}: filter rejected focus", kind.name());
                state.queue.stats.skipped += 1;
                return;
            }
        }
        _ => {}
    }

    state.queue.stats.executed += 1;
    handlers::apply(state, scenario, sink, action, &resolved, invocation.offset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Filter, OwnerRelation};
    use crate::effects::NullSink;
    use crate::object::attr;
    use crate::testing::{ship_base, WorldBuilder};

    fn duel() -> (WorldState, Scenario, ObjectRef, ObjectRef) {
        let (state, scenario) = WorldBuilder::new()
            .with_base(ship_base("fighter"))
            .with_admiral("red")
            .with_admiral("blue")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_object(0, Some(1), Coord::new(100, 0))
            .build();
        let refs = state.objects.active_refs();
        (state, scenario, refs[0], refs[1])
    }

    fn health(state: &WorldState, r: ObjectRef) -> i32 {
        state.objects.get(r).map_or(i32::MIN, |o| o.health)
    }

    #[test]
    fn test_range_runs_in_order() {
        let (mut state, mut scenario, a, b) = duel();
        scenario.actions = vec![
            Action::new(ActionKind::Heal { value: -3 }),
            Action::new(ActionKind::Heal { value: -4 }),
            Action::new(ActionKind::Heal { value: 2 }).reflexive(),
        ];
        let (ha, hb) = (health(&state, a), health(&state, b));
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 3), Some(a), Some(b)),
        );
        assert_eq!(health(&state, b), hb - 7);
        assert_eq!(health(&state, a), ha + 2);
        assert_eq!(state.queue.stats.executed, 3);
    }

    #[test]
    fn test_filter_rejects_friendly_focus() {
        let (mut state, mut scenario, a, b) = duel();
        let enemies_only = Filter {
            owner: OwnerRelation::Different,
            ..Filter::default()
        };
        scenario.actions = vec![
            Action::new(ActionKind::Heal { value: -1 }).with_filter(enemies_only.clone()),
            Action::new(ActionKind::Heal { value: -1 })
                .reflexive()
                .with_filter(enemies_only),
        ];
        let (ha, hb) = (health(&state, a), health(&state, b));
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 2), Some(a), Some(b)),
        );
        assert_eq!(health(&state, b), hb - 1);
        assert_eq!(health(&state, a), ha, "reflexive focus is its own owner");
        assert_eq!(state.queue.stats.skipped, 1);
    }

    #[test]
    fn test_attribute_filter_uses_live_flags() {
        let (mut state, mut scenario, a, b) = duel();
        scenario.actions = vec![Action::new(ActionKind::Heal { value: -1 }).with_filter(Filter {
            attributes: attr::ON_AUTOPILOT,
            ..Filter::default()
        })];
        let hb = health(&state, b);
        let inv = Invocation::new(ActionRange::new(0, 1), Some(a), Some(b));
        execute(&mut state, &scenario, &mut NullSink, inv);
        assert_eq!(health(&state, b), hb);
        if let Some(obj) = state.objects.get_mut(b) {
            obj.attributes |= attr::ON_AUTOPILOT;
        }
        execute(&mut state, &scenario, &mut NullSink, inv);
        assert_eq!(health(&state, b), hb - 1);
    }

    #[test]
    fn test_runaway_chain_is_cut_off() {
        let (mut state, mut scenario, a, _b) = duel();
        // a collide hook that re-triggers itself through damage would loop;
        // a long flat range is enough to exhaust the budget
        scenario.actions = (0..50)
            .map(|_| Action::new(ActionKind::Heal { value: 1 }).reflexive())
            .collect();
        state.queue.max_actions_per_drain = 10;
        let before = health(&state, a);
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 50), Some(a), None),
        );
        assert_eq!(health(&state, a), before + 10);
        assert_eq!(state.queue.stats.overflows, 1);
        assert!(!state.queue.is_draining());
    }

    #[test]
    fn test_global_kinds_run_without_focus() {
        let (mut state, mut scenario, _a, _b) = duel();
        scenario.actions = vec![Action::new(ActionKind::Key {
            disable: vec![crate::action::Key::Warp],
            enable: vec![],
        })];
        execute(
            &mut state,
            &scenario,
            &mut NullSink,
            Invocation::new(ActionRange::new(0, 1), None, None),
        );
        assert_eq!(state.disabled_keys, crate::action::Key::Warp.bit());
    }
}

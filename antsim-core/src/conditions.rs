//! Scenario conditions: triggers checked against the world that fire action
//! ranges when they hold.

use crate::action::filter::resolve_selector;
use crate::action::{execute, Invocation};
use crate::effects::EffectSink;
use crate::object::attr;
use crate::scenario::{ConditionTrigger, Scenario};
use crate::state::WorldState;
use tracing::instrument;

/// Whether `trigger` holds in the current world.
pub fn holds(state: &WorldState, trigger: &ConditionTrigger) -> bool {
    match *trigger {
        ConditionTrigger::Time { ticks } => state.tick >= ticks,
        ConditionTrigger::Destroyed { initial } => state
            .initials
            .get(initial)
            .copied()
            .flatten()
            .map_or(true, |r| !state.objects.is_active(r)),
        ConditionTrigger::Owner { initial, player } => state
            .initials
            .get(initial)
            .copied()
            .flatten()
            .and_then(|r| state.objects.get(r))
            .filter(|o| o.is_active())
            .is_some_and(|o| o.owner == player),
        ConditionTrigger::Ships { player, at_most } => {
            let alive = state
                .objects
                .iter_active()
                .filter(|o| o.owner == Some(player) && o.has(attr::CAN_THINK))
                .count();
            alive as i64 <= at_most as i64
        }
    }
}

/// Evaluate every enabled condition in order and fire the ones that hold.
/// Non-persistent conditions disable themselves after firing. Returns the
/// number fired.
#[instrument(skip_all, name = "conditions")]
pub fn check(state: &mut WorldState, scenario: &Scenario, sink: &mut dyn EffectSink) -> usize {
    let mut fired = 0;
    for (i, condition) in scenario.conditions.iter().enumerate() {
        if !state.conditions.get(i).is_some_and(|c| c.enabled) {
            continue;
        }
        let Some(trigger) = &condition.trigger else {
            continue;
        };
        if !holds(state, trigger) {
            continue;
        }

        if let Some(c) = state.conditions.get_mut(i) {
            c.fired += 1;
            if !condition.persistent {
                c.enabled = false;
            }
        }
        log::debug!("Condition '{}' fired at tick {}", condition.name, state.tick);
        fired += 1;

        let subject = condition.subject.and_then(|s| resolve_selector(state, s));
        let direct = condition.direct.and_then(|s| resolve_selector(state, s));
        execute(
            state,
            scenario,
            sink,
            Invocation::new(condition.action, subject, direct).delayable(),
        );
    }
    fired
}

use crate::effects::EffectSink;
use crate::lifecycle::expire;
use crate::scenario::Scenario;
use crate::state::WorldState;
use tracing::instrument;

/// Count down every mortal object's age by one tick and expire those whose
/// time ran out. Returns the number of objects expired.
#[instrument(skip_all, name = "aging")]
pub fn run_aging_tick(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
) -> usize {
    let mut expired = Vec::new();
    for obj in state.objects.iter_active_mut() {
        if obj.age < 0 {
            continue;
        }
        obj.age -= 1;
        if obj.age < 0 {
            expired.push(obj.handle);
        }
    }
    for &r in &expired {
        expire(state, scenario, sink, r, None);
    }
    expired.len()
}

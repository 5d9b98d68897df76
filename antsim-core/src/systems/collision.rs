use crate::combat::hit_object;
use crate::effects::EffectSink;
use crate::fixed::Coord;
use crate::object::{attr, SpaceObject};
use crate::registry::{distance_squared, ObjectRef};
use crate::scenario::{AdmiralId, Scenario};
use crate::state::WorldState;
use tracing::instrument;

#[derive(Clone, Copy)]
struct Body {
    handle: ObjectRef,
    owner: Option<AdmiralId>,
    attributes: u32,
    radius: i64,
    location: Coord,
}

impl Body {
    fn of(obj: &SpaceObject, scenario: &Scenario) -> Option<Self> {
        let radius = scenario.bases.get(obj.base)?.collision_radius;
        if radius <= 0 || obj.presence.is_warp() {
            return None;
        }
        Some(Body {
            handle: obj.handle,
            owner: obj.owner,
            attributes: obj.attributes,
            radius: radius as i64,
            location: obj.location,
        })
    }

    fn strikes(&self, other: &Body) -> bool {
        self.attributes & attr::CAN_COLLIDE != 0 && other.attributes & attr::CAN_BE_HIT != 0
    }

    fn touches(&self, other: &Body) -> bool {
        let reach = self.radius + other.radius;
        distance_squared(self.location, other.location) as i64 <= reach * reach
    }
}

/// Resolve contacts between objects of different owners. Each side that can
/// collide hits the other if the other can be hit. Returns the number of
/// contacts found.
#[instrument(skip_all, name = "collision")]
pub fn run_collision_tick(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
) -> usize {
    let bodies: Vec<Body> = state
        .objects
        .iter_active()
        .filter_map(|o| Body::of(o, scenario))
        .collect();

    let mut contacts = 0;
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            if a.owner == b.owner || !a.touches(b) {
                continue;
            }
            if !(a.strikes(b) || b.strikes(a)) {
                continue;
            }
            contacts += 1;
            // either side may already be gone from an earlier contact
            if a.strikes(b) && state.objects.is_active(a.handle) {
                hit_object(state, scenario, sink, b.handle, a.handle);
            }
            if b.strikes(a) && state.objects.is_active(b.handle) {
                hit_object(state, scenario, sink, a.handle, b.handle);
            }
        }
    }
    if contacts > 0 {
        log::trace!("{} contacts at tick {}", contacts, state.tick);
    }
    contacts
}

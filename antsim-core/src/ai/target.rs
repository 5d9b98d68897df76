//! Target and destination bookkeeping for the decision pass.

use crate::fixed::Coord;
use crate::object::{attr, Destination};
use crate::registry::{distance_squared, ObjectRef};
use crate::rotation::angle_between;
use crate::state::WorldState;

/// Cloak state above which an object is hard to see.
pub const CLOAK_BLUR_STATE: i32 = 250;
/// Aim error applied to a well-cloaked object picked up as the closest target.
const CLOAKED_CLOSEST_ERROR: i32 = 200;

/// Result of target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFix {
    pub target: Option<ObjectRef>,
    /// Where to aim; the object's own location when there is no target.
    pub at: Coord,
    /// Squared distance to `at`, or the engage range when there is no target.
    pub distance: u32,
}

/// Result of destination resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationFix {
    pub at: Coord,
    pub object: Option<ObjectRef>,
    /// Nothing to head for: no destination, or the object is itself a destination.
    pub idle: bool,
    /// The destination vanished this pass and nothing replaced it.
    pub lost: bool,
}

/// Whether an object holding a target at squared distance `current` should
/// switch to its closest candidate at squared distance `closest`.
///
/// Guided objects never switch. Others switch when the candidate is under
/// half the current distance, when they cannot engage at all, or when a
/// person is flying them.
pub fn should_switch_target(current: u32, closest: u32, attributes: u32) -> bool {
    if attributes & attr::IS_GUIDED != 0 {
        return false;
    }
    (current >> 1) > closest
        || attributes & attr::CAN_ENGAGE == 0
        || attributes & attr::REMOTE_OR_HUMAN != 0
}

/// Squared distance and heading from `from` to `to`. Coincident points keep
/// the current `direction`.
pub fn coord_vector(from: Coord, direction: i32, to: Coord) -> (u32, i32) {
    (
        distance_squared(from, to),
        angle_between(from, to).unwrap_or(direction),
    )
}

/// Validate and refresh `r`'s target against the world, adopting the closest
/// hostile when the target is missing, stale, friendly or ineligible.
pub fn resolve_target(state: &mut WorldState, r: ObjectRef) -> TargetFix {
    let Some(obj) = state.objects.get(r) else {
        return TargetFix {
            target: None,
            at: Coord::default(),
            distance: 0,
        };
    };
    let (location, attributes, owner) = (obj.location, obj.attributes, obj.owner);
    let nothing = TargetFix {
        target: None,
        at: location,
        distance: obj.engage_range,
    };
    let closest_distance = obj.closest_distance;
    let closest = state
        .objects
        .resolve(obj.closest)
        .and_then(|c| state.objects.get(c))
        .map(|c| {
            (
                c.handle,
                c.has(attr::POTENTIAL_TARGET),
                c.location,
                c.cloak_state,
            )
        });
    let mut adopted_closest = false;

    let current = match obj.target {
        Some(t) => Some(t),
        None => match closest {
            Some((c, true, ..)) => {
                adopted_closest = true;
                Some(c)
            }
            _ => None,
        },
    };
    let Some(current) = current else {
        clear_target(state, r);
        return nothing;
    };

    let usable = state
        .objects
        .get(current)
        .filter(|t| t.is_active())
        .filter(|t| !(t.owner == owner && t.has(attr::HATED)))
        .filter(|t| t.has(attr::POTENTIAL_TARGET) || t.has(attr::HATED))
        .map(|t| (t.handle, t.location));

    let (mut target, mut at) = match (usable, closest) {
        (Some(found), _) => found,
        (None, Some((c, true, location, _))) => (c, location),
        _ => {
            clear_target(state, r);
            return nothing;
        }
    };

    let distance = match closest {
        Some((c, true, closest_at, cloak)) if c != target => {
            let distance = distance_squared(location, at);
            if should_switch_target(distance, closest_distance, attributes) {
                target = c;
                at = closest_at;
                if cloak > CLOAK_BLUR_STATE {
                    at = at.offset(Coord::new(-CLOAKED_CLOSEST_ERROR, -CLOAKED_CLOSEST_ERROR));
                }
                log::trace!("{:?} switches target to closer {:?}", r, c);
                closest_distance
            } else {
                distance
            }
        }
        Some((c, ..)) if c == target => closest_distance,
        _ => distance_squared(location, at),
    };

    if let Some(obj) = state.objects.get_mut(r) {
        if adopted_closest && obj.has(attr::HAS_DIRECTION_GOAL) {
            obj.direction_goal = obj.direction;
        }
        obj.target = Some(target);
    }
    TargetFix {
        target: Some(target),
        at,
        distance,
    }
}

fn clear_target(state: &mut WorldState, r: ObjectRef) {
    if let Some(obj) = state.objects.get_mut(r) {
        obj.target = None;
    }
}

/// Refresh `r`'s destination. A destination object that has disappeared is
/// replaced by that object's own destination when it still exists.
pub fn resolve_destination(state: &mut WorldState, r: ObjectRef) -> DestinationFix {
    let Some(obj) = state.objects.get(r) else {
        return DestinationFix {
            at: Coord::default(),
            object: None,
            idle: true,
            lost: false,
        };
    };
    let here = obj.location;
    let idle = DestinationFix {
        at: here,
        object: None,
        idle: true,
        lost: false,
    };
    if obj.has(attr::IS_DESTINATION) {
        drop_autopilot(state, r);
        return idle;
    }

    let wanted = match obj.destination {
        Destination::None => {
            drop_autopilot(state, r);
            return idle;
        }
        Destination::Point(at) => {
            return DestinationFix {
                at,
                object: None,
                idle: false,
                lost: false,
            }
        }
        Destination::Object(d) => d,
    };

    let live = |state: &WorldState, d: ObjectRef| {
        state
            .objects
            .get(d)
            .filter(|o| o.is_active())
            .map(|o| (o.handle, o.location, o.destination))
    };
    let found = match live(state, wanted) {
        Some(found) => Some(found),
        None => {
            let fallback = obj.dest_object_dest;
            let replacement = fallback.and_then(|d| live(state, d));
            if let Some(obj) = state.objects.get_mut(r) {
                obj.attributes &= !attr::STATIC_DESTINATION;
            }
            if replacement.is_some() {
                log::trace!("{:?} follows its vanished destination's destination", r);
            }
            replacement
        }
    };

    let Some(obj) = state.objects.get_mut(r) else {
        return idle;
    };
    match found {
        Some((d, at, their_destination)) => {
            obj.destination = Destination::Object(d);
            obj.destination_location = Some(at);
            obj.dest_object_dest = match their_destination {
                Destination::Object(o) => Some(o),
                _ => None,
            };
            DestinationFix {
                at,
                object: Some(d),
                idle: false,
                lost: false,
            }
        }
        None => {
            obj.destination = Destination::None;
            obj.destination_location = None;
            obj.dest_object_dest = None;
            drop_autopilot(state, r);
            DestinationFix {
                at: here,
                object: None,
                idle: false,
                lost: true,
            }
        }
    }
}

fn drop_autopilot(state: &mut WorldState, r: ObjectRef) {
    if state
        .objects
        .get(r)
        .is_some_and(|o| o.has(attr::ON_AUTOPILOT))
    {
        crate::lifecycle::toggle_autopilot(state, r);
    }
}

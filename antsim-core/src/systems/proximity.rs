use crate::object::attr;
use crate::registry::DISTANCE_SENTINEL;
use crate::state::WorldState;
use tracing::instrument;

/// Refresh `closest` and `closest_distance` for every object that decides
/// for itself or is flown by a player. Returns the number of objects that
/// have a hostile in sight.
#[instrument(skip_all, name = "proximity")]
pub fn run_proximity_tick(state: &mut WorldState) -> usize {
    let watchers: Vec<_> = state
        .objects
        .iter_active()
        .filter(|o| o.attributes & (attr::CAN_THINK | attr::REMOTE_OR_HUMAN) != 0)
        .map(|o| o.handle)
        .collect();

    let mut sighted = 0;
    for r in watchers {
        let found = state.objects.closest_hostile(r);
        if let Some(obj) = state.objects.get_mut(r) {
            match found {
                Some((closest, distance)) => {
                    obj.closest = Some(closest);
                    obj.closest_distance = distance;
                    sighted += 1;
                }
                None => {
                    obj.closest = None;
                    obj.closest_distance = DISTANCE_SENTINEL;
                }
            }
        }
    }
    sighted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Coord;
    use crate::testing::{ship_base, WorldBuilder};

    #[test]
    fn test_closest_hostile_is_recorded() {
        let mut rock = ship_base("rock");
        rock.attributes = 0;
        let (mut state, _) = WorldBuilder::new()
            .with_base(ship_base("fighter"))
            .with_base(rock)
            .with_admiral("red")
            .with_admiral("blue")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_object(0, Some(1), Coord::new(30, 40))
            .with_object(1, None, Coord::new(1, 1))
            .build();
        let refs = state.objects.active_refs();

        assert_eq!(run_proximity_tick(&mut state), 2);
        let obj = state.objects.get(refs[0]).unwrap();
        assert_eq!(obj.closest, Some(refs[1]));
        assert_eq!(obj.closest_distance, 2500);
        // objects that never think are left alone
        assert_eq!(state.objects.get(refs[2]).unwrap().closest, None);
    }

    #[test]
    fn test_no_hostile_clears_previous_sighting() {
        let (mut state, _) = WorldBuilder::new()
            .with_base(ship_base("fighter"))
            .with_admiral("red")
            .with_admiral("blue")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_object(0, Some(1), Coord::new(10, 0))
            .build();
        let refs = state.objects.active_refs();
        run_proximity_tick(&mut state);
        state.objects.mark_for_removal(refs[1]);

        assert_eq!(run_proximity_tick(&mut state), 0);
        let obj = state.objects.get(refs[0]).unwrap();
        assert_eq!(obj.closest, None);
        assert_eq!(obj.closest_distance, DISTANCE_SENTINEL);
    }
}

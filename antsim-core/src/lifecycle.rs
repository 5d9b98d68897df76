//! Object creation, removal, ownership and orders.

use crate::action::{execute, Invocation};
use crate::effects::EffectSink;
use crate::object::{attr, Destination, NATURAL_SCALE};
use crate::registry::ObjectRef;
use crate::scenario::{AdmiralId, BaseId, InitialId, Scenario};
use crate::state::WorldState;

/// Report a newly allocated object and run its type's create action with
/// the object as subject.
pub fn finish_creation(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
) {
    let Some(base_id) = state.objects.get(r).map(|o| o.base) else {
        return;
    };
    sink.spawned(r, base_id);
    if let Some(base) = scenario.bases.get(base_id) {
        execute(
            state,
            scenario,
            sink,
            Invocation::new(base.actions.create, Some(r), None).delayable(),
        );
    }
}

/// Flag an object for removal after running its expire action.
pub fn expire(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    r: ObjectRef,
    direct: Option<ObjectRef>,
) {
    let Some(base_id) = state.objects.get(r).filter(|o| o.is_active()).map(|o| o.base) else {
        return;
    };
    state.objects.mark_for_removal(r);
    if let Some(base) = scenario.bases.get(base_id) {
        execute(
            state,
            scenario,
            sink,
            Invocation::new(base.actions.expire, Some(r), direct).delayable(),
        );
    }
}

/// Create a hidden scenario initial and run its create action.
pub fn reveal_initial(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    index: InitialId,
) -> Option<ObjectRef> {
    if state.initials.get(index).copied().flatten().is_some_and(|r| state.objects.is_active(r)) {
        return None;
    }
    let r = state.create_initial(scenario, index)?;
    state.link_initial(scenario, index);
    log::debug!("Revealed initial {} as {:?}", index, r);
    finish_creation(state, scenario, sink, r);
    Some(r)
}

/// Head for `dest`; `None` means the owner's selected target. Objects with
/// a static destination keep theirs.
pub fn set_destination(state: &mut WorldState, r: ObjectRef, dest: Option<ObjectRef>) {
    let Some(obj) = state.objects.get(r) else {
        return;
    };
    if obj.has(attr::STATIC_DESTINATION) {
        return;
    }
    let dest = dest.or_else(|| {
        obj.owner
            .and_then(|o| state.admirals.get(o))
            .and_then(|a| a.target)
    });
    let dest = dest
        .filter(|&d| d != r)
        .and_then(|d| state.objects.get(d).filter(|o| o.is_active()))
        .map(|d| (d.handle, d.location, d.destination));

    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    obj.has_arrived = false;
    obj.time_from_origin = 0;
    match dest {
        Some((d, at, their_dest)) => {
            obj.destination = Destination::Object(d);
            obj.destination_location = Some(at);
            obj.dest_object_dest = match their_dest {
                Destination::Object(o) => Some(o),
                _ => None,
            };
        }
        None => {
            obj.destination = Destination::None;
            obj.destination_location = None;
            obj.dest_object_dest = None;
        }
    }
}

/// Send the admiral's control object to the admiral's target.
pub fn give_command(state: &mut WorldState, admiral: AdmiralId) {
    let Some((control, target)) = state
        .admirals
        .get(admiral)
        .map(|a| (a.control, a.target))
    else {
        return;
    };
    let Some(control) = state.objects.resolve(control) else {
        return;
    };
    let accepts = state
        .objects
        .get(control)
        .is_some_and(|o| o.has(attr::CAN_ACCEPT_DESTINATION));
    if accepts && target.is_some() {
        set_destination(state, control, target);
    }
}

pub fn toggle_autopilot(state: &mut WorldState, r: ObjectRef) {
    if let Some(obj) = state.objects.get_mut(r) {
        obj.attributes ^= attr::ON_AUTOPILOT;
        log::debug!(
            "{:?} autopilot {}",
            r,
            if obj.has(attr::ON_AUTOPILOT) { "on" } else { "off" }
        );
    }
}

/// Hand an object to a new owner. Player control does not transfer.
pub fn capture(state: &mut WorldState, r: ObjectRef, owner: Option<AdmiralId>) {
    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    let previous = obj.owner;
    if previous == owner {
        return;
    }
    obj.owner = owner;
    obj.occupation = 0;
    obj.attributes &= !(attr::IS_HUMAN_CONTROLLED | attr::IS_PLAYER_SHIP | attr::ON_AUTOPILOT);
    obj.target = None;
    if let Some(admiral) = previous.and_then(|p| state.admirals.get_mut(p)) {
        if admiral.flagship == Some(r) {
            admiral.flagship = None;
        }
        if admiral.control == Some(r) {
            admiral.control = None;
        }
    }
    log::debug!("{:?} captured: {:?} -> {:?}", r, previous, owner);
}

/// Change an object's type in place. Runtime flags survive; health,
/// energy and speed reset to the new type; weapons are re-equipped.
pub fn morph(state: &mut WorldState, scenario: &Scenario, r: ObjectRef, base: BaseId, keep_ammo: bool) {
    let Some(new_base) = scenario.bases.get(base) else {
        return;
    };
    let Some(obj) = state.objects.get_mut(r) else {
        return;
    };
    obj.attributes = new_base.attributes | (obj.attributes & attr::RUNTIME_FLAGS);
    obj.base = base;
    obj.health = new_base.health;
    obj.energy = new_base.energy;
    obj.max_velocity = new_base.max_velocity;
    obj.scale = NATURAL_SCALE;
    obj.equip_from_base(scenario, new_base, keep_ammo);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionKind, ActionRange};
    use crate::effects::{EffectLog, NullSink};
    use crate::fixed::Coord;
    use crate::scenario::WeaponMount;
    use crate::testing::{ship_base, weapon_base, WorldBuilder};

    #[test]
    fn test_expire_runs_action_and_flags() {
        let mut base = ship_base("mine");
        base.actions.expire = ActionRange::new(0, 1);
        let (mut state, mut scenario) = WorldBuilder::new()
            .with_base(base)
            .with_admiral("red")
            .with_object(0, Some(0), Coord::new(0, 0))
            .build();
        scenario.actions = vec![Action::new(ActionKind::Score {
            player: Some(0),
            which: 2,
            value: 1,
        })];
        let r = state.objects.active_refs()[0];
        expire(&mut state, &scenario, &mut NullSink, r, None);
        expire(&mut state, &scenario, &mut NullSink, r, None);
        assert!(!state.objects.is_active(r));
        assert_eq!(state.admirals[0].score[2], 1);
        assert_eq!(state.admirals[0].losses, 0, "expiring is not a loss");
    }

    #[test]
    fn test_set_destination_defaults_to_admiral_target() {
        let (mut state, _scenario) = WorldBuilder::new()
            .with_base(ship_base("cruiser"))
            .with_admiral("red")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_object(0, None, Coord::new(700, 0))
            .build();
        let refs = state.objects.active_refs();
        state.admirals[0].target = Some(refs[1]);
        set_destination(&mut state, refs[0], None);
        let obj = state.objects.get(refs[0]).unwrap();
        assert_eq!(obj.destination, Destination::Object(refs[1]));
        assert_eq!(obj.destination_location, Some(Coord::new(700, 0)));

        // cannot head for itself
        set_destination(&mut state, refs[0], Some(refs[0]));
        assert_eq!(state.objects.get(refs[0]).unwrap().destination, Destination::None);
    }

    #[test]
    fn test_static_destination_is_kept() {
        let (mut state, _scenario) = WorldBuilder::new()
            .with_base(ship_base("station"))
            .with_object(0, None, Coord::new(0, 0))
            .with_object(0, None, Coord::new(10, 0))
            .build();
        let refs = state.objects.active_refs();
        state.objects.get_mut(refs[0]).unwrap().attributes |= attr::STATIC_DESTINATION;
        set_destination(&mut state, refs[0], Some(refs[1]));
        assert_eq!(state.objects.get(refs[0]).unwrap().destination, Destination::None);
    }

    #[test]
    fn test_give_command_moves_control_object() {
        let (mut state, _scenario) = WorldBuilder::new()
            .with_base(ship_base("cruiser"))
            .with_admiral("red")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_object(0, None, Coord::new(50, 50))
            .with_flagship(0, 0)
            .build();
        let refs = state.objects.active_refs();
        state.admirals[0].target = Some(refs[1]);
        give_command(&mut state, 0);
        assert_eq!(
            state.objects.get(refs[0]).unwrap().destination,
            Destination::Object(refs[1])
        );
    }

    #[test]
    fn test_capture_drops_player_control() {
        let (mut state, _scenario) = WorldBuilder::new()
            .with_base(ship_base("cruiser"))
            .with_human("red")
            .with_admiral("blue")
            .with_object(0, Some(0), Coord::new(0, 0))
            .with_flagship(0, 0)
            .build();
        let r = state.objects.active_refs()[0];
        assert!(state.objects.get(r).unwrap().has(attr::IS_HUMAN_CONTROLLED));
        capture(&mut state, r, Some(1));
        let obj = state.objects.get(r).unwrap();
        assert_eq!(obj.owner, Some(1));
        assert!(!obj.has(attr::IS_HUMAN_CONTROLLED));
        assert_eq!(state.admirals[0].flagship, None);
    }

    #[test]
    fn test_morph_keeps_runtime_flags_and_ammo() {
        let mut before = ship_base("transport");
        before.pulse = Some(WeaponMount {
            base: 2,
            positions: vec![],
        });
        let mut after = ship_base("gunship");
        after.health = 300;
        after.pulse = before.pulse.clone();
        let mut gun = weapon_base("gun", 200);
        if let Some(w) = gun.weapon.as_mut() {
            w.ammo = 20;
        }
        let (mut state, scenario) = WorldBuilder::new()
            .with_base(before)
            .with_base(after)
            .with_base(gun)
            .with_object(0, None, Coord::new(0, 0))
            .build();
        let r = state.objects.active_refs()[0];
        {
            let obj = state.objects.get_mut(r).unwrap();
            obj.attributes |= attr::ON_AUTOPILOT;
            obj.pulse.ammo = 4;
            obj.health = 3;
        }
        morph(&mut state, &scenario, r, 1, true);
        let obj = state.objects.get(r).unwrap();
        assert_eq!(obj.base, 1);
        assert_eq!(obj.health, 300);
        assert!(obj.has(attr::ON_AUTOPILOT));
        assert_eq!(obj.pulse.ammo, 4);

        morph(&mut state, &scenario, r, 1, false);
        assert_eq!(state.objects.get(r).unwrap().pulse.ammo, 20);
    }

    #[test]
    fn test_reveal_initial_creates_once() {
        let (mut state, mut scenario) = WorldBuilder::new()
            .with_base(ship_base("ambusher"))
            .with_object(0, None, Coord::new(0, 0))
            .build();
        scenario.initials[0].hidden = true;
        let mut state2 = WorldState::new(&scenario);
        assert_eq!(state2.objects.active_count(), 0);
        let mut log = EffectLog::new();
        let r = reveal_initial(&mut state2, &scenario, &mut log, 0).unwrap();
        assert!(state2.objects.is_active(r));
        assert_eq!(log.events.len(), 1);
        assert!(reveal_initial(&mut state2, &scenario, &mut log, 0).is_none());

        // already visible initials are not duplicated
        assert!(reveal_initial(&mut state, &scenario, &mut log, 0).is_none());
    }
}

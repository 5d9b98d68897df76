//! Unit tests for the decision pass

use super::*;
use crate::action::{Action, ActionKind, ActionRange};
use crate::effects::{EffectEvent, EffectLog, NullSink};
use crate::fixed::FixedPoint;
use crate::object::Destination;
use crate::scenario::WeaponMount;
use crate::testing::{ship_base, weapon_base, WorldBuilder};

fn duel() -> (WorldState, Scenario, ObjectRef, ObjectRef) {
    let mut ship = ship_base("gunship");
    ship.pulse = Some(WeaponMount {
        base: 1,
        positions: vec![],
    });
    let (state, scenario) = WorldBuilder::new()
        .with_base(ship)
        .with_base(weapon_base("gun", 200))
        .with_admiral("red")
        .with_admiral("blue")
        .with_object(0, Some(0), Coord::new(0, 0))
        .with_object(0, Some(1), Coord::new(0, 150))
        .build();
    let refs = state.objects.active_refs();
    (state, scenario, refs[0], refs[1])
}

fn loner(base: crate::scenario::BaseObject) -> (WorldState, Scenario, ObjectRef) {
    let (state, scenario) = WorldBuilder::new()
        .with_base(base)
        .with_admiral("red")
        .with_object(0, Some(0), Coord::new(0, 0))
        .build();
    let r = state.objects.active_refs()[0];
    (state, scenario, r)
}

#[test]
fn test_weapon_selection_prefers_tightest_range() {
    let ranges = [
        (WeaponSlot::Pulse, 200),
        (WeaponSlot::Beam, 500),
        (WeaponSlot::Special, 800),
    ];
    assert_eq!(select_weapon(ranges, 350), Some(WeaponSlot::Beam));
}

#[test]
fn test_target_hysteresis() {
    let fighter = attr::CAN_ENGAGE | attr::CAN_EVADE;
    assert!(should_switch_target(1000, 400, fighter));
    assert!(!should_switch_target(1000, 600, fighter));
}

#[test]
fn test_pass_counts_ships_per_owner() {
    let (mut state, scenario, _, _) = duel();
    state.admirals[0].ships_left = 9;
    let decided = decision_tick(&mut state, &scenario, &mut NullSink, 3);
    assert_eq!(decided, 2);
    assert_eq!(state.admirals[0].ships_left, 1);
    assert_eq!(state.admirals[1].ships_left, 1);
    assert_eq!(state.sync_value, state.compute_sync_value());
}

#[test]
fn test_engaged_fighter_fires_and_closes() {
    let (mut state, scenario, me, them) = duel();
    {
        let obj = state.objects.get_mut(me).unwrap();
        obj.direction = 90;
        obj.target = Some(them);
    }
    decision_tick(&mut state, &scenario, &mut NullSink, 3);

    let obj = state.objects.get(me).unwrap();
    assert_eq!(obj.keys_down, keys::FIRE_1 | keys::UP);
    assert_eq!(obj.pulse.time, 10, "gun fired and is cooling down");
    assert_eq!(obj.thrust, Fixed::HALF);
    assert_eq!(obj.last_target_distance, 22_500);

    // the cooldown counts down by the time between passes
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    assert_eq!(state.objects.get(me).unwrap().pulse.time, 7);
}

#[test]
fn test_guided_object_drops_target_off_the_nose() {
    let (mut state, scenario, me, them) = duel();
    {
        let obj = state.objects.get_mut(me).unwrap();
        obj.attributes |= attr::IS_GUIDED;
        obj.target = Some(them);
    }
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(me).unwrap();
    assert_eq!(obj.target, None);
    assert_eq!(obj.direction_goal, obj.direction);
    assert!(obj.keys_down & keys::UP != 0);
}

#[test]
fn test_warp_in_cues_then_enters_warp() {
    let mut base = ship_base("courier");
    base.warp_speed = Fixed::from_int(20);
    let (mut state, scenario, r) = loner(base);
    state.objects.get_mut(r).unwrap().presence = Presence::WarpIn {
        progress: 0,
        cues: 0,
    };
    let mut log = EffectLog::new();
    let cues = |log: &EffectLog| log.count(|e| matches!(e, EffectEvent::WarpCue { .. }));

    decision_tick(&mut state, &scenario, &mut log, 30);
    assert_eq!(cues(&log), 2);
    decision_tick(&mut state, &scenario, &mut log, 30);
    decision_tick(&mut state, &scenario, &mut log, 30);
    assert_eq!(cues(&log), 4);
    assert!(matches!(
        state.objects.get(r).unwrap().presence,
        Presence::WarpIn { progress: 90, .. }
    ));

    decision_tick(&mut state, &scenario, &mut log, 30);
    let obj = state.objects.get(r).unwrap();
    assert_eq!(
        obj.presence,
        Presence::Warping {
            speed: Fixed::from_int(20)
        }
    );
    assert_eq!(obj.energy, 88);
    assert_eq!(obj.warp_energy_collected, 12);
    assert!(!obj.has(attr::OCCUPIES_SPACE));
    assert_eq!(obj.thrust, Fixed::HALF.mul(Fixed::from_int(20)));
    assert_eq!(cues(&log), 4);
}

#[test]
fn test_warp_out_restores_normal_flight() {
    let mut base = ship_base("courier");
    base.warp_speed = Fixed::from_int(20);
    let (mut state, scenario, r) = loner(base);
    {
        let obj = state.objects.get_mut(r).unwrap();
        obj.presence = Presence::WarpOut {
            speed: Fixed::from_int(5),
        };
        obj.battery = 0;
        obj.warp_energy_collected = 12;
    }
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    assert_eq!(
        state.objects.get(r).unwrap().presence,
        Presence::WarpOut {
            speed: Fixed::from_int(4)
        }
    );

    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(r).unwrap();
    assert_eq!(obj.presence, Presence::Normal);
    assert_eq!(obj.battery, 12);
    assert_eq!(obj.warp_energy_collected, 0);
    assert!(obj.has(attr::OCCUPIES_SPACE));
    assert_eq!(
        obj.velocity,
        FixedPoint::new(Fixed::from_int(4), Fixed::ZERO)
    );
}

#[test]
fn test_landing_shrinks_then_expires() {
    let (mut state, scenario, r) = loner(ship_base("shuttle"));
    {
        let obj = state.objects.get_mut(r).unwrap();
        obj.presence = Presence::Landing {
            scale: 100,
            speed: 60,
        };
        obj.destination = Destination::Point(Coord::new(10, 10));
    }
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(r).unwrap();
    assert_eq!(obj.scale, 40);
    assert!(obj.keys_down & keys::DOWN != 0);

    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    assert!(!state.objects.is_active(r));
}

#[test]
fn test_special_keys_are_consumed() {
    let (mut state, scenario, r) = loner(ship_base("cruiser"));
    state.objects.get_mut(r).unwrap().keys_down = keys::AUTOPILOT;
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(r).unwrap();
    assert!(obj.has(attr::ON_AUTOPILOT));
    assert_eq!(obj.keys_down & keys::SPECIAL, 0);
}

#[test]
fn test_manual_override_wins_for_one_pass() {
    let (mut state, scenario) = WorldBuilder::new()
        .with_base(ship_base("cruiser"))
        .with_human("red")
        .with_object(0, Some(0), Coord::new(0, 0))
        .with_flagship(0, 0)
        .build();
    let r = state.objects.active_refs()[0];
    {
        let obj = state.objects.get_mut(r).unwrap();
        obj.attributes |= attr::ON_AUTOPILOT;
        obj.destination = Destination::Point(Coord::new(0, 40_000));
        obj.keys_down = keys::DOWN | keys::MANUAL_OVERRIDE;
    }
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(r).unwrap();
    assert_eq!(obj.keys_down, keys::DOWN);
    assert_eq!(obj.thrust, -Fixed::HALF);
}

#[test]
fn test_arrive_action_runs_once() {
    let mut base = ship_base("tug");
    base.arrive_distance = 100;
    base.actions.arrive = ActionRange::new(0, 1);
    let (mut state, mut scenario, r) = loner(base);
    scenario.actions = vec![Action::new(ActionKind::Score {
        player: Some(0),
        which: 1,
        value: 1,
    })];
    state.objects.get_mut(r).unwrap().destination = Destination::Point(Coord::new(50, 0));
    for _ in 0..3 {
        decision_tick(&mut state, &scenario, &mut NullSink, 3);
    }
    assert!(state.objects.get(r).unwrap().has_arrived);
    assert_eq!(state.admirals[0].score[1], 1);
}

#[test]
fn test_idle_ship_brakes() {
    let (mut state, scenario, r) = loner(ship_base("cruiser"));
    state.objects.get_mut(r).unwrap().time_from_origin = 50;
    decision_tick(&mut state, &scenario, &mut NullSink, 3);
    let obj = state.objects.get(r).unwrap();
    assert_eq!(obj.keys_down, keys::DOWN);
    assert_eq!(obj.time_from_origin, 0);
}

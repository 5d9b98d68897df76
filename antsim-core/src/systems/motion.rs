use crate::fixed::{Fixed, FixedPoint};
use crate::object::{Presence, SpaceObject, CLOAK_ON_STATE_MAX, CLOAK_RATE};
use crate::rotation::{add_angle, rot_point};
use crate::state::WorldState;
use tracing::instrument;

/// Move `current` toward `goal` by at most `step`.
fn approach(current: Fixed, goal: Fixed, step: Fixed) -> Fixed {
    if current < goal {
        (current + step).min(goal)
    } else {
        (current - step).max(goal)
    }
}

/// Split whole units off a fractional accumulator.
fn take_whole(fraction: &mut Fixed) -> i32 {
    let whole = fraction.to_int_floor();
    *fraction -= Fixed::from_int(whole);
    whole
}

fn turn(obj: &mut SpaceObject) {
    obj.turn_fraction += obj.turn_velocity;
    let degrees = take_whole(&mut obj.turn_fraction);
    if degrees != 0 {
        obj.direction = add_angle(obj.direction, degrees);
    }
}

fn accelerate(obj: &mut SpaceObject) {
    let (cos, sin) = rot_point(obj.direction);
    match obj.presence {
        Presence::Warping { speed } | Presence::WarpOut { speed } => {
            obj.velocity = FixedPoint::new(cos.mul(speed), sin.mul(speed));
        }
        _ if obj.thrust != Fixed::ZERO => {
            let goal = if obj.thrust > Fixed::ZERO {
                FixedPoint::new(cos.mul(obj.max_velocity), sin.mul(obj.max_velocity))
            } else {
                FixedPoint::ZERO
            };
            let step = obj.thrust.abs();
            obj.velocity = FixedPoint::new(
                approach(obj.velocity.h, goal.h, step),
                approach(obj.velocity.v, goal.v, step),
            );
        }
        _ => {}
    }
}

/// Returns whether the object changed position.
fn translate(obj: &mut SpaceObject) -> bool {
    obj.motion_fraction.h += obj.velocity.h;
    obj.motion_fraction.v += obj.velocity.v;
    let dh = take_whole(&mut obj.motion_fraction.h);
    let dv = take_whole(&mut obj.motion_fraction.v);
    obj.location.h = obj.location.h.wrapping_add(dh);
    obj.location.v = obj.location.v.wrapping_add(dv);
    dh != 0 || dv != 0
}

/// Cloaks fade in toward full strength; a dropped cloak fades back out to zero.
fn fade_cloak(obj: &mut SpaceObject) {
    if obj.cloak_state > 0 && obj.cloak_state < CLOAK_ON_STATE_MAX {
        obj.cloak_state = (obj.cloak_state + CLOAK_RATE).min(CLOAK_ON_STATE_MAX);
    } else if obj.cloak_state < 0 {
        obj.cloak_state = (obj.cloak_state + CLOAK_RATE).min(0);
    }
}

/// Advance headings, velocities and positions by one tick. Returns the
/// number of objects that changed position.
#[instrument(skip_all, name = "motion")]
pub fn run_motion_tick(state: &mut WorldState) -> usize {
    let mut moved = 0;
    for obj in state.objects.iter_active_mut() {
        turn(obj);
        accelerate(obj);
        if translate(obj) {
            moved += 1;
        }
        fade_cloak(obj);
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Coord;
    use crate::object::CLOAK_OFF_STATE_MAX;
    use crate::testing::{ship_base, WorldBuilder};

    fn lone_ship() -> (WorldState, crate::registry::ObjectRef) {
        let (state, _) = WorldBuilder::new()
            .with_base(ship_base("cruiser"))
            .with_object(0, None, Coord::new(100, 100))
            .build();
        let r = state.objects.active_refs()[0];
        (state, r)
    }

    #[test]
    fn test_thrust_accelerates_to_max_velocity() {
        let (mut state, r) = lone_ship();
        state.objects.get_mut(r).unwrap().thrust = Fixed::HALF;
        for _ in 0..20 {
            run_motion_tick(&mut state);
        }
        let obj = state.objects.get(r).unwrap();
        assert_eq!(obj.velocity, FixedPoint::new(Fixed::from_int(4), Fixed::ZERO));
        assert!(obj.location.h > 100);
        assert_eq!(obj.location.v, 100);
    }

    #[test]
    fn test_reverse_thrust_brakes_to_rest() {
        let (mut state, r) = lone_ship();
        {
            let obj = state.objects.get_mut(r).unwrap();
            obj.velocity = FixedPoint::new(Fixed::from_int(1), Fixed::from_int(-1));
            obj.thrust = -Fixed::HALF;
        }
        run_motion_tick(&mut state);
        assert_eq!(
            state.objects.get(r).unwrap().velocity,
            FixedPoint::new(Fixed::HALF, -Fixed::HALF)
        );
        run_motion_tick(&mut state);
        run_motion_tick(&mut state);
        assert_eq!(state.objects.get(r).unwrap().velocity, FixedPoint::ZERO);
    }

    #[test]
    fn test_fractional_motion_accumulates() {
        let (mut state, r) = lone_ship();
        state.objects.get_mut(r).unwrap().velocity =
            FixedPoint::new(Fixed::from_raw(64), Fixed::from_raw(-64));
        assert_eq!(run_motion_tick(&mut state), 1, "floor of -0.25 is -1");
        for _ in 0..3 {
            run_motion_tick(&mut state);
        }
        assert_eq!(state.objects.get(r).unwrap().location, Coord::new(101, 99));
    }

    #[test]
    fn test_turn_velocity_rotates_heading() {
        let (mut state, r) = lone_ship();
        state.objects.get_mut(r).unwrap().turn_velocity = Fixed::from_raw(-384);
        run_motion_tick(&mut state);
        run_motion_tick(&mut state);
        assert_eq!(state.objects.get(r).unwrap().direction, 357);
    }

    #[test]
    fn test_warp_speed_overrides_thrust() {
        let (mut state, r) = lone_ship();
        {
            let obj = state.objects.get_mut(r).unwrap();
            obj.direction = 90;
            obj.presence = Presence::Warping {
                speed: Fixed::from_int(30),
            };
        }
        run_motion_tick(&mut state);
        let obj = state.objects.get(r).unwrap();
        assert_eq!(obj.location, Coord::new(100, 130));
    }

    #[test]
    fn test_cloak_fades() {
        let (mut state, r) = lone_ship();
        state.objects.get_mut(r).unwrap().cloak_state = 253;
        run_motion_tick(&mut state);
        assert_eq!(state.objects.get(r).unwrap().cloak_state, CLOAK_ON_STATE_MAX);

        state.objects.get_mut(r).unwrap().cloak_state = CLOAK_OFF_STATE_MAX;
        for _ in 0..200 {
            run_motion_tick(&mut state);
        }
        assert_eq!(state.objects.get(r).unwrap().cloak_state, 0);
    }
}

//! Effects of each action kind once the focus has passed the filter.
//!
//! Presentation kinds only talk to the sink, with one exception: PLAY with a
//! list of alternatives picks from the world stream, the same stream that
//! seeds new objects. A sound cue therefore shifts the seeds of objects
//! created after it. Object streams are never touched by presentation.

use super::filter::Resolved;
use super::{Action, ActionKind, Key, KillKind, MoveOrigin, PushKind, ValueRange, Within};
use crate::combat::{self, WeaponError};
use crate::conditions;
use crate::effects::{EffectSink, SoundCue};
use crate::fixed::{Coord, Fixed, FixedPoint};
use crate::lifecycle;
use crate::object::{attr, Destination, Presence, WeaponState, NATURAL_SCALE};
use crate::random::Random;
use crate::registry::ObjectRef;
use crate::rotation::{add_angle, rot_point};
use crate::scenario::{AdmiralId, BaseId, Scenario};
use crate::state::{Victory, WorldState};

pub(super) fn apply(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    action: &Action,
    resolved: &Resolved,
    offset: Option<Coord>,
) {
    let Resolved {
        subject,
        direct,
        focus,
    } = *resolved;
    let owner_of = |state: &WorldState, r: Option<ObjectRef>| -> Option<AdmiralId> {
        r.and_then(|r| state.objects.get(r)).and_then(|o| o.owner)
    };

    match &action.kind {
        ActionKind::Age { relative, value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                let v = value.sample(&mut obj.random);
                if *relative && obj.age >= 0 {
                    obj.age = obj.age.saturating_add(v);
                } else {
                    obj.age = v;
                }
            }
        }

        ActionKind::Assume { which } => {
            let bump = state
                .admirals
                .first()
                .map_or(0, |a| a.score[0].max(0) as usize);
            if let Some(slot) = state.initials.get_mut(which + bump) {
                *slot = focus;
            }
        }

        ActionKind::CapSpeed { value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.max_velocity = match value {
                    Some(v) => *v,
                    None => scenario
                        .bases
                        .get(obj.base)
                        .map_or(obj.max_velocity, |b| b.max_velocity),
                };
            }
        }

        ActionKind::Capture { player } => {
            let owner = match player {
                Some(p) => Some(*p),
                None if action.reflexive.unwrap_or(false) => owner_of(state, direct),
                None => owner_of(state, subject),
            };
            if let Some(f) = focus {
                lifecycle::capture(state, f, owner);
            }
        }

        ActionKind::Check => {
            conditions::check(state, scenario, sink);
        }

        ActionKind::Cloak => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                combat::cloak(obj);
            }
        }

        ActionKind::Condition { enable, disable } => {
            for &c in enable {
                if let Some(cond) = state.conditions.get_mut(c) {
                    cond.enabled = true;
                }
            }
            for &c in disable {
                if let Some(cond) = state.conditions.get_mut(c) {
                    cond.enabled = false;
                }
            }
        }

        ActionKind::Create {
            base,
            count,
            relative_velocity,
            relative_direction,
            distance,
            within,
            inherit,
            legacy_random,
        } => {
            let Some(creator) = focus else {
                return;
            };
            let spec = CreateSpec {
                base: *base,
                count: *count,
                relative_velocity: *relative_velocity,
                relative_direction: *relative_direction,
                distance: *distance,
                within: *within,
                inherit: *inherit,
                legacy_random: *legacy_random,
            };
            create(state, scenario, sink, &spec, creator, direct, offset);
        }

        ActionKind::Delay { .. } => {
            // handled by the interpreter
        }

        ActionKind::Disable { value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.offline_time = value.sample(&mut obj.random).to_int();
            }
        }

        ActionKind::Energize { value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                if let Some(base) = scenario.bases.get(obj.base) {
                    combat::alter_energy(obj, base, *value);
                }
            }
        }

        ActionKind::Equip { which, base } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                *obj.weapon_mut(*which) = WeaponState::equipped(scenario, *base);
                obj.recompute_weapon_ranges(scenario);
            }
        }

        ActionKind::Fire { which } => {
            let Some(f) = focus else {
                return;
            };
            let target = state.objects.get(f).and_then(|o| o.target);
            if let Err(e) = combat::fire_weapon(state, scenario, sink, f, *which, target) {
                log_weapon_error(f, &e);
            }
        }

        ActionKind::Flash { duration, color } => sink.flash(*duration, *color),

        ActionKind::Heal { value } => {
            if let Some(f) = focus {
                combat::alter_health(state, scenario, sink, f, *value);
            }
        }

        ActionKind::Hold => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.destination = Destination::None;
                obj.destination_location = None;
                obj.dest_object_dest = None;
                obj.attributes &= !attr::STATIC_DESTINATION;
            }
        }

        ActionKind::Key { disable, enable } => {
            state.disabled_keys |= Key::mask(disable);
            state.disabled_keys &= !Key::mask(enable);
        }

        ActionKind::Kill { kind } => match kind {
            KillKind::None => {
                if let Some(f) = focus {
                    state.objects.mark_for_removal(f);
                }
            }
            KillKind::Expire => {
                if let Some(s) = subject {
                    state.objects.mark_for_removal(s);
                }
            }
            KillKind::Destroy => {
                if let Some(f) = focus {
                    combat::destroy(state, scenario, sink, f);
                }
            }
        },

        ActionKind::Land { speed } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.presence = Presence::Landing {
                    scale: NATURAL_SCALE,
                    speed: *speed,
                };
            }
        }

        ActionKind::Message { id, pages } => sink.post_message(*id, pages),

        ActionKind::Morph { keep_ammo, base } => {
            if let Some(f) = focus {
                lifecycle::morph(state, scenario, f, *base, *keep_ammo);
            }
        }

        ActionKind::Move {
            origin,
            to,
            distance,
            within,
        } => {
            let Some(f) = focus else {
                return;
            };
            let location_of = |r: Option<ObjectRef>| {
                r.and_then(|r| state.objects.get(r))
                    .map_or(Coord::default(), |o| o.location)
            };
            let from = match origin {
                MoveOrigin::Level => Coord::default(),
                MoveOrigin::Subject => location_of(subject),
                MoveOrigin::Direct => location_of(direct),
            };
            if let Some(obj) = state.objects.get_mut(f) {
                let mut at = from.offset(to.unwrap_or_default());
                if let Some(d) = distance {
                    at = at.offset(random_offset(&mut obj.random, *d, *within));
                }
                obj.location = at;
                obj.motion_fraction = FixedPoint::ZERO;
            }
        }

        ActionKind::Occupy { value } => {
            let Some(f) = focus else {
                return;
            };
            let subject_owner = owner_of(state, subject);
            let Some(obj) = state.objects.get_mut(f) else {
                return;
            };
            if obj.owner == subject_owner {
                return;
            }
            let needed = scenario.bases.get(obj.base).map_or(0, |b| b.occupy_count);
            obj.occupation = obj.occupation.saturating_add(*value);
            if obj.occupation >= needed {
                lifecycle::capture(state, f, subject_owner);
            }
        }

        ActionKind::Order => {
            if let Some(admiral) = owner_of(state, focus) {
                lifecycle::give_command(state, admiral);
            }
        }

        ActionKind::Pay { value, player } => {
            let who = player.or_else(|| owner_of(state, focus));
            if let Some(admiral) = who.and_then(|a| state.admirals.get_mut(a)) {
                admiral.cash = admiral.cash.saturating_add(*value);
            }
        }

        ActionKind::Push { kind, value } => {
            let Some(f) = focus else {
                return;
            };
            let subject_motion = subject
                .and_then(|s| state.objects.get(s))
                .map(|o| (o.velocity, o.direction));
            if let Some(obj) = state.objects.get_mut(f) {
                push(obj, *kind, *value, subject_motion);
            }
        }

        ActionKind::Reveal { initial } => {
            for &i in initial {
                lifecycle::reveal_initial(state, scenario, sink, i);
            }
        }

        ActionKind::Score {
            player,
            which,
            value,
        } => {
            let who = player.or_else(|| owner_of(state, focus));
            if let Some(slot) = who
                .and_then(|a| state.admirals.get_mut(a))
                .and_then(|a| a.score.get_mut(*which))
            {
                *slot = slot.saturating_add(*value);
            }
        }

        ActionKind::Select { screen, line } => sink.select_screen(*screen, *line),

        ActionKind::Play {
            priority,
            persistence,
            absolute,
            volume,
            sound,
            any,
        } => {
            let sound = match sound {
                Some(s) => Some(s.clone()),
                None if !any.is_empty() => {
                    // world stream, shared with object seeding
                    let i = state.random.next(any.len() as i32) as usize;
                    any.get(i).cloned()
                }
                None => None,
            };
            let Some(sound) = sound else {
                return;
            };
            let at = if *absolute {
                None
            } else {
                focus.and_then(|f| state.objects.get(f)).map(|o| o.location)
            };
            sink.play_sound(&SoundCue {
                sound,
                at,
                priority: *priority,
                persistence: *persistence,
                volume: *volume,
            });
        }

        ActionKind::Spark {
            count,
            hue,
            decay,
            velocity,
        } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get(f)) {
                sink.sparks(obj.location, *count, *hue, *decay, *velocity);
            }
        }

        ActionKind::Spin { value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.turn_velocity = value.sample(&mut obj.random);
            }
        }

        ActionKind::Thrust { value } => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                obj.thrust = value.sample(&mut obj.random);
            }
        }

        ActionKind::Warp => {
            if let Some(obj) = focus.and_then(|f| state.objects.get_mut(f)) {
                if obj.presence == Presence::Normal {
                    obj.presence = Presence::WarpIn {
                        progress: 0,
                        cues: 0,
                    };
                }
            }
        }

        ActionKind::Win { player, next, text } => {
            if state.victory.is_some() {
                return;
            }
            let winner = player.or_else(|| owner_of(state, focus));
            log::info!(
                "Scenario won by {:?} at tick {}",
                winner.and_then(|w| state.admirals.get(w)).map(|a| &a.name),
                state.tick
            );
            state.victory = Some(Victory {
                winner,
                next: next.clone(),
                text: text.clone(),
                tick: state.tick,
            });
        }

        ActionKind::Zoom { value } => sink.zoom(*value),
    }
}

fn log_weapon_error(r: ObjectRef, e: &WeaponError) {
    log::trace!("{:?} could not fire: {}", r, e);
}

struct CreateSpec {
    base: BaseId,
    count: Option<ValueRange<i32>>,
    relative_velocity: bool,
    relative_direction: bool,
    distance: Option<i32>,
    within: Within,
    inherit: bool,
    legacy_random: bool,
}

/// Spawn products of `spec` around `creator`. Random draws come from the
/// creator's stream, so the results depend only on the creator's history.
fn create(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    spec: &CreateSpec,
    creator: ObjectRef,
    direct: Option<ObjectRef>,
    offset: Option<Coord>,
) {
    let Some(product_base) = scenario.bases.get(spec.base) else {
        return;
    };
    let n = {
        let Some(obj) = state.objects.get_mut(creator) else {
            return;
        };
        match spec.count {
            Some(range) if range.end.wrapping_sub(range.begin) > 1 => range.sample(&mut obj.random),
            fixed => {
                if spec.legacy_random {
                    obj.random.next(1);
                }
                fixed.map_or(1, |r| r.begin)
            }
        }
    };

    for _ in 0..n.max(0) {
        let Some(obj) = state.objects.get_mut(creator) else {
            return;
        };
        let mut direction = if spec.relative_direction {
            obj.direction
        } else {
            0
        };
        if let Some(spread) = product_base.initial_direction {
            direction = add_angle(direction, spread.sample(&mut obj.random));
        }
        let mut at = obj.location.offset(offset.unwrap_or_default());
        if let Some(d) = spec.distance {
            at = at.offset(random_offset(&mut obj.random, d, spec.within));
        }
        let owner = obj.owner;
        let inherited_velocity = spec.relative_velocity.then_some(obj.velocity);
        let target = if spec.inherit { obj.target } else { direct };

        let Some(product) = state.spawn(scenario, spec.base, at, direction, owner) else {
            return;
        };
        if let Some(p) = state.objects.get_mut(product) {
            if let Some(v) = inherited_velocity {
                p.velocity = FixedPoint::new(p.velocity.h + v.h, p.velocity.v + v.v);
            }
            p.target = target;
        }
        lifecycle::finish_creation(state, scenario, sink, product);
    }
}

fn push(
    obj: &mut crate::object::SpaceObject,
    kind: PushKind,
    value: Fixed,
    subject: Option<(FixedPoint, i32)>,
) {
    let along = |direction: i32| {
        let (cos, sin) = rot_point(direction);
        FixedPoint::new(cos.mul(value), sin.mul(value))
    };
    match kind {
        PushKind::Stop => obj.velocity = FixedPoint::ZERO,
        PushKind::Decelerate => {
            let keep = Fixed::ONE - value;
            obj.velocity = FixedPoint::new(obj.velocity.h.mul(keep), obj.velocity.v.mul(keep));
        }
        PushKind::Cruise => obj.velocity = along(obj.direction),
        PushKind::Collide => {
            if let Some((v, _)) = subject {
                let dh = (v.h - obj.velocity.h).mul(value);
                let dv = (v.v - obj.velocity.v).mul(value);
                obj.velocity = FixedPoint::new(obj.velocity.h + dh, obj.velocity.v + dv);
            }
        }
        PushKind::Set => {
            if let Some((_, direction)) = subject {
                obj.velocity = along(direction);
            }
        }
        PushKind::Boost => {
            if let Some((_, direction)) = subject {
                let add = along(direction);
                obj.velocity = FixedPoint::new(obj.velocity.h + add.h, obj.velocity.v + add.v);
            }
        }
    }
}

/// Random displacement within `distance` of the origin. Circles use a
/// random heading and radius.
fn random_offset(random: &mut Random, distance: i32, within: Within) -> Coord {
    match within {
        Within::Square => Coord::new(random.next_signed(distance), random.next_signed(distance)),
        Within::Circle => {
            let angle = random.next(360);
            let radius = random.next(distance) as i64;
            let (cos, sin) = rot_point(angle);
            Coord::new(
                ((radius * cos.raw() as i64) >> Fixed::SHIFT) as i32,
                ((radius * sin.raw() as i64) >> Fixed::SHIFT) as i32,
            )
        }
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

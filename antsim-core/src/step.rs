use crate::action;
use crate::ai::decision_tick;
use crate::conditions;
use crate::config::SimConfig;
use crate::effects::EffectSink;
use crate::input::{keys, Command, PlayerInputs};
use crate::metrics::SimMetrics;
use crate::object::attr;
use crate::profiling::{frame_mark_decision, frame_mark_tick};
use crate::scenario::Scenario;
use crate::state::WorldState;
use crate::systems::{run_aging_tick, run_collision_tick, run_motion_tick, run_proximity_tick};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("No admiral {0}")]
    UnknownAdmiral(usize),
    #[error("Admiral {0} has no flagship")]
    NoFlagship(usize),
    #[error("Selected object is gone")]
    StaleSelection,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Objects that decided this tick; zero between decision passes.
    pub decided: usize,
    pub moved: usize,
    pub contacts: usize,
    pub expired: usize,
    pub resumed: usize,
    pub conditions_fired: usize,
    pub swept: usize,
    pub checksum: Option<u64>,
}

/// Time `f` into `slot` when metrics are being collected.
fn timed<T>(slot: Option<&mut Duration>, f: impl FnOnce() -> T) -> T {
    match slot {
        Some(slot) => {
            let start = Instant::now();
            let out = f();
            *slot += start.elapsed();
            out
        }
        None => f(),
    }
}

/// Advance the world by one tick.
///
/// Order: player input, proximity, decisions (every
/// `decide_every_cycles` ticks), motion, collisions, aging, delayed
/// actions, scenario conditions, then removal of everything flagged this
/// tick.
pub fn step_world(
    state: &mut WorldState,
    scenario: &Scenario,
    inputs: &[PlayerInputs],
    config: &SimConfig,
    sink: &mut dyn EffectSink,
    mut metrics: Option<&mut SimMetrics>,
) -> TickReport {
    let tick_start = metrics.as_ref().map(|_| Instant::now());

    // 1. Advance tick
    state.tick += 1;
    sink.begin_tick(state.tick);
    state.queue.max_actions_per_drain = config.max_actions_per_drain;
    let mut report = TickReport {
        tick: state.tick,
        ..Default::default()
    };

    // 2. Process inputs
    for input in inputs {
        if let Err(e) = apply_input(state, input) {
            log::warn!("Dropped input from admiral {}: {}", input.admiral, e);
        }
    }

    // 3. Sighting and decisions
    run_proximity_tick(state);
    report.decided = run_decisions(state, scenario, sink, config, metrics.as_deref_mut());

    // 4. Motion and contact
    report.moved = timed(metrics.as_deref_mut().map(|m| &mut m.motion_time), || {
        run_motion_tick(state)
    });
    report.contacts = timed(
        metrics.as_deref_mut().map(|m| &mut m.collision_time),
        || run_collision_tick(state, scenario, sink),
    );
    report.expired = run_aging_tick(state, scenario, sink);

    // 5. Scripted actions
    let tick = state.tick;
    let (resumed, fired) = timed(metrics.as_deref_mut().map(|m| &mut m.action_time), || {
        let resumed = action::drain(state, scenario, sink, tick);
        (resumed, conditions::check(state, scenario, sink))
    });
    report.resumed = resumed;
    report.conditions_fired = fired;

    // 6. Free dead objects
    report.swept = state.objects.sweep();

    if config.checksum_frequency > 0 && state.tick % config.checksum_frequency as u64 == 0 {
        let checksum = state.checksum();
        log::trace!("Tick {} checksum {:016x}", state.tick, checksum);
        report.checksum = Some(checksum);
    }

    if let Some(m) = metrics {
        m.total_ticks += 1;
        if report.decided > 0 {
            m.decision_passes += 1;
        }
        m.objects_moved += report.moved as u64;
        m.contacts += report.contacts as u64;
        m.expired += report.expired as u64;
        m.delayed_resumed += report.resumed as u64;
        m.conditions_fired += report.conditions_fired as u64;
        m.swept += report.swept as u64;
        if let Some(start) = tick_start {
            m.total_time += start.elapsed();
        }
    }
    frame_mark_tick();
    report
}

/// Run the decision pass if this tick is due for one.
fn run_decisions(
    state: &mut WorldState,
    scenario: &Scenario,
    sink: &mut dyn EffectSink,
    config: &SimConfig,
    metrics: Option<&mut SimMetrics>,
) -> usize {
    let cycles = config.decide_every_cycles.max(1);
    if state.tick % cycles as u64 != 0 {
        return 0;
    }
    let decided = timed(metrics.map(|m| &mut m.decision_time), || {
        decision_tick(state, scenario, sink, cycles as i32)
    });
    frame_mark_decision();
    decided
}

/// Apply one admiral's keys and selections. Keys go to the admiral's
/// flagship, minus any keys switched off by the scenario; pending one-shot
/// requests survive until the next decision pass consumes them. A selection
/// naming a vanished object is skipped and the rest of the input still
/// applies; it is reported after the keys land.
fn apply_input(state: &mut WorldState, input: &PlayerInputs) -> Result<(), InputError> {
    let admiral = state
        .admirals
        .get(input.admiral)
        .ok_or(InputError::UnknownAdmiral(input.admiral))?;
    let flagship = admiral.flagship;

    let mut stale = false;
    for command in &input.commands {
        let (Command::SelectControl { object } | Command::SelectTarget { object }) = *command;
        if state.objects.get(object).is_none() {
            log::debug!("Admiral {} selected a stale object {:?}", input.admiral, object);
            stale = true;
            continue;
        }
        let Some(admiral) = state.admirals.get_mut(input.admiral) else {
            continue;
        };
        match command {
            Command::SelectControl { .. } => admiral.control = Some(object),
            Command::SelectTarget { .. } => admiral.target = Some(object),
        }
    }

    let flagship = state
        .objects
        .resolve(flagship)
        .ok_or(InputError::NoFlagship(input.admiral))?;
    let disabled = state.disabled_keys;
    if let Some(obj) = state.objects.get_mut(flagship) {
        let pressed = input.keys & !disabled;
        obj.keys_down = (obj.keys_down & keys::SPECIAL) | pressed;
        if obj.has(attr::ON_AUTOPILOT) && pressed & keys::MOTION != 0 {
            obj.keys_down |= keys::MANUAL_OVERRIDE;
        }
    }
    if stale {
        return Err(InputError::StaleSelection);
    }
    Ok(())
}

/// Caps how many ticks a host may run per rendered frame, so a stalled
/// frame does not turn into an unbounded catch-up burst.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    max_ticks_per_frame: u32,
    /// Ticks discarded because a frame fell too far behind.
    pub dropped: u64,
}

impl FrameClock {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            dropped: 0,
        }
    }

    /// Ticks to run for a frame that covered `elapsed` ticks of real time.
    pub fn ticks_for(&mut self, elapsed: u64) -> u32 {
        let cap = self.max_ticks_per_frame as u64;
        if elapsed > cap {
            self.dropped += elapsed - cap;
            log::debug!("Frame behind by {} ticks; running {}", elapsed, cap);
        }
        elapsed.min(cap) as u32
    }

    /// Run one frame. Inputs apply to the first tick of the frame only.
    /// Stops early once the scenario has been decided.
    #[allow(clippy::too_many_arguments)]
    pub fn run_frame(
        &mut self,
        state: &mut WorldState,
        scenario: &Scenario,
        inputs: &[PlayerInputs],
        config: &SimConfig,
        sink: &mut dyn EffectSink,
        elapsed: u64,
        mut metrics: Option<&mut SimMetrics>,
    ) -> Vec<TickReport> {
        let ticks = self.ticks_for(elapsed);
        let mut reports = Vec::with_capacity(ticks as usize);
        for i in 0..ticks {
            let inputs: &[PlayerInputs] = if i == 0 { inputs } else { &[] };
            reports.push(step_world(
                state,
                scenario,
                inputs,
                config,
                sink,
                metrics.as_deref_mut(),
            ));
            if state.victory.is_some() {
                break;
            }
        }
        reports
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

//! Presentation side effects.
//!
//! The simulation never renders or plays anything itself. Actions that would
//! touch the screen or the speakers report to an [`EffectSink`] instead; the
//! sink sees effects in the order they happen within a tick.
//!
//! [`EffectLog`] records everything as JSON lines:
//!
//! ```json
//! {"type":"destroyed","tick":412,"object":{"slot":3,"id":17},"base":2,"owner":1}
//! ```

use crate::action::{Hue, Rgb, Screen, Zoom};
use crate::fixed::{Coord, Fixed};
use crate::registry::ObjectRef;
use crate::scenario::{AdmiralId, BaseId};
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EffectLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A sound request. `at` is `None` for sounds played at full volume
/// regardless of the listener's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundCue {
    pub sound: String,
    pub at: Option<Coord>,
    pub priority: u8,
    pub persistence: u32,
    pub volume: i32,
}

/// Receiver for effects. Every method defaults to doing nothing.
pub trait EffectSink {
    fn begin_tick(&mut self, _tick: u64) {}
    fn spawned(&mut self, _object: ObjectRef, _base: BaseId) {}
    fn destroyed(&mut self, _object: ObjectRef, _base: BaseId, _owner: Option<AdmiralId>) {}
    fn play_sound(&mut self, _cue: &SoundCue) {}
    fn post_message(&mut self, _id: Option<i64>, _pages: &[String]) {}
    fn flash(&mut self, _duration: u32, _color: Rgb) {}
    fn sparks(&mut self, _at: Coord, _count: i32, _hue: Hue, _decay: i32, _velocity: Fixed) {}
    fn zoom(&mut self, _zoom: Zoom) {}
    fn select_screen(&mut self, _screen: Screen, _line: i32) {}
    /// Warp charge-up stage `1..=4` reached by `object`.
    fn warp_cue(&mut self, _object: ObjectRef, _stage: u8) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EffectSink for NullSink {}

/// One recorded effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectEvent {
    Spawned {
        tick: u64,
        object: ObjectRef,
        base: BaseId,
    },
    Destroyed {
        tick: u64,
        object: ObjectRef,
        base: BaseId,
        owner: Option<AdmiralId>,
    },
    Sound {
        tick: u64,
        #[serde(flatten)]
        cue: SoundCue,
    },
    Message {
        tick: u64,
        id: Option<i64>,
        pages: Vec<String>,
    },
    Flash {
        tick: u64,
        duration: u32,
        color: Rgb,
    },
    Sparks {
        tick: u64,
        at: Coord,
        count: i32,
        hue: Hue,
        decay: i32,
        velocity: Fixed,
    },
    Zoom {
        tick: u64,
        zoom: Zoom,
    },
    Screen {
        tick: u64,
        screen: Screen,
        line: i32,
    },
    WarpCue {
        tick: u64,
        object: ObjectRef,
        stage: u8,
    },
}

/// Sink that keeps every effect in memory.
#[derive(Debug, Default, Clone)]
pub struct EffectLog {
    tick: u64,
    pub events: Vec<EffectEvent>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events as JSON lines.
    pub fn flush_to(&mut self, writer: &mut dyn Write) -> Result<usize, EffectLogError> {
        let n = self.events.len();
        for event in self.events.drain(..) {
            serde_json::to_writer(&mut *writer, &event)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(n)
    }

    pub fn count(&self, pred: impl Fn(&EffectEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EffectSink for EffectLog {
    fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    fn spawned(&mut self, object: ObjectRef, base: BaseId) {
        self.events.push(EffectEvent::Spawned {
            tick: self.tick,
            object,
            base,
        });
    }

    fn destroyed(&mut self, object: ObjectRef, base: BaseId, owner: Option<AdmiralId>) {
        self.events.push(EffectEvent::Destroyed {
            tick: self.tick,
            object,
            base,
            owner,
        });
    }

    fn play_sound(&mut self, cue: &SoundCue) {
        self.events.push(EffectEvent::Sound {
            tick: self.tick,
            cue: cue.clone(),
        });
    }

    fn post_message(&mut self, id: Option<i64>, pages: &[String]) {
        self.events.push(EffectEvent::Message {
            tick: self.tick,
            id,
            pages: pages.to_vec(),
        });
    }

    fn flash(&mut self, duration: u32, color: Rgb) {
        self.events.push(EffectEvent::Flash {
            tick: self.tick,
            duration,
            color,
        });
    }

    fn sparks(&mut self, at: Coord, count: i32, hue: Hue, decay: i32, velocity: Fixed) {
        self.events.push(EffectEvent::Sparks {
            tick: self.tick,
            at,
            count,
            hue,
            decay,
            velocity,
        });
    }

    fn zoom(&mut self, zoom: Zoom) {
        self.events.push(EffectEvent::Zoom {
            tick: self.tick,
            zoom,
        });
    }

    fn select_screen(&mut self, screen: Screen, line: i32) {
        self.events.push(EffectEvent::Screen {
            tick: self.tick,
            screen,
            line,
        });
    }

    fn warp_cue(&mut self, object: ObjectRef, stage: u8) {
        self.events.push(EffectEvent::WarpCue {
            tick: self.tick,
            object,
            stage,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_log_jsonl() {
        let mut log = EffectLog::new();
        log.begin_tick(7);
        log.flash(3, Rgb { r: 255, g: 0, b: 0 });
        log.destroyed(ObjectRef { slot: 1, id: 4 }, 2, None);

        let mut out = Vec::new();
        assert_eq!(log.flush_to(&mut out).unwrap(), 2);
        assert!(log.events.is_empty());

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"flash\""));
        assert!(lines[0].contains("\"tick\":7"));
        let parsed: EffectEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(
            parsed,
            EffectEvent::Destroyed {
                tick: 7,
                object: ObjectRef { slot: 1, id: 4 },
                base: 2,
                owner: None,
            }
        );
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.begin_tick(1);
        sink.zoom(Zoom::All);
        sink.post_message(Some(1), &["hello".to_string()]);
    }
}

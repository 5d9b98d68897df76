//! Tracy profiling support.
//!
//! When the `tracy` feature is enabled, the spans opened by the tick systems
//! and the decision pass are reported to Tracy. Call [`init_tracy`] early in
//! main, then connect the Tracy GUI or capture tool.
//!
//! [`frame_mark_tick`] and [`frame_mark_decision`] put tick and decision
//! boundaries on Tracy's timeline.

/// Trace level for Tracy profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceLevel {
    /// Only capture INFO level spans (default, lowest overhead)
    #[default]
    Info,
    /// Capture DEBUG level spans
    Debug,
    /// Capture TRACE level spans, including per-system detail
    Trace,
}

impl std::str::FromStr for TraceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(TraceLevel::Info),
            "debug" => Ok(TraceLevel::Debug),
            "trace" => Ok(TraceLevel::Trace),
            _ => Err(format!(
                "Invalid trace level: {}. Use info, debug, or trace.",
                s
            )),
        }
    }
}

/// Initialize the Tracy tracing subscriber.
///
/// No-op unless the `tracy` feature is enabled.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
#[cfg(feature = "tracy")]
pub fn init_tracy(level: TraceLevel) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let filter = match level {
        TraceLevel::Info => LevelFilter::INFO,
        TraceLevel::Debug => LevelFilter::DEBUG,
        TraceLevel::Trace => LevelFilter::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_tracy::TracyLayer::default())
        .with(filter)
        .init();
}

/// No-op when tracy feature is disabled.
#[cfg(not(feature = "tracy"))]
pub fn init_tracy(_level: TraceLevel) {}

/// Emit a Tracy frame marker at the end of every tick.
#[cfg(feature = "tracy")]
#[inline]
pub fn frame_mark_tick() {
    tracy_client::secondary_frame_mark!("tick");
}

#[cfg(not(feature = "tracy"))]
#[inline]
pub fn frame_mark_tick() {}

/// Emit a Tracy frame marker after each decision pass.
#[cfg(feature = "tracy")]
#[inline]
pub fn frame_mark_decision() {
    tracy_client::secondary_frame_mark!("decision");
}

#[cfg(not(feature = "tracy"))]
#[inline]
pub fn frame_mark_decision() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_level_parses_any_case() {
        assert_eq!("DEBUG".parse::<TraceLevel>(), Ok(TraceLevel::Debug));
        assert_eq!("trace".parse::<TraceLevel>(), Ok(TraceLevel::Trace));
        assert!("loud".parse::<TraceLevel>().is_err());
    }
}

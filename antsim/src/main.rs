use anyhow::{Context, Result};
use antsim_core::profiling::{init_tracy, TraceLevel};
use antsim_core::{EffectLog, FrameClock, Scenario, SimConfig, SimMetrics, WorldState};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Ticks per frame; runs through the frame clock, which caps catch-up
    #[arg(long)]
    frame_ticks: Option<u64>,

    /// Compute a checksum every N ticks (0 = disabled)
    #[arg(long)]
    checksum_every: Option<u32>,

    /// Write effects (sounds, messages, explosions) as JSON lines
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Tracy span level (info, debug, trace); ignored without the tracy feature
    #[arg(long, default_value = "info")]
    trace_level: TraceLevel,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
    init_tracy(args.trace_level);

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading {}", args.scenario.display()))?;
    let mut config = SimConfig::default();
    if let Some(n) = args.checksum_every {
        config.checksum_frequency = n;
    }

    let mut events = match &args.events {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let mut state = WorldState::new(&scenario);
    let mut log = EffectLog::new();
    let mut metrics = SimMetrics::default();
    let mut clock = FrameClock::new(&config);
    let frame = args.frame_ticks.unwrap_or(1).max(1);
    let started = std::time::Instant::now();

    log::info!("Running '{}' for {} ticks", scenario.name, args.ticks);

    while state.tick < args.ticks && state.victory.is_none() {
        let elapsed = if args.frame_ticks.is_some() {
            frame.min(args.ticks - state.tick)
        } else {
            1
        };
        let reports = clock.run_frame(
            &mut state,
            &scenario,
            &[],
            &config,
            &mut log,
            elapsed,
            Some(&mut metrics),
        );
        for report in &reports {
            if let Some(checksum) = report.checksum {
                log::debug!("Tick {} checksum {:016x}", report.tick, checksum);
            }
        }
        match events.as_mut() {
            Some(writer) => {
                log.flush_to(writer).context("writing events")?;
            }
            None => log.events.clear(),
        }
    }
    metrics.wall_time = started.elapsed();

    if let Some(mut writer) = events {
        writer.flush()?;
    }

    log::info!(
        "{} ticks in {:.1?} ({:.3} ms/tick, {} decision passes, {} dropped)",
        metrics.total_ticks,
        metrics.wall_time,
        metrics.tick_avg_ms(),
        metrics.decision_passes,
        clock.dropped
    );

    println!(
        "Finished at tick {} | objects {} | checksum {:016x}",
        state.tick,
        state.objects.active_count(),
        state.checksum()
    );
    for admiral in &state.admirals {
        println!(
            "  {}: ships {} losses {} score {:?}",
            admiral.name, admiral.ships_left, admiral.losses, admiral.score
        );
    }
    if let Some(victory) = &state.victory {
        let winner = victory
            .winner
            .and_then(|w| state.admirals.get(w))
            .map_or("nobody", |a| a.name.as_str());
        println!("Victory for {} at tick {}: {}", winner, victory.tick, victory.text);
    }

    Ok(())
}

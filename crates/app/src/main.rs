use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use flipbook_core::{
    AppConfig, AssetSource, Clock, ConsoleOverlay, DirectorySource, FrameAsset, ManualClock,
    PlaybackTrack, Scheduler, SpriteSlot, SyncMode, TracingDiagnostics,
};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::Terminal;

fn main() -> flipbook_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { run } => run_demo(&run),
        Commands::Play { config, run } => run_play(&config, &run),
        Commands::Simulate {
            rate,
            fps,
            frames,
            cost_ms,
            ticks,
            unsynced,
        } => run_simulate(rate, fps, frames, cost_ms, ticks, unsynced),
    }
}

fn run_demo(run: &RunArgs) -> flipbook_core::Result<()> {
    let rate = run.rate.unwrap_or(35.0);
    tracing::info!(rate, ticks = run.ticks, "starting demo");

    let mut scheduler = Scheduler::new(rate)?;
    let mut screen = Terminal::new(io::stdout());

    let spinner = scheduler.track(spinner_frames(), 8.0)?;
    let bar = scheduler.track(bar_frames(24), rate)?;
    let pulse = scheduler
        .track(pulse_frames(), 4.0)?
        .with_sync(SyncMode::Unsynced);

    add_track(&mut scheduler, &mut screen, spinner, (2, 8));
    add_track(&mut scheduler, &mut screen, bar, (6, 8));
    add_track(&mut scheduler, &mut screen, pulse, (2, 10));

    drive(&mut scheduler, &mut screen, run)
}

fn run_play(config: &Path, run: &RunArgs) -> flipbook_core::Result<()> {
    let mut config = AppConfig::from_path(config)?;
    if let Some(rate) = run.rate {
        config.scheduler.target_rate = rate;
        config.validate()?;
    }
    tracing::info!(
        rate = config.scheduler.target_rate,
        tracks = config.tracks.len(),
        "starting playback"
    );

    let mut scheduler = Scheduler::new(config.scheduler.target_rate)?;
    let mut screen = Terminal::new(io::stdout());
    let source = DirectorySource::new();

    for entry in &config.tracks {
        let frames = source.load(&entry.path, entry.size)?;
        if frames.is_empty() {
            tracing::warn!(track = %entry.name, "track has no frames");
        }
        let track = scheduler
            .track(frames, entry.fps)?
            .with_sync(entry.sync)
            .with_mode(entry.playback);
        add_track(&mut scheduler, &mut screen, track, entry.origin);
    }

    let run = RunArgs {
        debug: run.debug || config.scheduler.diagnostics,
        ..run.clone()
    };
    drive(&mut scheduler, &mut screen, &run)
}

fn run_simulate(
    rate: f64,
    fps: f64,
    frames: usize,
    cost_ms: u64,
    ticks: u64,
    unsynced: bool,
) -> flipbook_core::Result<()> {
    let clock = ManualClock::with_read_cost(Duration::from_millis(cost_ms));
    let mut scheduler = Scheduler::with_clock(rate, clock)?;
    let sync = if unsynced {
        SyncMode::Unsynced
    } else {
        SyncMode::Synced
    };
    let frames = (0..frames)
        .map(|i| FrameAsset::new(i.to_string(), vec![format!("frame {i}")]))
        .collect();
    let track = scheduler.track(frames, fps)?.with_sync(sync);
    let id = scheduler.register(track, SpriteSlot::new());

    let mut out = io::stdout().lock();
    for _ in 0..ticks {
        let report = scheduler.run_once();
        let shown = scheduler.get(id).and_then(PlaybackTrack::last_shown);
        let line = serde_json::json!({ "report": report, "frame": shown });
        writeln!(out, "{line}")?;
    }

    tracing::info!(
        turn = scheduler.turn(),
        catch_up = scheduler.catch_up(),
        slept = ?scheduler.clock().slept(),
        "simulation finished"
    );
    Ok(())
}

fn add_track<C: Clock>(
    scheduler: &mut Scheduler<C>,
    screen: &mut Terminal<io::Stdout>,
    track: PlaybackTrack,
    origin: (u16, u16),
) {
    let slot = SpriteSlot::new();
    scheduler.register(track, slot.clone());
    screen.add(slot, origin);
}

fn drive<C: Clock>(
    scheduler: &mut Scheduler<C>,
    screen: &mut Terminal<io::Stdout>,
    run: &RunArgs,
) -> flipbook_core::Result<()> {
    if run.debug {
        scheduler.set_diagnostics(Box::new(ConsoleOverlay::new(io::stdout())));
    } else {
        scheduler.set_diagnostics(Box::new(TracingDiagnostics));
    }

    screen.clear()?;
    let mut completed = 0;
    while run.ticks == 0 || completed < run.ticks {
        if scheduler.is_empty() {
            tracing::info!("no tracks left to play");
            break;
        }
        let report = scheduler.run_once();
        screen.draw()?;
        for id in report.finished {
            tracing::debug!(track = %id, "track finished");
        }
        completed += 1;
    }
    Ok(())
}

fn spinner_frames() -> Vec<FrameAsset> {
    ["|", "/", "-", "\\"]
        .iter()
        .map(|glyph| FrameAsset::new(*glyph, vec![glyph.to_string()]))
        .collect()
}

fn bar_frames(width: usize) -> Vec<FrameAsset> {
    (0..width)
        .map(|pos| {
            let row: String = (0..width)
                .map(|cell| if cell == pos { '#' } else { '.' })
                .collect();
            FrameAsset::new(format!("bar {pos}"), vec![row])
        })
        .collect()
}

fn pulse_frames() -> Vec<FrameAsset> {
    ["( )", "(o)", "(O)", "(o)"]
        .iter()
        .map(|glyph| FrameAsset::new(*glyph, vec![glyph.to_string()]))
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal flipbook player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Scheduler ticks per second.
    #[arg(short, long)]
    rate: Option<f64>,
    /// Number of scheduler iterations to run; 0 runs until every track stops.
    #[arg(short, long, default_value_t = 350)]
    ticks: u64,
    /// Draw the rate-control overlay in the top-left corner.
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the built-in synthetic animations.
    Demo {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Play text-frame directories described by a JSON config.
    Play {
        /// Path to the JSON configuration file.
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run one track on a simulated clock and print every tick as JSON.
    Simulate {
        #[arg(long, default_value_t = 10.0)]
        rate: f64,
        #[arg(long, default_value_t = 10.0)]
        fps: f64,
        #[arg(long, default_value_t = 5)]
        frames: usize,
        /// Simulated cost of each clock reading, in milliseconds.
        #[arg(long, default_value_t = 0)]
        cost_ms: u64,
        #[arg(long, default_value_t = 12)]
        ticks: u64,
        #[arg(long)]
        unsynced: bool,
    },
}

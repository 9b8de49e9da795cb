use std::path::{Path, PathBuf};
use std::time::Instant;

use beatviz_core::{
    AnimationFactory, AppConfig, Binding, ClockMessage, InternalClock, Master, NoteEvent, Program,
    ProgramSnapshot,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> beatviz_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            preset,
            beats,
            realtime,
        } => run(config.as_deref(), preset.as_deref(), beats, realtime),
        Commands::Roles { config } => print_roles(config.as_deref()),
        Commands::DemoPreset { output } => write_demo_preset(&output),
    }
}

fn load_config(path: Option<&Path>) -> beatviz_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::live_defaults()),
    }
}

/// Builds a master with either the preset at `preset` or the demo program
/// attached to the surface.
fn build_master(config: &AppConfig, preset: Option<&Path>) -> beatviz_core::Result<Master> {
    let mut master = Master::new(config)?;
    let program = match preset {
        Some(path) => {
            let snapshot = ProgramSnapshot::from_json_str(&std::fs::read_to_string(path)?)?;
            master.load_snapshot(&snapshot)?
        }
        None => {
            let id = master.add_program(Program::new("demo"));
            master.with_program(id, build_demo)??;
            id
        }
    };
    master.set_program(Some(program))?;
    Ok(master)
}

fn build_demo(program: &mut Program, factory: &mut AnimationFactory) -> beatviz_core::Result<()> {
    let rain = program.create_group_with(factory, "falling-objects")?;
    program.require_group_mut(rain)?.set_enabled(true);

    let sparks = program.create_group_with(factory, "falling-objects")?;
    let group = program.require_group_mut(sparks)?;
    if let Some(animation) = group.animation_at_mut(0) {
        animation.set_parameter_from_property("direction", "Rand.")?;
        animation.set_parameter_from_property("density", "0.05")?;
        animation.set_parameter_from_property("hue", "0.6")?;
        animation.set_parameter_from_property("loop-size", "1/2")?;
    }
    group.create_animation(factory, "text", None)?;

    let title = program.create_group_with(factory, "text")?;
    let group = program.require_group_mut(title)?;
    if let Some(animation) = group.animation_at_mut(0) {
        animation.set_parameter_from_property("style", "Zoom out")?;
        animation.set_parameter_from_property("loop-size", "4")?;
    }
    Ok(())
}

fn run(config: Option<&Path>, preset: Option<&Path>, beats: u64, realtime: bool) -> beatviz_core::Result<()> {
    let config = load_config(config)?;
    let mut master = build_master(&config, preset)?;
    let resolution = u64::from(config.clock.resolution);
    let total = beats * resolution;
    tracing::info!(beats, realtime, "starting playback");

    master.process_clock(ClockMessage::Start)?;
    let mut internal = InternalClock::new(&config.clock);
    let mut last = Instant::now();
    let mut dispatched = 0;

    while dispatched < total {
        let due = if realtime {
            std::thread::sleep(internal.pulse_interval());
            let now = Instant::now();
            let due = internal.advance(now - last);
            last = now;
            due.min(total - dispatched)
        } else {
            1
        };

        for _ in 0..due {
            let tick = master.step()?;
            dispatched += 1;
            if !tick.is_quarter_note() {
                continue;
            }
            master.handle_note(NoteEvent::on((tick.qn % 16) as u8, 36 + (tick.qn * 5 % 48) as u8, 100));
            if tick.qn == beats / 2 {
                if let Err(err) = master.trigger_named("MASTER_ANIMATION_1", true) {
                    tracing::warn!(%err, "could not toggle the second track");
                }
            }
            tracing::info!(
                qn = tick.qn,
                items = master.live_items(),
                remaps = master.remaps(),
                "beat"
            );
        }
    }

    master.process_clock(ClockMessage::Stop)?;
    tracing::info!(items = master.live_items(), remaps = master.remaps(), "playback finished");
    Ok(())
}

fn print_roles(config: Option<&Path>) -> beatviz_core::Result<()> {
    let config = load_config(config)?;
    let master = build_master(&config, None)?;
    for (role, binding) in master.roles().iter() {
        let target = match binding {
            Some(Binding::Trigger(target)) => format!("{target:?}"),
            Some(Binding::Control(target)) => format!("{} {}", target.animation, target.parameter),
            None => "-".to_string(),
        };
        println!("{role}\t{:?}\t{target}", role.kind());
    }
    Ok(())
}

fn write_demo_preset(output: &PathBuf) -> beatviz_core::Result<()> {
    let config = AppConfig::live_defaults();
    let mut factory = AnimationFactory::new(config.clock.resolution);
    let mut program = Program::new("demo");
    build_demo(&mut program, &mut factory)?;
    std::fs::write(output, program.snapshot().to_json_string()?)?;
    tracing::info!(?output, "wrote demo preset");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-synchronous VJ engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a program against the clock and log what happens.
    Run {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Program snapshot to load instead of the demo program.
        #[arg(short, long)]
        preset: Option<PathBuf>,
        /// Number of beats to play.
        #[arg(short, long, default_value_t = 16)]
        beats: u64,
        /// Pace ticks with the internal clock instead of running flat out.
        #[arg(long)]
        realtime: bool,
    },
    /// Print the control-surface role table for the demo program.
    Roles {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the demo program snapshot as JSON.
    DemoPreset {
        /// Output path for the snapshot.
        output: PathBuf,
    },
}

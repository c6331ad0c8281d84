//! Tilerunner - headless runner.
//!
//! Plays a scripted input sequence through a level and logs what the
//! character does.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tilerunner_game::{Level, MovementEvent, PlayerInput, Simulation, SimulationConfig, SimulationError};

/// Tilerunner movement simulator
#[derive(Parser)]
#[command(version, about = "Runs a side-scrolling character through a tile level")]
struct Cli {
    /// JSON simulation config. Missing fields use defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// ASCII level map. Defaults to the built-in demo level.
    #[arg(long, value_name = "PATH")]
    level: Option<PathBuf>,

    /// JSON input script: a list of `{ "ticks": n, ...buttons }` steps.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Stop after this many ticks even if the script runs longer.
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the final player state as JSON.
    #[arg(long)]
    dump: bool,
}

/// Hold `input` for `ticks` ticks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScriptStep {
    ticks: u32,
    #[serde(flatten)]
    input: PlayerInput,
}

/// Walk right, hop at the ramp, then sprint into the spikes.
fn default_script() -> Vec<ScriptStep> {
    vec![
        ScriptStep { ticks: 30, input: PlayerInput::default() },
        ScriptStep { ticks: 120, input: PlayerInput::right() },
        ScriptStep { ticks: 12, input: PlayerInput::right().with_jump() },
        ScriptStep { ticks: 180, input: PlayerInput::right() },
        ScriptStep { ticks: 240, input: PlayerInput::right().with_sprint() },
        ScriptStep { ticks: 60, input: PlayerInput::default() },
    ]
}

fn load_script(path: &Path) -> Result<Vec<ScriptStep>, SimulationError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn build_simulation(cli: &Cli) -> Result<Simulation, SimulationError> {
    let config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };

    let level = match &cli.level {
        Some(path) => {
            let map = std::fs::read_to_string(path)?;
            let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("level");
            Level::parse(name, &map, &config.level)?
        }
        None => Level::demo(&config.level)?,
    };

    Simulation::new(config, level)
}

fn run(cli: &Cli) -> Result<(), SimulationError> {
    let mut simulation = build_simulation(cli)?;
    let script = match &cli.script {
        Some(path) => load_script(path)?,
        None => default_script(),
    };
    let player_id = simulation.add_player("Player1");

    log::info!(
        "Running level {} ({}x{} tiles) at {} Hz",
        simulation.level.name,
        simulation.level.width,
        simulation.level.height,
        simulation.config.tick_rate
    );

    let limit = cli.ticks.unwrap_or(u64::MAX);
    let inputs = script
        .iter()
        .flat_map(|step| std::iter::repeat(step.input).take(step.ticks as usize));

    for input in inputs {
        if simulation.frame >= limit {
            break;
        }

        for (id, event) in simulation.tick(&[input]) {
            match event {
                MovementEvent::ModeChanged { from, to } => {
                    log::debug!("[{}] player {} {} -> {}", simulation.frame, id, from, to)
                }
                MovementEvent::Jumped { count } => {
                    log::info!("[{}] player {} jumped ({})", simulation.frame, id, count)
                }
                MovementEvent::Landed { surface, velocity } => log::info!(
                    "[{}] player {} landed on {:?} at {:.1} u/s",
                    simulation.frame,
                    id,
                    surface,
                    velocity.z
                ),
                MovementEvent::WallWalkStarted => {
                    log::info!("[{}] player {} started wall walking", simulation.frame, id)
                }
                other => log::trace!("[{}] player {} {:?}", simulation.frame, id, other),
            }
        }

        if simulation.frame % u64::from(simulation.config.tick_rate) == 0 {
            if let Some(player) = simulation.get_player(player_id) {
                log::info!(
                    "[{}] pos=({:.1}, {:.1}) vel=({:.1}, {:.1}) mode={}",
                    simulation.frame,
                    player.position().x,
                    player.position().z,
                    player.movement.velocity.x,
                    player.movement.velocity.z,
                    player.movement.movement_name()
                );
            }
        }
    }

    if let Some(player) = simulation.get_player(player_id) {
        println!(
            "{} ticks ({:.2}s): player at ({:.1}, {:.1}), {}, {} death(s)",
            simulation.frame,
            simulation.time(),
            player.position().x,
            player.position().z,
            player.movement.movement_name(),
            player.deaths
        );
    }

    if cli.dump {
        println!("{}", simulation.snapshot()?);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

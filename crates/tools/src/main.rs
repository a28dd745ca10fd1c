//! `navplan`: solve a delivery map and inspect or simulate its policy.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use nav_core::{
    MapDescription, SimulationReport, Simulator, ValueIteration, World, parse_map,
    resolve_instance,
};
use settings::Settings;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the ASCII map file
    #[arg(short, long)]
    map: PathBuf,
    /// TOML settings file (defaults to `navplan.toml` when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log solver progress at debug level
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value and optimal action of every belief state
    Values,
    /// Print the full decision tree from the package pickup
    Policy,
    /// Resolve the fragile edges and run the agent until the package is settled
    Simulate {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        max_ticks: Option<u32>,
        /// Emit the report as JSON instead of the action log
        #[arg(long)]
        json: bool,
    },
    /// Interactive menu over the same operations
    Menu,
}

/// A validated map together with its solved planner.
struct Planned {
    map: MapDescription,
    engine: ValueIteration,
}

impl Planned {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read map file: {}", path.display()))?;
        let map = parse_map(&text)
            .with_context(|| format!("Failed to parse map file: {}", path.display()))?;
        let world = World::new(&map).context("Map failed validation")?;
        let mut engine = ValueIteration::for_world(&world).context("Failed to build planner")?;
        engine.solve().context("Value iteration failed")?;
        Ok(Self { map, engine })
    }

    fn simulate(&self, seed: u64, max_ticks: u32) -> Result<(World, SimulationReport)> {
        let instance = resolve_instance(&self.map, seed).context("Failed to resolve instance")?;
        let world = World::new(&instance).context("Resolved instance failed validation")?;
        let mut simulator = Simulator::new(world, &self.engine);
        let report = simulator.run(max_ticks).context("Simulation failed")?;
        Ok((simulator.world().clone(), report))
    }
}

fn print_run(world: &World, report: &SimulationReport) {
    println!("# Clock Time 0:");
    for step in &report.steps {
        println!("Agent 0 Action: {}", step.action);
        println!("# Clock Time {}:", step.time + 1);
    }
    println!("Outcome: {:?}", report.outcome);
    println!("Snapshot Hash: {}", report.snapshot_hash);
    println!("Final State:");
    print!("{world}");
}

fn run_menu(planned: &Planned, settings: &Settings) -> Result<()> {
    const PROMPT: &str = "Choose operation from the following options:\n\
        0. Print the value of each belief-state, and the optimal action in that belief state.\n\
        1. Generate new graph instance.\n\
        2. Run simulator (requires a generated instance).\n\
        3. Quit.\n\
        Your choice: ";

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut generated = 0u64;
    let mut instance_seed = None;
    loop {
        print!("{PROMPT}");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(());
        };
        match line?.trim() {
            "0" => print!("{}", planned.engine.belief_states_values()),
            "1" => {
                let seed = settings.seed.wrapping_add(generated);
                generated += 1;
                instance_seed = Some(seed);
                println!("Instance generated (seed {seed}).");
            }
            "2" => match instance_seed {
                Some(seed) => {
                    let (world, report) = planned.simulate(seed, settings.max_ticks)?;
                    print_run(&world, &report);
                }
                None => println!("A graph instance must exist before running the simulator."),
            },
            "3" => return Ok(()),
            other => println!("Invalid input: {other}! Write either '0', '1', '2' or '3'.\n"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    Builder::from_env(Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }))
        .init();

    let settings = Settings::load(cli.config.as_deref())?;
    let planned = Planned::load(&cli.map)?;

    match cli.command {
        Commands::Values => print!("{}", planned.engine.belief_states_values()),
        Commands::Policy => print!("{}", planned.engine.find_policy().context("Policy walk failed")?),
        Commands::Simulate { seed, max_ticks, json } => {
            if settings.show_values {
                print!("{}", planned.engine.belief_states_values());
            }
            if settings.show_policy {
                print!("{}", planned.engine.find_policy().context("Policy walk failed")?);
            }
            let seed = seed.unwrap_or(settings.seed);
            let max_ticks = max_ticks.unwrap_or(settings.max_ticks);
            let (world, report) = planned.simulate(seed, max_ticks)?;
            if json {
                let out = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize report")?;
                println!("{out}");
            } else {
                print_run(&world, &report);
            }
        }
        Commands::Menu => run_menu(&planned, &settings)?,
    }
    Ok(())
}

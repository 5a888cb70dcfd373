//! SYMBIOSIS - CLI Entry Point
//!
//! Headless artificial-life ecosystem simulator.

use clap::{Parser, Subcommand};
use symbiosis::equilibrium::carrying_capacity;
use symbiosis::{benchmark, sweep, BehaviorKind, BehaviorTable, Config, Simulation, SimulationSnapshot};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "symbiosis")]
#[command(version)]
#[command(about = "Artificial-life ecosystem with reactive and learning behaviors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Simulated seconds to run
        #[arg(short, long, default_value = "300")]
        duration: f64,

        /// Frames per simulated second
        #[arg(long, default_value = "60")]
        tick_rate: u32,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write a snapshot here when done
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Enable the equilibrium controller
        #[arg(short, long)]
        equilibrium: bool,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume simulation from a snapshot
    Resume {
        /// Snapshot file to resume from
        #[arg(short = 'i', long)]
        snapshot: PathBuf,

        /// Configuration file for loop and statistics settings
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Additional simulated seconds
        #[arg(short, long, default_value = "300")]
        duration: f64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write the resulting snapshot here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run performance benchmark
    Benchmark {
        /// Simulated seconds
        #[arg(short, long, default_value = "60")]
        duration: f64,

        /// Population size
        #[arg(short, long, default_value = "100")]
        population: usize,
    },

    /// Run several seeds in parallel and compare outcomes
    Sweep {
        /// Seeds to run, e.g. --seeds 1,2,3
        #[arg(short, long, value_delimiter = ',', default_value = "1,2,3,4")]
        seeds: Vec<u64>,

        /// Simulated seconds per run
        #[arg(short, long, default_value = "120")]
        duration: f64,

        /// Initial population per run
        #[arg(short, long, default_value = "20")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a snapshot file
    Analyze {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            duration,
            tick_rate,
            seed,
            snapshot,
            equilibrium,
            quiet,
        } => run_simulation(config, duration, tick_rate, seed, snapshot, equilibrium, quiet),

        Commands::Resume {
            snapshot,
            config,
            duration,
            seed,
            output,
        } => resume_simulation(snapshot, config, duration, seed, output),

        Commands::Benchmark { duration, population } => run_benchmark(duration, population),

        Commands::Sweep {
            seeds,
            duration,
            population,
        } => run_sweep(seeds, duration, population),

        Commands::Init { output } => generate_config(output),

        Commands::Analyze { snapshot } => analyze_snapshot(snapshot),
    }
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Ok(Config::from_file(path)?)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

/// Step until `duration` simulated seconds have passed, printing a summary
/// line every simulated 10 seconds
fn drive(sim: &mut Simulation, duration: f64, frame_dt: f32, quiet: bool) {
    if sim.speed() <= 0.0 {
        log::warn!("Simulation speed is 0, nothing to run");
        return;
    }
    let end = sim.time() + duration;
    let mut next_report = sim.time();

    while sim.time() < end {
        sim.step(frame_dt);

        if !quiet && sim.time() >= next_report {
            println!("{}", sim.stats.summary());
            next_report += 10.0;
        }
    }
}

fn run_simulation(
    config_path: PathBuf,
    duration: f64,
    tick_rate: u32,
    seed: Option<u64>,
    snapshot: Option<PathBuf>,
    equilibrium: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&config_path)?;
    config.equilibrium.enabled |= equilibrium;

    let mut sim = if let Some(s) = seed {
        println!("Using seed: {}", s);
        Simulation::new_with_seed(config.clone(), s)
    } else {
        Simulation::new(config.clone())
    };

    println!("Starting simulation");
    println!("  Initial population: {}", sim.population());
    println!("  Arena: {}x{}", config.world.size, config.world.size);
    println!("  Duration: {}s at {} frames/s", duration, tick_rate);
    println!();

    let frame_dt = 1.0 / tick_rate.max(1) as f32;
    let start = Instant::now();
    drive(&mut sim, duration, frame_dt, quiet);
    let elapsed = start.elapsed();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", sim.ticks());
    println!("Speed: {:.1} ticks/s", sim.ticks() as f64 / elapsed.as_secs_f64());
    println!("Final population: {}", sim.population());
    println!("Seed: {}", sim.seed());
    if let Some(controller) = sim.equilibrium() {
        println!(
            "Equilibrium: R={:.2} ({})",
            controller.reproduction_ratio(),
            controller.stability()
        );
    }

    if let Some(path) = snapshot {
        sim.snapshot().save(&path)?;
        println!("Snapshot: {:?}", path);

        let stats_path = path.with_extension("stats.json");
        sim.stats.save_json(&stats_path)?;
        println!("Stats history: {:?}", stats_path);
    }

    Ok(())
}

fn resume_simulation(
    snapshot_path: PathBuf,
    config_path: PathBuf,
    duration: f64,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading snapshot: {:?}", snapshot_path);

    let config = load_config(&config_path)?;
    let snapshot = SimulationSnapshot::load(&snapshot_path)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut sim = Simulation::from_snapshot(config, &snapshot, seed);

    println!("Resumed at t={:.1}s", sim.time());
    println!("Population: {}", sim.population());
    println!("Running {} additional seconds", duration);
    println!();

    let start = Instant::now();
    drive(&mut sim, duration, symbiosis::FRAME_DT, false);
    let elapsed = start.elapsed();

    println!();
    println!("=== Resume Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Simulated: t={:.1}s", sim.time());
    println!("Population: {}", sim.population());

    if let Some(path) = output {
        sim.snapshot().save(&path)?;
        println!("Snapshot: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(duration: f64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SYMBIOSIS Benchmark ===");
    println!("Duration: {}s", duration);
    println!("Population: {}", population);
    println!();

    let result = benchmark(duration, population);
    println!("{}", result);

    Ok(())
}

fn run_sweep(seeds: Vec<u64>, duration: f64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Seed Sweep ===");
    println!("Seeds: {:?}", seeds);
    println!("Duration: {}s, population: {}", duration, population);
    println!();

    let start = Instant::now();
    let results = sweep(&seeds, duration, population);

    print!("{:>8} {:>6}", "seed", "pop");
    for kind in BehaviorKind::ALL {
        print!(" {:>11}", kind.name());
    }
    println!();

    for r in &results {
        print!("{:>8} {:>6}", r.seed, r.final_population);
        for kind in BehaviorKind::ALL {
            print!(" {:>11}", r.behavior_counts.get(kind));
        }
        println!();
    }

    let survived = results.iter().filter(|r| r.final_population > 0).count();
    println!();
    println!("Survived: {}/{}", survived, results.len());
    println!("Wall time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_snapshot(snapshot_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Snapshot Analysis ===");
    println!("File: {:?}", snapshot_path);
    println!();

    let snapshot = SimulationSnapshot::load(&snapshot_path)?;
    let env = &snapshot.parameters.environment;

    println!("Time: {:.1}s", snapshot.time);
    println!("Arena: {}x{}", snapshot.world_size, snapshot.world_size);
    println!("Population: {}", snapshot.population());
    println!("Food: {}", snapshot.food.len());
    println!("Obstacles: {}", snapshot.obstacles.len());
    println!(
        "Carrying capacity: {}",
        carrying_capacity(snapshot.world_size, env.resource_abundance, env.environmental_harshness)
    );

    let alive = &snapshot.organisms;
    if !alive.is_empty() {
        let n = alive.len() as f32;
        let avg_energy = alive.iter().map(|o| o.energy).sum::<f32>() / n;
        let avg_age = alive.iter().map(|o| o.age).sum::<f32>() / n;
        let avg_speed = alive.iter().map(|o| o.speed).sum::<f32>() / n;

        println!();
        println!("Average energy: {:.1}", avg_energy);
        println!("Average age: {:.1}s", avg_age);
        println!("Average speed: {:.2}", avg_speed);

        let mut counts = BehaviorTable::<usize>::default();
        for o in alive {
            *counts.get_mut(o.kind) += 1;
        }

        println!();
        println!("Behaviors:");
        for (kind, count) in counts.iter() {
            println!("  {:<12} {:>4} ({:.1}%)", kind.name(), count, 100.0 * *count as f32 / n);
        }
    }

    println!();
    println!("Snapshot size: {:.2} KB", snapshot.size_bytes() as f64 / 1_000.0);

    Ok(())
}

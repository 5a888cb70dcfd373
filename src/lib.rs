//! # SYMBIOSIS
//!
//! Artificial-life ecosystem: organisms with pluggable behavior strategies
//! compete and cooperate for energy in a square arena.
//!
//! ## Features
//!
//! - **Seven behaviors**: five reactive strategies, a tabular Q-learner and a
//!   small neural Q-network with experience replay
//! - **Lifecycle**: energy, aging, food seeking, collision avoidance, mutation
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: one seeded RNG drives every stochastic decision
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symbiosis::{Config, Simulation};
//!
//! let mut sim = Simulation::new_with_seed(Config::default(), 42);
//!
//! // One minute of simulated time at 60 frames per second
//! sim.run(3600, symbiosis::FRAME_DT);
//!
//! println!("Population: {}", sim.population());
//! println!("{}", sim.stats.summary());
//! ```
//!
//! ## Snapshots
//!
//! ```rust,no_run
//! use symbiosis::{Config, Simulation, SimulationSnapshot};
//!
//! let mut sim = Simulation::new(Config::default());
//! sim.run(600, symbiosis::FRAME_DT);
//!
//! sim.snapshot().save("world.snap").unwrap();
//!
//! let loaded = SimulationSnapshot::load("world.snap").unwrap();
//! let restored = Simulation::from_snapshot(Config::default(), &loaded, 7);
//! ```

pub mod behavior;
pub mod config;
pub mod equilibrium;
pub mod food;
pub mod geometry;
pub mod neural;
pub mod organism;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod world;

// Re-export main types
pub use behavior::{Behavior, BehaviorKind, BehaviorTable};
pub use config::{Config, Parameters};
pub use organism::Organism;
pub use simulation::{Simulation, TickReport};
pub use snapshot::SimulationSnapshot;
pub use world::World;

use rayon::prelude::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frame delta used by headless runs
pub const FRAME_DT: f32 = 1.0 / 60.0;

/// Run a quick benchmark with a random seed
pub fn benchmark(duration_secs: f64, population: usize) -> BenchmarkResult {
    let seed = rand::random();
    benchmark_with_seed(duration_secs, population, seed)
}

/// Run one seeded benchmark
pub fn benchmark_with_seed(duration_secs: f64, population: usize, seed: u64) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.world.initial_population = population;

    let mut sim = Simulation::new_with_seed(config, seed);
    let initial_population = sim.population();
    let frames = (duration_secs / FRAME_DT as f64).ceil() as u64;

    let start = Instant::now();
    sim.run(frames, FRAME_DT);
    let elapsed = start.elapsed().as_secs_f64();

    BenchmarkResult {
        seed,
        ticks: sim.ticks(),
        simulated_secs: sim.time(),
        initial_population,
        final_population: sim.population(),
        elapsed_secs: elapsed,
        ticks_per_second: sim.ticks() as f64 / elapsed.max(f64::EPSILON),
        behavior_counts: sim.world.behavior_counts(),
    }
}

/// Run one single-threaded simulation per seed, in parallel
pub fn sweep(seeds: &[u64], duration_secs: f64, population: usize) -> Vec<BenchmarkResult> {
    seeds
        .par_iter()
        .map(|&seed| benchmark_with_seed(duration_secs, population, seed))
        .collect()
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub seed: u64,
    pub ticks: u64,
    pub simulated_secs: f64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
    pub behavior_counts: BehaviorTable<usize>,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Ticks: {} ({:.1}s simulated)", self.ticks, self.simulated_secs)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        for (kind, count) in self.behavior_counts.iter() {
            writeln!(f, "  {:<12} {}", kind.name(), count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let mut sim = Simulation::new_with_seed(Config::default(), 1);

        sim.run(100, FRAME_DT);

        assert_eq!(sim.ticks(), 100);
        assert!((sim.time() - 100.0 * FRAME_DT as f64).abs() < 1e-3);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(2.0, 20);

        assert_eq!(result.ticks, 120);
        assert!(result.ticks_per_second > 0.0);
        assert_eq!(
            result.behavior_counts.iter().map(|(_, n)| *n).sum::<usize>(),
            result.final_population
        );
    }

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let seeds = [3, 4, 5];
        let results = sweep(&seeds, 1.0, 10);

        assert_eq!(results.len(), 3);
        for (result, &seed) in results.iter().zip(&seeds) {
            assert_eq!(result.seed, seed);
            let again = benchmark_with_seed(1.0, 10, seed);
            assert_eq!(again.final_population, result.final_population);
            assert_eq!(again.behavior_counts, result.behavior_counts);
        }
    }
}

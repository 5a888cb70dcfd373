//! Equilibrium controller.
//!
//! Watches the population and periodically nudges the environment so the
//! ratio of consecutive population samples stays close to a target. It only
//! reads the population and goes through the regular parameter setters, so
//! it can drive anything implementing [`Tunable`].

use crate::config::{EquilibriumConfig, Parameters};
use crate::stats::population_ratio;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::fmt;

/// Below this head count the controller only boosts resources
const MIN_POPULATION: usize = 5;
/// Resource boost applied to a collapsing population
const RESCUE_STEP: f32 = 0.5;
const RESCUE_CAP: f32 = 5.0;

const SPAWN_RATE_RANGE: (f32, f32) = (0.5, 8.0);
const REPRODUCTION_RANGE: (f32, f32) = (0.001, 0.02);
const HARSHNESS_RANGE: (f32, f32) = (0.1, 1.5);
const ABUNDANCE_RANGE: (f32, f32) = (0.5, 5.0);

/// Allowed deviation from carrying capacity before the spawn rate is nudged
const CAPACITY_TOLERANCE: f32 = 0.3;

/// What the controller needs from a running simulation
pub trait Tunable {
    fn population(&self) -> usize;
    fn world_size(&self) -> f32;
    fn parameters(&self) -> &Parameters;
    fn set_food_spawn_rate(&mut self, rate: f32);
    fn set_base_reproduction_rate(&mut self, rate: f32);
    fn set_environmental_harshness(&mut self, harshness: f32);
    fn set_resource_abundance(&mut self, abundance: f32);
}

/// Coarse reading of the reproduction ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Growth,
    Decline,
    Stable,
}

impl Stability {
    pub fn of(ratio: f32) -> Self {
        if ratio > 1.05 {
            Stability::Growth
        } else if ratio < 0.95 {
            Stability::Decline
        } else {
            Stability::Stable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stability::Growth => "Unstable Growth",
            Stability::Decline => "Population Decline",
            Stability::Stable => "Stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One change made by the controller, carrying the new value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Abundance and spawn rate raised together for a tiny population
    Rescue { abundance: f32, spawn_rate: f32 },
    FoodSpawnRate(f32),
    ReproductionRate(f32),
    Harshness(f32),
    Abundance(f32),
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Rescue { abundance, spawn_rate } => {
                write!(f, "rescue: abundance {:.2}, food spawn rate {:.2}", abundance, spawn_rate)
            }
            Adjustment::FoodSpawnRate(v) => write!(f, "food spawn rate -> {:.2}", v),
            Adjustment::ReproductionRate(v) => write!(f, "reproduction rate -> {:.4}", v),
            Adjustment::Harshness(v) => write!(f, "environmental harshness -> {:.2}", v),
            Adjustment::Abundance(v) => write!(f, "resource abundance -> {:.2}", v),
        }
    }
}

/// Population the arena can comfortably hold under the current environment
pub fn carrying_capacity(world_size: f32, abundance: f32, harshness: f32) -> usize {
    let capacity = world_size * world_size / 30.0 * abundance * (1.2 - harshness);
    capacity.floor().max(MIN_POPULATION as f32) as usize
}

#[derive(Debug, Clone)]
pub struct EquilibriumController {
    config: EquilibriumConfig,
    history: VecDeque<usize>,
    last_adjustment: f64,
    /// Picks which parameter to move; seeded by the owner for reproducibility
    rng: ChaCha8Rng,
}

impl EquilibriumController {
    pub fn new(config: EquilibriumConfig, seed: u64) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_length + 1),
            config,
            last_adjustment: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Record a population sample
    pub fn observe(&mut self, population: usize) {
        self.history.push_back(population);
        while self.history.len() > self.config.history_length {
            self.history.pop_front();
        }
    }

    /// Mean ratio of consecutive samples in the controller's window
    pub fn reproduction_ratio(&self) -> f32 {
        let samples: Vec<usize> = self.history.iter().copied().collect();
        population_ratio(&samples)
    }

    pub fn stability(&self) -> Stability {
        Stability::of(self.reproduction_ratio())
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_adjustment = 0.0;
    }

    /// Run one control step if the interval has elapsed
    pub fn tick<T: Tunable + ?Sized>(&mut self, now: f64, target: &mut T) -> Option<Adjustment> {
        if now - self.last_adjustment < self.config.interval {
            return None;
        }
        self.last_adjustment = now;
        self.adjust(target)
    }

    /// Pick and apply at most one adjustment
    pub fn adjust<T: Tunable + ?Sized>(&mut self, target: &mut T) -> Option<Adjustment> {
        let ratio = self.reproduction_ratio();
        let population = target.population();
        let env = target.parameters().environment.clone();
        let base_rate = target.parameters().organisms.base_reproduction_rate;

        log::debug!("Equilibrium check: R={:.3}, population={}", ratio, population);

        let adjustment = if population < MIN_POPULATION {
            let abundance = (env.resource_abundance + RESCUE_STEP).min(RESCUE_CAP);
            let spawn_rate = (env.food_spawn_rate + RESCUE_STEP).min(RESCUE_CAP);
            target.set_resource_abundance(abundance);
            target.set_food_spawn_rate(spawn_rate);
            Adjustment::Rescue { abundance, spawn_rate }
        } else if ratio > self.config.target_ratio + self.config.dead_band {
            match self.rng.gen_range(0..4) {
                0 => {
                    let v = (env.food_spawn_rate * 0.9).max(SPAWN_RATE_RANGE.0);
                    target.set_food_spawn_rate(v);
                    Adjustment::FoodSpawnRate(v)
                }
                1 => {
                    let v = (base_rate * 0.9).max(REPRODUCTION_RANGE.0);
                    target.set_base_reproduction_rate(v);
                    Adjustment::ReproductionRate(v)
                }
                2 => {
                    let v = (env.environmental_harshness * 1.1).min(HARSHNESS_RANGE.1);
                    target.set_environmental_harshness(v);
                    Adjustment::Harshness(v)
                }
                _ => {
                    let v = (env.resource_abundance * 0.9).max(ABUNDANCE_RANGE.0);
                    target.set_resource_abundance(v);
                    Adjustment::Abundance(v)
                }
            }
        } else if ratio < self.config.target_ratio - self.config.dead_band {
            match self.rng.gen_range(0..4) {
                0 => {
                    let v = (env.food_spawn_rate * 1.1).min(SPAWN_RATE_RANGE.1);
                    target.set_food_spawn_rate(v);
                    Adjustment::FoodSpawnRate(v)
                }
                1 => {
                    let v = (base_rate * 1.1).min(REPRODUCTION_RANGE.1);
                    target.set_base_reproduction_rate(v);
                    Adjustment::ReproductionRate(v)
                }
                2 => {
                    let v = (env.environmental_harshness * 0.9).max(HARSHNESS_RANGE.0);
                    target.set_environmental_harshness(v);
                    Adjustment::Harshness(v)
                }
                _ => {
                    let v = (env.resource_abundance * 1.1).min(ABUNDANCE_RANGE.1);
                    target.set_resource_abundance(v);
                    Adjustment::Abundance(v)
                }
            }
        } else {
            let capacity = carrying_capacity(target.world_size(), env.resource_abundance, env.environmental_harshness)
                as f32;
            let population = population as f32;

            if population > capacity * (1.0 + CAPACITY_TOLERANCE) {
                let v = (env.food_spawn_rate * 0.95).max(SPAWN_RATE_RANGE.0);
                target.set_food_spawn_rate(v);
                Adjustment::FoodSpawnRate(v)
            } else if population < capacity * (1.0 - CAPACITY_TOLERANCE) {
                let v = (env.food_spawn_rate * 1.05).min(SPAWN_RATE_RANGE.1);
                target.set_food_spawn_rate(v);
                Adjustment::FoodSpawnRate(v)
            } else {
                log::debug!("Population stable near carrying capacity {}", capacity);
                return None;
            }
        };

        log::info!("Equilibrium (R={:.2}, {}): {}", ratio, Stability::of(ratio), adjustment);
        Some(adjustment)
    }
}

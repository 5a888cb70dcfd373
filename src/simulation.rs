//! Tick orchestration: food spawning, organism updates, deferred removal,
//! statistics, the population safety net and the optional equilibrium
//! controller. Also the setter surface used by front ends.

use crate::behavior::BehaviorKind;
use crate::config::{Config, Parameters};
use crate::equilibrium::{Adjustment, EquilibriumController, Tunable};
use crate::food::{FoodId, FoodKind};
use crate::geometry::Vec2;
use crate::organism::{DeathCause, OrganismId, TickContext, Traits};
use crate::snapshot::{FoodRecord, OrganismRecord, SimulationSnapshot};
use crate::stats::StatisticsTracker;
use crate::world::{Obstacle, ObstacleKind, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Energy drained per second at harshness 1.0
const BASE_CONSUMPTION: f32 = 1.0;

/// Seconds between food batches at spawn rate × abundance = 1
const FOOD_SPAWN_PERIOD: f32 = 4.0;
/// Below this population food arrives faster and in larger batches
const SCARCITY_POPULATION: usize = 10;
const SCARCITY_INTERVAL_FACTOR: f32 = 0.3;

/// Abundance at or above which batches and bursts scale with abundance
const ABUNDANT: f32 = 1.5;

/// Organisms injected when the population dies out
const EXTINCTION_REFILL: usize = 5;
/// Below this population a single organism may be injected
const SPARSE_POPULATION: usize = 3;
const SPARSE_REFILL_CHANCE: f32 = 0.1;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Simulated seconds covered by the tick
    pub dt: f32,
    /// Offspring registered this tick
    pub births: Vec<OrganismId>,
    /// Organisms that died this tick
    pub deaths: Vec<(OrganismId, DeathCause)>,
    /// Organisms injected by the safety net
    pub injected: Vec<OrganismId>,
    /// Dead organisms whose grace period ended
    pub removed_organisms: Vec<OrganismId>,
    /// Eaten food whose grace period ended
    pub removed_food: Vec<FoodId>,
    /// Change made by the equilibrium controller
    pub adjustment: Option<Adjustment>,
}

/// The whole ecosystem and its controls
pub struct Simulation {
    pub world: World,
    pub stats: StatisticsTracker,
    config: Config,
    params: Parameters,

    rng: ChaCha8Rng,
    seed: u64,

    time: f64,
    ticks: u64,
    speed: f32,
    paused: bool,
    initial_population: usize,
    pending_world_size: Option<f32>,
    food_spawn_timer: f32,

    equilibrium: Option<EquilibriumController>,
}

impl Simulation {
    /// Create a new simulation with the given configuration
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new simulation with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut sim = Self::empty(config, seed);
        sim.initialize();
        sim
    }

    /// Rebuild a simulation from a snapshot
    pub fn from_snapshot(config: Config, snapshot: &SimulationSnapshot, seed: u64) -> Self {
        let mut sim = Self::empty(config, seed);
        sim.restore(snapshot);
        sim
    }

    fn empty(config: Config, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let equilibrium = config
            .equilibrium
            .enabled
            .then(|| EquilibriumController::new(config.equilibrium.clone(), rng.gen()));

        Self {
            world: World::new(config.world.size),
            stats: StatisticsTracker::new(&config.stats),
            params: config.parameters(),
            speed: config.simulation.speed,
            initial_population: config.world.initial_population,
            config,
            rng,
            seed,
            time: 0.0,
            ticks: 0,
            paused: false,
            pending_world_size: None,
            food_spawn_timer: 0.0,
            equilibrium,
        }
    }

    /// Populate a fresh world: obstacles, organisms, then food
    fn initialize(&mut self) {
        if self.config.world.generate_obstacles {
            self.world.generate_obstacles(&mut self.rng);
        }

        let wanted = self.initial_population;
        let mut placed = 0;
        let mut attempts = 0;
        while placed < wanted && attempts < wanted * 3 {
            attempts += 1;
            if self.spawn_random_organism().is_some() {
                placed += 1;
            }
        }
        if placed < wanted {
            log::warn!("Only able to place {} organisms safely out of {} requested", placed, wanted);
        }

        let food = (wanted as f32 * self.config.world.initial_food_ratio).floor() as usize;
        for _ in 0..food {
            self.spawn_food();
        }

        log::info!(
            "World initialised: size {}, {} organisms, {} food, {} obstacles",
            self.world.size,
            placed,
            food,
            self.world.obstacles.len()
        );
    }

    // Main loop

    /// Advance by one frame. The delta is capped, then scaled by speed;
    /// nothing happens while paused.
    pub fn step(&mut self, frame_dt: f32) -> TickReport {
        if self.paused {
            return TickReport::default();
        }
        let dt = frame_dt.clamp(0.0, self.config.simulation.max_delta) * self.speed;
        if dt <= 0.0 {
            return TickReport::default();
        }
        self.tick(dt)
    }

    fn tick(&mut self, dt: f32) -> TickReport {
        self.time += dt as f64;
        self.ticks += 1;
        let now = self.time;
        let mut report = TickReport {
            dt,
            ..Default::default()
        };

        self.advance_food_spawning(dt);
        self.update_organisms(dt, now, &mut report);

        for food in &mut self.world.food {
            food.update(dt);
        }

        let (removed_organisms, removed_food) = self.world.remove_expired(
            now,
            self.config.simulation.organism_removal_delay,
            self.config.simulation.food_removal_delay,
        );
        report.removed_organisms = removed_organisms;
        report.removed_food = removed_food;

        self.stats.record_births(report.births.len());
        self.stats.record_deaths(report.deaths.len());
        let sampled = self.stats.update(now, self.world.behavior_counts());

        self.apply_safety_net(now, &mut report);

        if let Some(mut controller) = self.equilibrium.take() {
            if sampled {
                controller.observe(self.world.population());
            }
            report.adjustment = controller.tick(now, self);
            self.equilibrium = Some(controller);
        }

        report
    }

    fn advance_food_spawning(&mut self, dt: f32) {
        self.food_spawn_timer += dt;

        let env = &self.params.environment;
        let population = self.world.population();
        let mut interval = FOOD_SPAWN_PERIOD / (env.food_spawn_rate * env.resource_abundance);
        if population < SCARCITY_POPULATION {
            interval *= SCARCITY_INTERVAL_FACTOR;
        }

        if self.food_spawn_timer >= interval {
            let batch = if env.resource_abundance >= ABUNDANT {
                env.resource_abundance.ceil() as usize
            } else if population < 5 {
                4
            } else if population < SCARCITY_POPULATION {
                3
            } else {
                1
            };
            for _ in 0..batch {
                self.spawn_food();
            }
            self.food_spawn_timer = 0.0;
        }
    }

    /// Update every organism present at tick start, one at a time
    fn update_organisms(&mut self, dt: f32, now: f64, report: &mut TickReport) {
        let ctx = TickContext {
            dt,
            now,
            consumption_rate: BASE_CONSUMPTION * self.params.environment.environmental_harshness,
            resource_multiplier: self.params.environment.resource_abundance,
            mutation_rate: self.params.organisms.mutation_rate,
        };

        let count = self.world.organisms.len();
        for index in 0..count {
            let Some((organism, mut hood)) = self.world.split_at(index) else {
                break;
            };
            if !organism.is_alive() {
                continue;
            }

            organism
                .behavior
                .apply_params(self.params.behaviors.get(organism.kind()));
            let child = organism.update(&ctx, &mut hood, &mut self.rng);

            if !organism.behavior.is_valid() {
                log::warn!("Organism {} learned non-finite values; resetting its policy", organism.id);
                organism.behavior.reset_learning(&mut self.rng);
            }
            if organism.is_alive() && !organism.is_finite() {
                log::warn!("Organism {} reached a non-finite state; isolating it", organism.id);
                organism.die(now, DeathCause::Fault);
            }
            if let Some(cause) = organism.death_cause() {
                report.deaths.push((organism.id, cause));
            }

            if let Some(child) = child {
                let id = self.world.add_offspring(child, &mut self.rng);
                report.births.push(id);
            }
        }
    }

    fn apply_safety_net(&mut self, now: f64, report: &mut TickReport) {
        let living = self.world.population();
        if living == 0 {
            log::info!("Population extinct at t={:.1}s, injecting {} organisms", now, EXTINCTION_REFILL);
            for _ in 0..EXTINCTION_REFILL {
                if let Some(id) = self.spawn_random_organism() {
                    report.injected.push(id);
                }
            }
        } else if living < SPARSE_POPULATION && self.rng.gen::<f32>() < SPARSE_REFILL_CHANCE {
            if let Some(id) = self.spawn_random_organism() {
                log::debug!("Injected organism {} into a sparse population", id);
                report.injected.push(id);
            }
        }
    }

    /// Run a fixed number of frames
    pub fn run(&mut self, frames: u64, frame_dt: f32) {
        for _ in 0..frames {
            self.step(frame_dt);
        }
    }

    /// Run with callback for progress updates
    pub fn run_with_callback<F>(&mut self, frames: u64, frame_dt: f32, mut callback: F)
    where
        F: FnMut(&Simulation, &TickReport),
    {
        for _ in 0..frames {
            let report = self.step(frame_dt);
            callback(self, &report);
        }
    }

    // Spawning

    /// Place a random organism at a safe point; None when none was found
    pub fn spawn_random_organism(&mut self) -> Option<OrganismId> {
        let position = self.world.find_safe_position(&mut self.rng)?;
        let kind = BehaviorKind::random(&mut self.rng);
        let traits = Traits::sample(&self.params.organisms, &mut self.rng);
        Some(self.world.add_organism(kind, traits, position, &mut self.rng))
    }

    /// Place a random food item
    pub fn spawn_food(&mut self) -> FoodId {
        let position = self.world.find_safe_food_position(&mut self.rng);
        let kind = FoodKind::random(&mut self.rng);
        let energy = self.params.environment.food_energy_value;
        self.world.add_food(kind, position, energy, &mut self.rng)
    }

    /// Insert an organism at a given point; `None` picks a random kind
    pub fn add_organism_at(&mut self, kind: Option<BehaviorKind>, position: Vec2) -> OrganismId {
        let kind = kind.unwrap_or_else(|| BehaviorKind::random(&mut self.rng));
        let traits = Traits::sample(&self.params.organisms, &mut self.rng);
        let position = position.clamped(self.world.size / 2.1);
        self.world.add_organism(kind, traits, position, &mut self.rng)
    }

    pub fn add_food_at(&mut self, kind: FoodKind, position: Vec2) -> FoodId {
        let energy = self.params.environment.food_energy_value;
        self.world.add_food(kind, position, energy, &mut self.rng)
    }

    pub fn add_obstacle_at(&mut self, kind: ObstacleKind, position: Vec2) {
        let obstacle = Obstacle::sampled(kind, position, &mut self.rng);
        self.world.add_obstacle(obstacle);
    }

    // Controls

    /// Rebuild the world from the current parameters and clear statistics
    pub fn reset(&mut self) {
        if let Some(size) = self.pending_world_size.take() {
            self.world.size = size;
        }
        self.world.clear();
        self.stats.reset();
        if let Some(controller) = &mut self.equilibrium {
            controller.reset();
        }
        self.time = 0.0;
        self.ticks = 0;
        self.food_spawn_timer = 0.0;
        self.initialize();
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    /// Flip the pause state; returns whether the simulation is now paused
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn initial_population(&self) -> usize {
        self.initial_population
    }

    /// Takes effect on the next reset
    pub fn set_initial_population(&mut self, size: usize) {
        self.initial_population = size;
    }

    /// Current arena size
    pub fn world_size(&self) -> f32 {
        self.world.size
    }

    /// Takes effect on the next reset
    pub fn set_world_size(&mut self, size: f32) {
        if size > 0.0 {
            self.pending_world_size = Some(size);
        }
    }

    /// Set abundance; values above 1.5 drop a burst of food right away
    pub fn set_resource_abundance(&mut self, abundance: f32) {
        self.params.environment.resource_abundance = abundance.max(f32::EPSILON);
        if abundance > ABUNDANT {
            let burst = (abundance * 2.0).ceil() as usize;
            for _ in 0..burst {
                self.spawn_food();
            }
        }
    }

    pub fn set_environmental_harshness(&mut self, harshness: f32) {
        self.params.environment.environmental_harshness = harshness.max(0.0);
    }

    pub fn set_food_spawn_rate(&mut self, rate: f32) {
        self.params.environment.food_spawn_rate = rate.max(f32::EPSILON);
    }

    pub fn set_food_energy_value(&mut self, value: f32) {
        self.params.environment.food_energy_value = value.max(0.0);
    }

    pub fn set_base_energy(&mut self, value: f32) {
        self.params.organisms.base_energy = value;
    }

    pub fn set_base_speed(&mut self, value: f32) {
        self.params.organisms.base_speed = value;
    }

    pub fn set_base_size(&mut self, value: f32) {
        self.params.organisms.base_size = value;
    }

    pub fn set_base_lifespan(&mut self, value: f32) {
        self.params.organisms.base_lifespan = value;
    }

    pub fn set_base_reproduction_rate(&mut self, rate: f32) {
        self.params.organisms.base_reproduction_rate = rate.max(0.0);
    }

    pub fn set_mutation_rate(&mut self, rate: f32) {
        self.params.organisms.mutation_rate = rate.clamp(0.0, 1.0);
    }

    pub fn set_interaction_strength(&mut self, kind: BehaviorKind, strength: f32) {
        self.params.behaviors.get_mut(kind).interaction_strength = strength;
    }

    pub fn set_memory_duration(&mut self, kind: BehaviorKind, seconds: f64) {
        self.params.behaviors.get_mut(kind).memory_duration = seconds.max(0.0);
    }

    pub fn set_unlimited_memory(&mut self, kind: BehaviorKind, enabled: bool) {
        self.params.behaviors.get_mut(kind).unlimited_memory = enabled;
    }

    /// Start or stop the equilibrium controller
    pub fn set_equilibrium(&mut self, enabled: bool) {
        match (enabled, self.equilibrium.is_some()) {
            (true, false) => {
                let seed = self.rng.gen();
                self.equilibrium = Some(EquilibriumController::new(self.config.equilibrium.clone(), seed));
            }
            (false, true) => self.equilibrium = None,
            _ => {}
        }
    }

    // Queries

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn equilibrium(&self) -> Option<&EquilibriumController> {
        self.equilibrium.as_ref()
    }

    /// Simulation clock in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.world.population()
    }

    /// Check if population is extinct
    pub fn is_extinct(&self) -> bool {
        self.population() == 0
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    // Persistence

    /// Capture parameters and every living entity
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            version: SimulationSnapshot::VERSION,
            time: self.time,
            speed: self.speed,
            initial_population: self.initial_population,
            world_size: self.world.size,
            parameters: self.params.clone(),
            organisms: self.world.living().map(OrganismRecord::from).collect(),
            food: self
                .world
                .food
                .iter()
                .filter(|f| !f.is_consumed())
                .map(FoodRecord::from)
                .collect(),
            obstacles: self.world.obstacles.clone(),
        }
    }

    /// Replace the world with the snapshot's contents; statistics restart
    pub fn restore(&mut self, snapshot: &SimulationSnapshot) {
        self.world = World::new(snapshot.world_size);
        self.pending_world_size = None;
        self.params = snapshot.parameters.clone();
        self.speed = snapshot.speed;
        self.initial_population = snapshot.initial_population;
        self.time = snapshot.time;
        self.ticks = 0;
        self.food_spawn_timer = 0.0;
        self.stats.reset();
        if let Some(controller) = &mut self.equilibrium {
            controller.reset();
        }

        for record in &snapshot.organisms {
            let id = self
                .world
                .add_organism(record.kind, record.traits(), record.position, &mut self.rng);
            if let Some(organism) = self.world.organisms.last_mut() {
                debug_assert_eq!(organism.id, id);
                organism.age = record.age;
            }
        }
        for record in &snapshot.food {
            self.world
                .add_food(record.kind, record.position, record.energy_value, &mut self.rng);
        }
        for obstacle in &snapshot.obstacles {
            self.world.add_obstacle(*obstacle);
        }

        log::info!(
            "Restored snapshot: {} organisms, {} food, {} obstacles at t={:.1}s",
            snapshot.organisms.len(),
            snapshot.food.len(),
            snapshot.obstacles.len(),
            snapshot.time
        );
    }
}

impl Tunable for Simulation {
    fn population(&self) -> usize {
        Simulation::population(self)
    }

    fn world_size(&self) -> f32 {
        Simulation::world_size(self)
    }

    fn parameters(&self) -> &Parameters {
        Simulation::parameters(self)
    }

    fn set_food_spawn_rate(&mut self, rate: f32) {
        Simulation::set_food_spawn_rate(self, rate)
    }

    fn set_base_reproduction_rate(&mut self, rate: f32) {
        Simulation::set_base_reproduction_rate(self, rate)
    }

    fn set_environmental_harshness(&mut self, harshness: f32) {
        Simulation::set_environmental_harshness(self, harshness)
    }

    fn set_resource_abundance(&mut self, abundance: f32) {
        Simulation::set_resource_abundance(self, abundance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.world.initial_population = 12;
        config
    }

    fn bare_config() -> Config {
        let mut config = Config::default();
        config.world.initial_population = 0;
        config.world.generate_obstacles = false;
        config
    }

    #[test]
    fn test_initial_population_and_food() {
        let sim = Simulation::new_with_seed(test_config(), 42);
        assert_eq!(sim.population(), 12);
        assert_eq!(sim.world.food.len(), 6);
        assert_eq!(sim.world.obstacles.len(), 10 + 13);
        assert_eq!(sim.seed(), 42);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut a = Simulation::new_with_seed(test_config(), 7);
        let mut b = Simulation::new_with_seed(test_config(), 7);
        a.run(200, 0.05);
        b.run(200, 0.05);

        assert_eq!(a.population(), b.population());
        assert_eq!(a.stats.stats(), b.stats.stats());
        let pa: Vec<_> = a.world.organisms.iter().map(|o| o.position).collect();
        let pb: Vec<_> = b.world.organisms.iter().map(|o| o.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_frame_delta_capped_and_scaled() {
        let mut sim = Simulation::new_with_seed(test_config(), 1);
        let report = sim.step(5.0);
        assert!((report.dt - 0.1).abs() < 1e-6);

        sim.set_speed(2.0);
        let report = sim.step(0.05);
        assert!((report.dt - 0.1).abs() < 1e-6);
        assert!((sim.time() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut sim = Simulation::new_with_seed(test_config(), 2);
        assert!(sim.toggle_pause());
        sim.run(10, 0.05);
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.ticks(), 0);
        assert!(!sim.toggle_pause());
        sim.step(0.05);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn test_age_is_monotone_and_death_is_final() {
        let mut sim = Simulation::new_with_seed(test_config(), 3);
        let mut ages: std::collections::HashMap<OrganismId, f32> = Default::default();
        let mut dead: std::collections::HashSet<OrganismId> = Default::default();

        for _ in 0..300 {
            sim.step(0.1);
            for o in &sim.world.organisms {
                if let Some(prev) = ages.insert(o.id, o.age) {
                    assert!(o.age >= prev);
                }
                if dead.contains(&o.id) {
                    assert!(!o.is_alive());
                }
                if !o.is_alive() {
                    dead.insert(o.id);
                }
            }
        }
    }

    #[test]
    fn test_starving_organism_dies_in_one_tick() {
        let mut config = bare_config();
        config.environment.environmental_harshness = 300.0;
        let mut sim = Simulation::new_with_seed(config, 4);
        let id = sim.add_organism_at(Some(BehaviorKind::Selfish), Vec2::ZERO);
        {
            let o = &mut sim.world.organisms[0];
            o.energy = 10.0;
            o.age = 99.0;
            o.max_lifespan = 100.0;
        }

        // 0.1 s × 300 × 0.4 = 12 energy
        let report = sim.step(0.1);
        assert_eq!(report.deaths, vec![(id, DeathCause::Starvation)]);
        assert!(!sim.world.organism(id).unwrap().is_alive());
    }

    #[test]
    fn test_extinction_refill() {
        let mut sim = Simulation::new_with_seed(bare_config(), 5);
        assert!(sim.is_extinct());

        let report = sim.step(0.05);
        assert_eq!(report.injected.len(), 5);
        assert_eq!(sim.population(), 5);
    }

    #[test]
    fn test_dead_removed_after_grace() {
        let mut sim = Simulation::new_with_seed(bare_config(), 6);
        let id = sim.add_organism_at(Some(BehaviorKind::Aggressive), Vec2::ZERO);
        sim.add_organism_at(Some(BehaviorKind::Aggressive), Vec2::new(10.0, 10.0));
        sim.add_organism_at(Some(BehaviorKind::Aggressive), Vec2::new(-10.0, 10.0));
        sim.world.organisms[0].energy = 0.01;

        let report = sim.step(0.1);
        assert_eq!(report.deaths.len(), 1);
        assert!(sim.world.organism(id).is_some());

        let mut removed = Vec::new();
        for _ in 0..20 {
            removed.extend(sim.step(0.1).removed_organisms);
        }
        assert_eq!(removed, vec![id]);
        assert!(sim.world.organism(id).is_none());
        assert_eq!(sim.stats.stats().deaths, 1);
    }

    #[test]
    fn test_food_spawns_over_time() {
        let mut sim = Simulation::new_with_seed(bare_config(), 8);
        for _ in 0..3 {
            sim.add_organism_at(Some(BehaviorKind::Cooperative), Vec2::new(0.0, 0.0));
        }
        let before = sim.world.food.len();
        // population < 5: interval 4 / 1.5 × 0.3 = 0.8 s, batches of 4
        sim.run(9, 0.1);
        assert!(sim.world.food.len() >= before + 4);
    }

    #[test]
    fn test_abundance_burst() {
        let mut sim = Simulation::new_with_seed(bare_config(), 9);
        let before = sim.world.food.len();
        sim.set_resource_abundance(1.2);
        assert_eq!(sim.world.food.len(), before);
        sim.set_resource_abundance(2.2);
        assert_eq!(sim.world.food.len(), before + 5);
        assert_eq!(sim.parameters().environment.resource_abundance, 2.2);
    }

    #[test]
    fn test_world_size_applies_on_reset() {
        let mut sim = Simulation::new_with_seed(test_config(), 10);
        sim.set_world_size(60.0);
        assert_eq!(sim.world_size(), 40.0);

        sim.run(20, 0.1);
        sim.set_initial_population(8);
        sim.reset();
        assert_eq!(sim.world_size(), 60.0);
        assert_eq!(sim.population(), 8);
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.stats.history_len(), 0);
    }

    #[test]
    fn test_behavior_params_propagate() {
        let mut sim = Simulation::new_with_seed(bare_config(), 11);
        sim.add_organism_at(Some(BehaviorKind::TitForTat), Vec2::ZERO);
        sim.add_organism_at(Some(BehaviorKind::Selfish), Vec2::new(10.0, 0.0));
        sim.add_organism_at(Some(BehaviorKind::Selfish), Vec2::new(-10.0, 0.0));
        sim.set_interaction_strength(BehaviorKind::TitForTat, 1.8);
        sim.set_memory_duration(BehaviorKind::TitForTat, 12.0);
        sim.set_unlimited_memory(BehaviorKind::Selfish, true);

        sim.step(0.05);
        let tft = &sim.world.organisms[0].behavior;
        assert_eq!(tft.interaction_strength, 1.8);
        assert_eq!(tft.memory().duration(), 12.0);
        assert!(!tft.memory().is_unlimited());
        assert!(sim.world.organisms[1].behavior.memory().is_unlimited());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut sim = Simulation::new_with_seed(test_config(), 12);
        sim.run(50, 0.1);
        sim.set_food_spawn_rate(3.0);
        let snapshot = sim.snapshot();

        let restored = Simulation::from_snapshot(Config::default(), &snapshot, 99);
        assert_eq!(restored.population(), sim.population());
        assert_eq!(restored.world.obstacles, sim.world.obstacles);
        assert_eq!(restored.parameters(), sim.parameters());
        assert_eq!(restored.snapshot().organisms, snapshot.organisms);
        assert_eq!(restored.snapshot().food, snapshot.food);
    }

    #[test]
    fn test_restore_restarts_tick_count() {
        let mut sim = Simulation::new_with_seed(test_config(), 14);
        sim.run(30, 0.1);
        let snapshot = sim.snapshot();

        sim.run(20, 0.1);
        assert_eq!(sim.ticks(), 50);

        sim.restore(&snapshot);
        assert_eq!(sim.ticks(), 0);
        assert!((sim.time() - snapshot.time).abs() < 1e-9);

        sim.step(0.1);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn test_equilibrium_controller_runs() {
        let mut config = test_config();
        config.equilibrium.enabled = true;
        let mut sim = Simulation::new_with_seed(config, 13);
        assert!(sim.equilibrium().is_some());

        sim.run(100, 0.1);
        assert!(sim.equilibrium().unwrap().samples() > 0);

        sim.set_equilibrium(false);
        assert!(sim.equilibrium().is_none());
    }
}

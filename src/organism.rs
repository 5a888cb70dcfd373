//! Organism state machine: energy, movement, interaction and reproduction.

use crate::behavior::{Behavior, BehaviorKind, Color, InteractionTag, Profile};
use crate::config::OrganismConfig;
use crate::food::FoodId;
use crate::geometry::{circles_overlap, Vec2};
use crate::world::Neighborhood;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Unique organism identifier
pub type OrganismId = u64;

/// Energy can never exceed this
pub const MAX_ENERGY: f32 = 150.0;

/// Below this, organisms look for food instead of company
const HUNGER_THRESHOLD: f32 = 70.0;
const REPRODUCTION_THRESHOLD: f32 = 50.0;
const REPRODUCTION_COST: f32 = 20.0;
const OFFSPRING_ENERGY: f32 = 70.0;

const INTERACTION_RANGE: f32 = 1.5;
const INTERACTION_COOLDOWN: f32 = 1.2;
const SOCIAL_RADIUS: f32 = 5.0;

const PURSUIT_COST: f32 = 0.9;
const IDLE_COST: f32 = 0.4;

const REHEADING_CHANCE: f32 = 0.02;
const AVOIDANCE_DURATION: f32 = 2.0;
const COLLISION_DEBOUNCE: f32 = 0.5;
const AVOIDANCE_STEP: f32 = 0.2;

const SPAWN_SPIRAL_ATTEMPTS: usize = 20;
const SPAWN_SPIRAL_STEP: f32 = 0.6;
const SPAWN_RANDOM_ATTEMPTS: usize = 5;

/// Cause of death tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    /// State became non-finite and the organism was isolated
    Fault,
}

/// Alive → Dying → Removed, never backwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    Alive,
    /// Dead but still registered until the removal grace period ends
    Dying { since: f64, cause: DeathCause },
    Removed,
}

/// What an organism is currently heading for, by identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Organism(OrganismId),
    Food(FoodId),
}

/// Heritable traits plus starting energy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub energy: f32,
    pub speed: f32,
    pub size: f32,
    pub lifespan: f32,
    pub reproduction_rate: f32,
}

impl Traits {
    /// Fresh traits: every base value scaled by U(0.8, 1.2)
    pub fn sample<R: Rng + ?Sized>(base: &OrganismConfig, rng: &mut R) -> Self {
        let mut jitter = || rng.gen_range(0.8..1.2);
        Self {
            energy: base.base_energy * jitter(),
            speed: base.base_speed * jitter(),
            size: base.base_size * jitter(),
            lifespan: base.base_lifespan * jitter(),
            reproduction_rate: base.base_reproduction_rate * jitter(),
        }
    }

    /// Offspring traits: each scaled by U(1 − m, 1 + m) with m = 0.2 × mutation rate
    pub fn inherit<R: Rng + ?Sized>(&self, mutation_rate: f32, rng: &mut R) -> Self {
        let m = 0.2 * mutation_rate;
        let mut jitter = || 1.0 - m + rng.gen::<f32>() * m * 2.0;
        Self {
            energy: OFFSPRING_ENERGY,
            speed: self.speed * jitter(),
            size: self.size * jitter(),
            lifespan: self.lifespan * jitter(),
            reproduction_rate: self.reproduction_rate * jitter(),
        }
    }
}

/// A child waiting to be registered with the world
#[derive(Debug, Clone)]
pub struct Offspring {
    pub kind: BehaviorKind,
    pub traits: Traits,
    pub position: Vec2,
}

/// Per-tick inputs shared by every organism
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    /// Scaled, capped frame delta in seconds
    pub dt: f32,
    /// Simulation clock
    pub now: f64,
    /// Energy drained per second before the movement factor
    pub consumption_rate: f32,
    /// Resource abundance
    pub resource_multiplier: f32,
    pub mutation_rate: f32,
}

/// A simulated agent
#[derive(Debug, Clone)]
pub struct Organism {
    pub id: OrganismId,
    pub energy: f32,
    pub speed: f32,
    pub size: f32,
    pub max_lifespan: f32,
    pub reproduction_rate: f32,
    pub age: f32,
    pub position: Vec2,
    pub direction: Vec2,
    pub behavior: Behavior,
    pub target: Option<Target>,
    pub lifecycle: Lifecycle,

    // Timers, all on the organism's own age clock
    last_interaction_time: f32,
    collision_avoidance_time: f32,
    avoidance_direction: Option<Vec2>,
    last_collision_time: f32,

    /// Tag of the most recent interaction this organism took part in
    pub last_outcome: Option<InteractionTag>,
}

impl Organism {
    pub fn new<R: Rng + ?Sized>(
        id: OrganismId,
        kind: BehaviorKind,
        traits: Traits,
        position: Vec2,
        rng: &mut R,
    ) -> Self {
        let behavior = Behavior::new(kind, rng);
        Self::with_behavior(id, behavior, traits, position, rng)
    }

    pub fn with_behavior<R: Rng + ?Sized>(
        id: OrganismId,
        behavior: Behavior,
        traits: Traits,
        position: Vec2,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            energy: traits.energy.min(MAX_ENERGY),
            speed: traits.speed,
            size: traits.size,
            max_lifespan: traits.lifespan,
            reproduction_rate: traits.reproduction_rate,
            age: 0.0,
            position,
            direction: Vec2::random_direction(rng),
            behavior,
            target: None,
            lifecycle: Lifecycle::Alive,
            last_interaction_time: 0.0,
            collision_avoidance_time: 0.0,
            avoidance_direction: None,
            last_collision_time: 0.0,
            last_outcome: None,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Alive)
    }

    #[inline]
    pub fn kind(&self) -> BehaviorKind {
        self.behavior.kind()
    }

    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.size * 0.8
    }

    pub fn traits(&self) -> Traits {
        Traits {
            energy: self.energy,
            speed: self.speed,
            size: self.size,
            lifespan: self.max_lifespan,
            reproduction_rate: self.reproduction_rate,
        }
    }

    /// View handed to behaviors
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            kind: self.kind(),
            position: self.position,
            energy: self.energy,
            size: self.size,
        }
    }

    /// Transition to Dying; later calls are ignored
    pub fn die(&mut self, now: f64, cause: DeathCause) {
        if self.is_alive() {
            self.lifecycle = Lifecycle::Dying { since: now, cause };
            self.target = None;
        }
    }

    pub fn death_cause(&self) -> Option<DeathCause> {
        match self.lifecycle {
            Lifecycle::Dying { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Whether the numeric state is sound
    pub fn is_finite(&self) -> bool {
        self.energy.is_finite()
            && self.age.is_finite()
            && self.position.is_finite()
            && self.direction.is_finite()
            && self.behavior.is_valid()
    }

    // Visual signals

    /// Heading around the vertical axis
    pub fn heading(&self) -> f32 {
        self.direction.heading()
    }

    /// Energy as a fraction of the maximum
    pub fn health_fraction(&self) -> f32 {
        (self.energy / MAX_ENERGY).clamp(0.0, 1.0)
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.kind(), self.energy.floor() as i64)
    }

    pub fn color(&self) -> Color {
        self.behavior.color()
    }

    /// Advance one tick. Returns a child when reproduction succeeded.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        ctx: &TickContext,
        hood: &mut Neighborhood<'_>,
        rng: &mut R,
    ) -> Option<Offspring> {
        if !self.is_alive() {
            return None;
        }

        let previous = self.position;
        self.age += ctx.dt;

        let movement_factor = if self.target.is_some() { PURSUIT_COST } else { IDLE_COST };
        self.energy = (self.energy - ctx.dt * ctx.consumption_rate * movement_factor).max(0.0);

        if self.energy <= 0.0 {
            self.die(ctx.now, DeathCause::Starvation);
            return None;
        }
        if self.age >= self.max_lifespan {
            self.die(ctx.now, DeathCause::OldAge);
            return None;
        }

        self.decide(ctx, hood, rng);

        let offspring = if self.energy > REPRODUCTION_THRESHOLD
            && rng.gen::<f32>() < self.reproduction_rate * ctx.dt * ctx.resource_multiplier
        {
            self.reproduce(ctx.mutation_rate, hood, rng)
        } else {
            None
        };

        self.move_step(ctx.dt, previous, hood, rng);
        offspring
    }

    fn decide<R: Rng + ?Sized>(&mut self, ctx: &TickContext, hood: &mut Neighborhood<'_>, rng: &mut R) {
        if self.age - self.last_interaction_time <= INTERACTION_COOLDOWN {
            return;
        }

        if self.energy < HUNGER_THRESHOLD {
            let Some(index) = hood.nearest_food(self.position) else {
                return;
            };
            let (food_id, food_position) = (hood.food[index].id, hood.food[index].position);
            self.target = Some(Target::Food(food_id));

            if in_range(self.position, food_position, INTERACTION_RANGE) {
                let value = hood.food[index].consume(ctx.now);
                let gain = value * (1.0 + (ctx.resource_multiplier - 1.0) * 0.5);
                self.energy = (self.energy + gain).clamp(0.0, MAX_ENERGY);
                self.target = None;
                self.last_interaction_time = self.age;
            }
            return;
        }

        let nearby = hood.profiles_within(self.position, SOCIAL_RADIUS);
        if nearby.is_empty() {
            return;
        }

        let me = self.profile();
        let chosen = self.behavior.select_target(&me, &nearby, ctx.now, rng).copied();
        self.target = chosen.map(|p| Target::Organism(p.id));

        if let Some(target) = chosen {
            if in_range(self.position, target.position, INTERACTION_RANGE) {
                self.interact_with(&me, &target, ctx.now, hood, rng);
                self.last_interaction_time = self.age;
            }
        }
    }

    fn interact_with<R: Rng + ?Sized>(
        &mut self,
        me: &Profile,
        target: &Profile,
        now: f64,
        hood: &mut Neighborhood<'_>,
        rng: &mut R,
    ) {
        let Some(other) = hood.organism_mut(target.id) else {
            return;
        };
        if !other.is_alive() {
            return;
        }

        let outcome = self.behavior.interact(me, target, now, rng);
        let applied = outcome.scaled(self.behavior.interaction_strength);

        self.energy = (self.energy + applied.self_energy_delta).clamp(0.0, MAX_ENERGY);
        other.energy = (other.energy + applied.target_energy_delta).clamp(0.0, MAX_ENERGY);

        let tag = outcome.tag();
        self.last_outcome = Some(tag);
        other.last_outcome = Some(tag);
    }

    /// Produce a child if a safe spawn point exists; the parent pays only on success
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        mutation_rate: f32,
        hood: &Neighborhood<'_>,
        rng: &mut R,
    ) -> Option<Offspring> {
        if self.energy < REPRODUCTION_THRESHOLD {
            return None;
        }

        let traits = self.traits().inherit(mutation_rate, rng);
        let kind = if rng.gen::<f32>() < mutation_rate {
            BehaviorKind::random(rng)
        } else {
            self.kind()
        };

        let position = self.find_spawn_position(hood, rng)?;
        self.energy -= REPRODUCTION_COST;

        Some(Offspring { kind, traits, position })
    }

    /// Spiral outward from the parent, then try a few random points.
    /// The parent is not part of the neighborhood, so it is checked here.
    fn find_spawn_position<R: Rng + ?Sized>(&self, hood: &Neighborhood<'_>, rng: &mut R) -> Option<Vec2> {
        let radius = self.bounding_radius();
        let clear = |candidate: Vec2| {
            hood.is_clear(candidate, radius) && !circles_overlap(candidate, radius, self.position, radius)
        };
        let start_distance = (self.size * 2.0).max(1.5);
        let bound = hood.movement_bound();

        let mut angle = rng.gen_range(0.0..2.0 * PI);
        let mut distance = start_distance;

        for _ in 0..SPAWN_SPIRAL_ATTEMPTS {
            let candidate = self.position + Vec2::from_polar(angle, distance);
            let in_bounds = candidate.x.abs() <= bound && candidate.z.abs() <= bound;

            if in_bounds && clear(candidate) {
                return Some(candidate);
            }

            angle += PI / 4.0;
            distance += SPAWN_SPIRAL_STEP;

            if !in_bounds {
                angle = rng.gen_range(0.0..2.0 * PI);
                distance = start_distance;
            }
        }

        let spread = hood.spawn_bound();
        (0..SPAWN_RANDOM_ATTEMPTS)
            .map(|_| Vec2::random_in_square(rng, spread))
            .find(|&candidate| clear(candidate))
    }

    fn move_step<R: Rng + ?Sized>(&mut self, dt: f32, previous: Vec2, hood: &Neighborhood<'_>, rng: &mut R) {
        if self.collision_avoidance_time > 0.0 {
            self.collision_avoidance_time -= dt;
            if let Some(away) = self.avoidance_direction {
                self.direction = away.normalized();
            }
            if self.collision_avoidance_time <= 0.0 {
                self.avoidance_direction = None;
            }
        } else if let Some(goal) = self.target.and_then(|t| hood.target_position(t)) {
            self.direction = (goal - self.position).normalized();
        } else {
            if rng.gen::<f32>() < REHEADING_CHANCE {
                self.direction = Vec2::random_direction(rng);
            }
            self.target = None;
        }

        let step = self.speed * dt;
        let radius = self.bounding_radius();
        let proposed = self.position + self.direction * step;

        match hood.collision_at(proposed, radius) {
            None => self.position = proposed,
            Some(obstruction) => {
                self.handle_collision(obstruction, rng);
                self.position = previous;

                if let Some(away) = self.avoidance_direction {
                    let nudged = self.position + away * (step * AVOIDANCE_STEP);
                    if hood.collision_at(nudged, radius).is_none() {
                        self.position = nudged;
                    }
                }
            }
        }

        self.position = self.position.clamped(hood.movement_bound());
    }

    /// Point away from the obstruction, slightly perturbed, for a while
    fn handle_collision<R: Rng + ?Sized>(&mut self, obstruction: Vec2, rng: &mut R) {
        if self.age - self.last_collision_time < COLLISION_DEBOUNCE {
            return;
        }
        self.last_collision_time = self.age;
        self.collision_avoidance_time = AVOIDANCE_DURATION;

        let away = (self.position - obstruction).normalized();
        let jitter = (rng.gen::<f32>() - 0.5) * PI * 0.3;
        self.avoidance_direction = Some(away.rotated(jitter));
    }

    /// Seconds left in collision-avoidance mode
    pub fn avoidance_time(&self) -> f32 {
        self.collision_avoidance_time.max(0.0)
    }
}

#[inline]
fn in_range(a: Vec2, b: Vec2, range: f32) -> bool {
    a.distance_squared(b) <= range * range
}

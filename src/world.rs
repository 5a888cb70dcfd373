//! World spatial registry: organisms, food and obstacles, with proximity
//! queries and bounded rejection-sampling placement.
//!
//! All queries are linear scans over squared distances. Dead organisms and
//! eaten food stay registered (and are skipped by every query) until the
//! orchestrator removes them.

use crate::behavior::{BehaviorKind, BehaviorTable, Profile};
use crate::food::{Food, FoodId, FoodKind};
use crate::geometry::{circles_overlap, Vec2};
use crate::organism::{Lifecycle, Offspring, Organism, OrganismId, Target, Traits};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clearance required around a freshly placed organism
pub const ORGANISM_CLEARANCE: f32 = 2.0;
/// Clearance required around a freshly placed food item
pub const FOOD_CLEARANCE: f32 = 1.2;

const ORGANISM_PLACEMENT_ATTEMPTS: usize = 20;
const FOOD_PLACEMENT_ATTEMPTS: usize = 15;

const TREE_RADIUS: f32 = 0.5;

/// Static obstacle variety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Tree,
    Rock,
}

impl ObstacleKind {
    pub fn name(self) -> &'static str {
        match self {
            ObstacleKind::Tree => "tree",
            ObstacleKind::Rock => "rock",
        }
    }
}

impl fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown obstacle type: {0}")]
pub struct UnknownObstacleKind(pub String);

impl FromStr for ObstacleKind {
    type Err = UnknownObstacleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tree" => Ok(ObstacleKind::Tree),
            "rock" => Ok(ObstacleKind::Rock),
            _ => Err(UnknownObstacleKind(s.to_string())),
        }
    }
}

/// An immovable circle in the arena
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Vec2,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, position: Vec2, radius: f32) -> Self {
        Self { kind, position, radius }
    }

    /// Obstacle inserted by hand: trees U(1, 1.5) × 0.3, rocks U(0.2, 0.5)
    pub fn sampled<R: Rng + ?Sized>(kind: ObstacleKind, position: Vec2, rng: &mut R) -> Self {
        let radius = match kind {
            ObstacleKind::Tree => rng.gen_range(1.0..1.5) * 0.3,
            ObstacleKind::Rock => rng.gen_range(0.2..0.5),
        };
        Self::new(kind, position, radius)
    }

    /// Obstacle produced by terrain generation
    pub fn generated<R: Rng + ?Sized>(kind: ObstacleKind, position: Vec2, rng: &mut R) -> Self {
        let radius = match kind {
            ObstacleKind::Tree => TREE_RADIUS,
            ObstacleKind::Rock => rng.gen_range(0.2..0.5),
        };
        Self::new(kind, position, radius)
    }
}

// Exclusion tests. `radius` is the newcomer's radius; each test adds the
// other entity's own bounding radius.

/// Overlap with any living organism
pub fn overlaps_organisms<'o>(organisms: impl IntoIterator<Item = &'o Organism>, position: Vec2, radius: f32) -> bool {
    organisms
        .into_iter()
        .filter(|o| o.is_alive())
        .any(|o| circles_overlap(position, radius, o.position, o.bounding_radius()))
}

/// Overlap with any obstacle
pub fn overlaps_obstacles(obstacles: &[Obstacle], position: Vec2, radius: f32) -> bool {
    obstacles
        .iter()
        .any(|o| circles_overlap(position, radius, o.position, o.radius))
}

/// Overlap with any unconsumed food item
pub fn overlaps_food(food: &[Food], position: Vec2, radius: f32) -> bool {
    food.iter()
        .filter(|f| !f.is_consumed())
        .any(|f| circles_overlap(position, radius, f.position, f.bounding_radius()))
}

/// Everything one organism may see and touch during its update.
///
/// The updating organism itself is split out of the population, so
/// `before` and `after` hold every other organism.
pub struct Neighborhood<'a> {
    before: &'a mut [Organism],
    after: &'a mut [Organism],
    pub food: &'a mut [Food],
    pub obstacles: &'a [Obstacle],
    arena_size: f32,
}

impl<'a> Neighborhood<'a> {
    pub fn new(
        before: &'a mut [Organism],
        after: &'a mut [Organism],
        food: &'a mut [Food],
        obstacles: &'a [Obstacle],
        arena_size: f32,
    ) -> Self {
        Self {
            before,
            after,
            food,
            obstacles,
            arena_size,
        }
    }

    /// Every other organism, dead or alive
    pub fn others(&self) -> impl Iterator<Item = &Organism> {
        self.before.iter().chain(self.after.iter())
    }

    pub fn organism_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find(|o| o.id == id)
    }

    /// Living organisms within `radius` (inclusive)
    pub fn profiles_within(&self, center: Vec2, radius: f32) -> Vec<Profile> {
        let r2 = radius * radius;
        self.others()
            .filter(|o| o.is_alive() && o.position.distance_squared(center) <= r2)
            .map(Organism::profile)
            .collect()
    }

    /// Index of the closest unconsumed food item
    pub fn nearest_food(&self, from: Vec2) -> Option<usize> {
        nearest_food_index(self.food, from)
    }

    /// Position of a live target, or None once it died or was eaten
    pub fn target_position(&self, target: Target) -> Option<Vec2> {
        match target {
            Target::Organism(id) => self
                .others()
                .find(|o| o.id == id && o.is_alive())
                .map(|o| o.position),
            Target::Food(id) => self
                .food
                .iter()
                .find(|f| f.id == id && !f.is_consumed())
                .map(|f| f.position),
        }
    }

    /// Centre of the first living organism or obstacle a circle would hit
    pub fn collision_at(&self, position: Vec2, radius: f32) -> Option<Vec2> {
        self.others()
            .filter(|o| o.is_alive())
            .find(|o| circles_overlap(position, radius, o.position, o.bounding_radius()))
            .map(|o| o.position)
            .or_else(|| {
                self.obstacles
                    .iter()
                    .find(|o| circles_overlap(position, radius, o.position, o.radius))
                    .map(|o| o.position)
            })
    }

    /// All three exclusion tests pass
    pub fn is_clear(&self, position: Vec2, radius: f32) -> bool {
        !overlaps_organisms(self.others(), position, radius)
            && !overlaps_obstacles(self.obstacles, position, radius)
            && !overlaps_food(self.food, position, radius)
    }

    /// Organisms are kept within ±size/2.1
    pub fn movement_bound(&self) -> f32 {
        self.arena_size / 2.1
    }

    /// Random spawn points are drawn within ±size/2.5
    pub fn spawn_bound(&self) -> f32 {
        self.arena_size / 2.5
    }
}

fn nearest_food_index(food: &[Food], from: Vec2) -> Option<usize> {
    food.iter()
        .enumerate()
        .filter(|(_, f)| !f.is_consumed())
        .map(|(i, f)| (i, f.position.distance_squared(from)))
        .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
            Some((_, best_d)) if d >= best_d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

/// Owner of every entity in the arena
#[derive(Debug, Clone)]
pub struct World {
    pub organisms: Vec<Organism>,
    pub food: Vec<Food>,
    pub obstacles: Vec<Obstacle>,
    /// Side length of the square arena, centred on the origin
    pub size: f32,
    next_organism_id: OrganismId,
    next_food_id: FoodId,
}

impl World {
    /// Empty arena
    pub fn new(size: f32) -> Self {
        Self {
            organisms: Vec::new(),
            food: Vec::new(),
            obstacles: Vec::new(),
            size,
            next_organism_id: 0,
            next_food_id: 0,
        }
    }

    /// Scatter trees (size/4, inside ±size/2.5) and rocks (size/3, inside ±size/2.2)
    pub fn generate_obstacles<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let trees = (self.size / 4.0) as usize;
        let rocks = (self.size / 3.0) as usize;

        for _ in 0..trees {
            let position = Vec2::random_in_square(rng, self.size / 2.5);
            let tree = Obstacle::generated(ObstacleKind::Tree, position, rng);
            self.obstacles.push(tree);
        }
        for _ in 0..rocks {
            let position = Vec2::random_in_square(rng, self.size / 2.2);
            let rock = Obstacle::generated(ObstacleKind::Rock, position, rng);
            self.obstacles.push(rock);
        }
    }

    /// Drop every entity and restart identifiers
    pub fn clear(&mut self) {
        self.organisms.clear();
        self.food.clear();
        self.obstacles.clear();
        self.next_organism_id = 0;
        self.next_food_id = 0;
    }

    /// Uniform point inside ±size/2.5
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::random_in_square(rng, self.size / 2.5)
    }

    // Registration

    pub fn add_organism<R: Rng + ?Sized>(
        &mut self,
        kind: BehaviorKind,
        traits: Traits,
        position: Vec2,
        rng: &mut R,
    ) -> OrganismId {
        let id = self.allocate_organism_id();
        self.organisms.push(Organism::new(id, kind, traits, position, rng));
        id
    }

    pub fn add_offspring<R: Rng + ?Sized>(&mut self, offspring: Offspring, rng: &mut R) -> OrganismId {
        self.add_organism(offspring.kind, offspring.traits, offspring.position, rng)
    }

    pub fn add_food<R: Rng + ?Sized>(&mut self, kind: FoodKind, position: Vec2, energy_value: f32, rng: &mut R) -> FoodId {
        let id = self.next_food_id;
        self.next_food_id += 1;
        self.food.push(Food::new(id, kind, position, energy_value, rng));
        id
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    fn allocate_organism_id(&mut self) -> OrganismId {
        let id = self.next_organism_id;
        self.next_organism_id += 1;
        id
    }

    // Queries

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.iter().find(|o| o.id == id)
    }

    pub fn food_item(&self, id: FoodId) -> Option<&Food> {
        self.food.iter().find(|f| f.id == id)
    }

    pub fn living(&self) -> impl Iterator<Item = &Organism> {
        self.organisms.iter().filter(|o| o.is_alive())
    }

    /// Number of living organisms
    pub fn population(&self) -> usize {
        self.living().count()
    }

    /// Living organisms per behavior kind
    pub fn behavior_counts(&self) -> BehaviorTable<usize> {
        let mut counts = BehaviorTable::default();
        for organism in self.living() {
            *counts.get_mut(organism.kind()) += 1;
        }
        counts
    }

    /// Living organisms within `radius` of `center`, optionally skipping one
    pub fn neighbors(&self, center: Vec2, radius: f32, exclude: Option<OrganismId>) -> impl Iterator<Item = &Organism> {
        let r2 = radius * radius;
        self.living()
            .filter(move |o| Some(o.id) != exclude && o.position.distance_squared(center) <= r2)
    }

    /// Closest unconsumed food item
    pub fn nearest_food(&self, from: Vec2) -> Option<&Food> {
        nearest_food_index(&self.food, from).map(|i| &self.food[i])
    }

    pub fn overlaps_organism(&self, position: Vec2, radius: f32) -> bool {
        overlaps_organisms(&self.organisms, position, radius)
    }

    pub fn overlaps_obstacle(&self, position: Vec2, radius: f32) -> bool {
        overlaps_obstacles(&self.obstacles, position, radius)
    }

    pub fn overlaps_food(&self, position: Vec2, radius: f32) -> bool {
        overlaps_food(&self.food, position, radius)
    }

    /// All three exclusion tests pass
    pub fn is_clear(&self, position: Vec2, radius: f32) -> bool {
        !self.overlaps_organism(position, radius)
            && !self.overlaps_obstacle(position, radius)
            && !self.overlaps_food(position, radius)
    }

    // Placement

    /// Point clear of everything for a new organism, or None when the
    /// bounded search is exhausted
    pub fn find_safe_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec2> {
        (0..ORGANISM_PLACEMENT_ATTEMPTS)
            .map(|_| self.random_position(rng))
            .find(|&p| self.is_clear(p, ORGANISM_CLEARANCE))
    }

    /// Point for a new food item; falls back to an unchecked random point
    pub fn find_safe_food_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        for _ in 0..FOOD_PLACEMENT_ATTEMPTS {
            let candidate = self.random_position(rng);
            if self.is_clear(candidate, FOOD_CLEARANCE) {
                return candidate;
            }
        }
        self.random_position(rng)
    }

    /// Split one organism out of the population for its update
    pub fn split_at(&mut self, index: usize) -> Option<(&mut Organism, Neighborhood<'_>)> {
        if index >= self.organisms.len() {
            return None;
        }
        let (before, rest) = self.organisms.split_at_mut(index);
        let (me, after) = rest.split_first_mut()?;
        let hood = Neighborhood::new(before, after, &mut self.food, &self.obstacles, self.size);
        Some((me, hood))
    }

    /// Physically drop organisms dead for `organism_grace` seconds and food
    /// eaten `food_grace` seconds ago. Returns the ids removed.
    pub fn remove_expired(&mut self, now: f64, organism_grace: f64, food_grace: f64) -> (Vec<OrganismId>, Vec<FoodId>) {
        let mut removed_organisms = Vec::new();
        for organism in &mut self.organisms {
            if let Lifecycle::Dying { since, .. } = organism.lifecycle {
                if now - since >= organism_grace {
                    organism.lifecycle = Lifecycle::Removed;
                    removed_organisms.push(organism.id);
                }
            }
        }
        self.organisms.retain(|o| o.lifecycle != Lifecycle::Removed);

        let mut removed_food = Vec::new();
        self.food.retain(|f| match f.consumed_at() {
            Some(at) if now - at >= food_grace => {
                removed_food.push(f.id);
                false
            }
            _ => true,
        });

        (removed_organisms, removed_food)
    }
}

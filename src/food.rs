//! Passive food items.

use crate::behavior::Color;
use crate::geometry::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type FoodId = u64;

/// Cosmetic food variety; all kinds share the same energy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
    Apple,
    Orange,
    Berry,
    Banana,
}

impl FoodKind {
    pub const ALL: [FoodKind; 4] = [FoodKind::Apple, FoodKind::Orange, FoodKind::Berry, FoodKind::Banana];

    pub fn name(self) -> &'static str {
        match self {
            FoodKind::Apple => "apple",
            FoodKind::Orange => "orange",
            FoodKind::Berry => "berry",
            FoodKind::Banana => "banana",
        }
    }

    pub fn color(self) -> Color {
        match self {
            FoodKind::Apple => Color::new(0.9, 0.2, 0.2),
            FoodKind::Orange => Color::new(1.0, 0.6, 0.1),
            FoodKind::Berry => Color::new(0.5, 0.0, 0.7),
            FoodKind::Banana => Color::new(1.0, 0.9, 0.2),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for FoodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FoodKind {
    type Err = UnknownFoodKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        FoodKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or(UnknownFoodKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown food type: {0}")]
pub struct UnknownFoodKind(pub String);

/// A food item lying in the arena
#[derive(Debug, Clone)]
pub struct Food {
    pub id: FoodId,
    pub kind: FoodKind,
    pub position: Vec2,
    pub energy_value: f32,
    pub size: f32,
    /// Heading around the vertical axis, purely visual
    pub rotation: f32,
    consumed_at: Option<f64>,
}

impl Food {
    pub fn new<R: Rng + ?Sized>(id: FoodId, kind: FoodKind, position: Vec2, energy_value: f32, rng: &mut R) -> Self {
        Self {
            id,
            kind,
            position,
            energy_value,
            size: rng.gen_range(0.6..0.8),
            rotation: rng.gen_range(0.0..std::f32::consts::TAU),
            consumed_at: None,
        }
    }

    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.size * 0.4
    }

    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Simulation time at which the item was eaten
    pub fn consumed_at(&self) -> Option<f64> {
        self.consumed_at
    }

    /// Mark as eaten and yield its energy; a second call yields nothing
    pub fn consume(&mut self, now: f64) -> f32 {
        if self.is_consumed() {
            return 0.0;
        }
        self.consumed_at = Some(now);
        self.energy_value
    }

    pub fn update(&mut self, dt: f32) {
        if !self.is_consumed() {
            self.rotation = (self.rotation + dt * 0.2) % std::f32::consts::TAU;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_consume_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut food = Food::new(0, FoodKind::Apple, Vec2::ZERO, 30.0, &mut rng);

        assert_eq!(food.consume(2.0), 30.0);
        assert!(food.is_consumed());
        assert_eq!(food.consume(3.0), 0.0);
        assert_eq!(food.consumed_at(), Some(2.0));
    }

    #[test]
    fn test_size_and_radius() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for id in 0..50 {
            let food = Food::new(id, FoodKind::random(&mut rng), Vec2::ZERO, 30.0, &mut rng);
            assert!((0.6..0.8).contains(&food.size));
            assert!((food.bounding_radius() - food.size * 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Berry".parse::<FoodKind>().unwrap(), FoodKind::Berry);
        assert!("kiwi".parse::<FoodKind>().is_err());
    }
}

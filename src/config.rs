//! Configuration system for the ecosystem simulation.
//!
//! Supports YAML configuration files with sensible defaults. The
//! `environment`, `organisms` and `behaviors` sections together form the
//! live [`Parameters`] that the simulation passes into every tick.

use crate::behavior::{BehaviorParams, BehaviorTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub organisms: OrganismConfig,
    #[serde(default)]
    pub behaviors: BehaviorTable<BehaviorParams>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub equilibrium: EquilibriumConfig,
}

/// Arena and initial population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of the square arena
    pub size: f32,
    /// Organisms placed on reset
    pub initial_population: usize,
    /// Initial food items per initial organism
    pub initial_food_ratio: f32,
    /// Scatter trees and rocks on reset
    pub generate_obstacles: bool,
}

/// Environment tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub resource_abundance: f32,
    /// Energy drained per second, before the movement factor
    pub environmental_harshness: f32,
    pub food_spawn_rate: f32,
    pub food_energy_value: f32,
}

/// Base traits for fresh organisms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    pub base_energy: f32,
    pub base_speed: f32,
    pub base_size: f32,
    pub base_lifespan: f32,
    pub base_reproduction_rate: f32,
    /// Probability of a behavior switch at birth; also scales trait jitter
    pub mutation_rate: f32,
}

/// Loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Multiplier applied to every frame delta
    pub speed: f32,
    /// Upper bound on a single frame delta, in seconds
    pub max_delta: f32,
    /// Seconds a dead organism stays registered
    pub organism_removal_delay: f64,
    /// Seconds an eaten food item stays registered
    pub food_removal_delay: f64,
}

/// Statistics sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Simulated seconds between history samples
    pub sample_interval: f64,
    /// Samples kept in the rolling history
    pub history_length: usize,
}

/// Automatic parameter tuning towards a stable population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquilibriumConfig {
    pub enabled: bool,
    /// Simulated seconds between adjustments
    pub interval: f64,
    pub target_ratio: f32,
    /// No ratio-driven adjustment while |R − target| ≤ dead_band
    pub dead_band: f32,
    /// Population samples kept by the controller
    pub history_length: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 40.0,
            initial_population: 20,
            initial_food_ratio: 0.5,
            generate_obstacles: true,
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            resource_abundance: 1.0,
            environmental_harshness: 0.8,
            food_spawn_rate: 1.5,
            food_energy_value: 30.0,
        }
    }
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            base_energy: 120.0,
            base_speed: 1.0,
            base_size: 1.0,
            base_lifespan: 120.0,
            base_reproduction_rate: 0.008,
            mutation_rate: 0.1,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_delta: 0.1,
            organism_removal_delay: 1.5,
            food_removal_delay: 0.5,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sample_interval: 1.0,
            history_length: 100,
        }
    }
}

impl Default for EquilibriumConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 3.0,
            target_ratio: 1.0,
            dead_band: 0.1,
            history_length: 10,
        }
    }
}

/// The global tunables read by every organism each tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub environment: EnvironmentConfig,
    pub organisms: OrganismConfig,
    pub behaviors: BehaviorTable<BehaviorParams>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Tick parameters described by this configuration
    pub fn parameters(&self) -> Parameters {
        Parameters {
            environment: self.environment.clone(),
            organisms: self.organisms.clone(),
            behaviors: self.behaviors.clone(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.world.size > 0.0) {
            return invalid("world.size must be > 0");
        }
        if self.world.initial_food_ratio < 0.0 {
            return invalid("world.initial_food_ratio must be >= 0");
        }
        if self.environment.resource_abundance <= 0.0 || self.environment.food_spawn_rate <= 0.0 {
            return invalid("resource_abundance and food_spawn_rate must be > 0");
        }
        if self.environment.environmental_harshness < 0.0 {
            return invalid("environmental_harshness must be >= 0");
        }
        if self.organisms.base_speed <= 0.0 || self.organisms.base_size <= 0.0 || self.organisms.base_lifespan <= 0.0 {
            return invalid("base speed, size and lifespan must be > 0");
        }
        if !(0.0..=1.0).contains(&self.organisms.mutation_rate) {
            return invalid("mutation_rate must be between 0 and 1");
        }
        if self.behaviors.iter().any(|(_, p)| p.memory_duration < 0.0) {
            return invalid("memory_duration must be >= 0");
        }
        if self.simulation.speed < 0.0 || self.simulation.max_delta <= 0.0 {
            return invalid("simulation speed must be >= 0 and max_delta > 0");
        }
        if self.stats.sample_interval <= 0.0 || self.stats.history_length == 0 {
            return invalid("stats sample_interval and history_length must be > 0");
        }
        if self.equilibrium.interval <= 0.0 || self.equilibrium.history_length < 2 {
            return invalid("equilibrium interval must be > 0 and history_length >= 2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorKind;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.behaviors.get_mut(BehaviorKind::Selfish).interaction_strength = 1.7;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "world:\n  size: 60.0\nenvironment:\n  food_spawn_rate: 3.0\nbehaviors:\n  selfish:\n    unlimited_memory: true\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.world.size, 60.0);
        assert_eq!(config.world.initial_population, 20);
        assert_eq!(config.environment.food_spawn_rate, 3.0);
        assert_eq!(config.environment.food_energy_value, 30.0);
        assert_eq!(config.behaviors.deep_q.memory_duration, 50.0);
        assert!(config.behaviors.selfish.unlimited_memory);
        assert_eq!(config.behaviors.selfish.interaction_strength, 1.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.organisms.mutation_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.world.size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.parameters(), config.parameters());
    }
}

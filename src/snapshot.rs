//! Snapshot system for saving and restoring a simulation.
//!
//! A snapshot holds the tunable parameters and every living entity, but no
//! learned policy: Q-tables and network weights start fresh on restore.

use crate::behavior::BehaviorKind;
use crate::config::Parameters;
use crate::food::{Food, FoodKind};
use crate::geometry::Vec2;
use crate::organism::{Organism, Traits};
use crate::world::Obstacle;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"SYMB";

/// Errors that can occur while saving or loading snapshots
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a snapshot file (bad magic bytes)")]
    BadMagic,
    #[error("version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },
}

/// A living organism as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismRecord {
    pub kind: BehaviorKind,
    pub position: Vec2,
    pub energy: f32,
    pub speed: f32,
    pub size: f32,
    pub lifespan: f32,
    pub reproduction_rate: f32,
    pub age: f32,
}

impl OrganismRecord {
    pub fn traits(&self) -> Traits {
        Traits {
            energy: self.energy,
            speed: self.speed,
            size: self.size,
            lifespan: self.lifespan,
            reproduction_rate: self.reproduction_rate,
        }
    }
}

impl From<&Organism> for OrganismRecord {
    fn from(o: &Organism) -> Self {
        Self {
            kind: o.kind(),
            position: o.position,
            energy: o.energy,
            speed: o.speed,
            size: o.size,
            lifespan: o.max_lifespan,
            reproduction_rate: o.reproduction_rate,
            age: o.age,
        }
    }
}

/// An uneaten food item as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub kind: FoodKind,
    pub position: Vec2,
    pub energy_value: f32,
}

impl From<&Food> for FoodRecord {
    fn from(f: &Food) -> Self {
        Self {
            kind: f.kind,
            position: f.position,
            energy_value: f.energy_value,
        }
    }
}

/// Complete restorable simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Version for compatibility checking
    pub version: u32,
    /// Simulation clock when taken
    pub time: f64,
    pub speed: f32,
    pub initial_population: usize,
    pub world_size: f32,
    pub parameters: Parameters,
    pub organisms: Vec<OrganismRecord>,
    pub food: Vec<FoodRecord>,
    pub obstacles: Vec<Obstacle>,
}

impl SimulationSnapshot {
    /// Current snapshot version
    pub const VERSION: u32 = 1;

    /// Living population stored in the snapshot
    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    /// Save snapshot to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        log::info!("Saved snapshot with {} organisms", self.organisms.len());
        Ok(())
    }

    /// Load snapshot from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let found = u32::from_le_bytes(version);
        if found != Self::VERSION {
            return Err(SnapshotError::Version {
                expected: Self::VERSION,
                found,
            });
        }

        let snapshot: SimulationSnapshot = bincode::deserialize_from(&mut reader)?;
        log::info!("Loaded snapshot with {} organisms", snapshot.organisms.len());
        Ok(snapshot)
    }

    /// Encode as JSON for key-value stores
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: SimulationSnapshot = serde_json::from_str(json)?;
        if snapshot.version != Self::VERSION {
            return Err(SnapshotError::Version {
                expected: Self::VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).map(|n| n as usize + MAGIC.len() + 4).unwrap_or(0)
    }
}

//! Behavior strategies governing social interaction between organisms.
//!
//! A behavior answers two questions for its owner:
//! - which of the nearby organisms to approach ([`Behavior::select_target`])
//! - how energy flows when they meet ([`Behavior::interact`])
//!
//! The seven strategies form a closed set:
//! - five reactive policies (aggressive, altruistic, tit-for-tat, cooperative, selfish)
//! - a tabular Q-learner
//! - a small neural Q-learner with experience replay
//!
//! Behaviors never see the world container, only [`Profile`] views of
//! organisms, so they can be driven and tested in isolation.

mod deep_q;
mod memory;
mod q_learning;
mod reactive;

pub use deep_q::{DeepQLearner, Experience, StateVector, STATE_SIZE};
pub use memory::{InteractionMemory, Recollection};
pub use q_learning::{EnergyLevel, LearnedAction, PriorContact, QLearner, QState};

use crate::geometry::Vec2;
use crate::organism::OrganismId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant of the seven behavior strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    Aggressive,
    Altruistic,
    TitForTat,
    Cooperative,
    Selfish,
    QLearning,
    #[serde(rename = "deepq")]
    DeepQLearning,
}

impl BehaviorKind {
    /// Every kind, in the canonical order used for one-hot encodings
    pub const ALL: [BehaviorKind; 7] = [
        BehaviorKind::Aggressive,
        BehaviorKind::Altruistic,
        BehaviorKind::TitForTat,
        BehaviorKind::Cooperative,
        BehaviorKind::Selfish,
        BehaviorKind::QLearning,
        BehaviorKind::DeepQLearning,
    ];

    /// Position in [`BehaviorKind::ALL`]
    pub fn index(self) -> usize {
        match self {
            BehaviorKind::Aggressive => 0,
            BehaviorKind::Altruistic => 1,
            BehaviorKind::TitForTat => 2,
            BehaviorKind::Cooperative => 3,
            BehaviorKind::Selfish => 4,
            BehaviorKind::QLearning => 5,
            BehaviorKind::DeepQLearning => 6,
        }
    }

    /// Stable short name, shared with snapshots and the CLI
    pub fn name(self) -> &'static str {
        match self {
            BehaviorKind::Aggressive => "aggressive",
            BehaviorKind::Altruistic => "altruistic",
            BehaviorKind::TitForTat => "titfortat",
            BehaviorKind::Cooperative => "cooperative",
            BehaviorKind::Selfish => "selfish",
            BehaviorKind::QLearning => "qlearning",
            BehaviorKind::DeepQLearning => "deepq",
        }
    }

    /// Display color for the renderer
    pub fn color(self) -> Color {
        match self {
            BehaviorKind::Aggressive => Color::new(0.9, 0.2, 0.2),
            BehaviorKind::Altruistic => Color::new(0.2, 0.7, 0.9),
            BehaviorKind::TitForTat => Color::new(0.9, 0.6, 0.1),
            BehaviorKind::Cooperative => Color::new(0.2, 0.8, 0.2),
            BehaviorKind::Selfish => Color::new(0.5, 0.5, 0.5),
            BehaviorKind::QLearning => Color::new(0.6, 0.3, 0.8),
            BehaviorKind::DeepQLearning => Color::new(0.1, 0.6, 0.8),
        }
    }

    /// Uniformly random kind
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a behavior name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown behavior type: {0}")]
pub struct UnknownBehavior(pub String);

impl FromStr for BehaviorKind {
    type Err = UnknownBehavior;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        BehaviorKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or(UnknownBehavior(s.to_string()))
    }
}

/// RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// One value per behavior kind; kinds missing from a serialized table
/// take their default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTable<T> {
    pub aggressive: T,
    pub altruistic: T,
    #[serde(rename = "titfortat")]
    pub tit_for_tat: T,
    pub cooperative: T,
    pub selfish: T,
    #[serde(rename = "qlearning")]
    pub q_learning: T,
    #[serde(rename = "deepq")]
    pub deep_q: T,
}

impl<T> BehaviorTable<T> {
    /// Build a table by evaluating `f` for every kind
    pub fn from_fn(mut f: impl FnMut(BehaviorKind) -> T) -> Self {
        Self {
            aggressive: f(BehaviorKind::Aggressive),
            altruistic: f(BehaviorKind::Altruistic),
            tit_for_tat: f(BehaviorKind::TitForTat),
            cooperative: f(BehaviorKind::Cooperative),
            selfish: f(BehaviorKind::Selfish),
            q_learning: f(BehaviorKind::QLearning),
            deep_q: f(BehaviorKind::DeepQLearning),
        }
    }

    pub fn get(&self, kind: BehaviorKind) -> &T {
        match kind {
            BehaviorKind::Aggressive => &self.aggressive,
            BehaviorKind::Altruistic => &self.altruistic,
            BehaviorKind::TitForTat => &self.tit_for_tat,
            BehaviorKind::Cooperative => &self.cooperative,
            BehaviorKind::Selfish => &self.selfish,
            BehaviorKind::QLearning => &self.q_learning,
            BehaviorKind::DeepQLearning => &self.deep_q,
        }
    }

    pub fn get_mut(&mut self, kind: BehaviorKind) -> &mut T {
        match kind {
            BehaviorKind::Aggressive => &mut self.aggressive,
            BehaviorKind::Altruistic => &mut self.altruistic,
            BehaviorKind::TitForTat => &mut self.tit_for_tat,
            BehaviorKind::Cooperative => &mut self.cooperative,
            BehaviorKind::Selfish => &mut self.selfish,
            BehaviorKind::QLearning => &mut self.q_learning,
            BehaviorKind::DeepQLearning => &mut self.deep_q,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BehaviorKind, &T)> {
        BehaviorKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Externally tunable parameters shared by every behavior of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorParams {
    /// Multiplier applied to both energy deltas of an interaction
    pub interaction_strength: f32,
    /// Seconds a memory entry stays valid
    pub memory_duration: f64,
    /// Never expire memory entries
    pub unlimited_memory: bool,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            interaction_strength: 1.0,
            memory_duration: 50.0,
            unlimited_memory: false,
        }
    }
}

/// Read-only view of an organism, as seen by a behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub id: OrganismId,
    pub kind: BehaviorKind,
    pub position: Vec2,
    pub energy: f32,
    pub size: f32,
}

/// Coarse classification of an interaction, for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionTag {
    /// The actor took energy from its partner
    Exploit,
    /// The actor gave energy and the partner gained
    Help,
    Neutral,
}

/// Energy change requested by one interaction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interaction {
    pub self_energy_delta: f32,
    pub target_energy_delta: f32,
}

impl Interaction {
    /// Base exchange of the default policy: both sides gain a little
    pub const COURTESY: Interaction = Interaction {
        self_energy_delta: 2.0,
        target_energy_delta: 2.0,
    };

    /// No energy moves
    pub const NONE: Interaction = Interaction {
        self_energy_delta: 0.0,
        target_energy_delta: 0.0,
    };

    /// Actor takes `amount` from the partner
    pub fn take(amount: f32) -> Self {
        Self {
            self_energy_delta: amount,
            target_energy_delta: -amount,
        }
    }

    /// Actor pays `cost`, partner receives `gift`
    pub fn give(cost: f32, gift: f32) -> Self {
        Self {
            self_energy_delta: -cost,
            target_energy_delta: gift,
        }
    }

    /// Both deltas multiplied by `strength`
    pub fn scaled(self, strength: f32) -> Self {
        Self {
            self_energy_delta: self.self_energy_delta * strength,
            target_energy_delta: self.target_energy_delta * strength,
        }
    }

    /// Net energy created (positive) or destroyed (negative)
    pub fn net(&self) -> f32 {
        self.self_energy_delta + self.target_energy_delta
    }

    pub fn tag(&self) -> InteractionTag {
        if self.self_energy_delta > 0.0 {
            InteractionTag::Exploit
        } else if self.self_energy_delta < 0.0 && self.target_energy_delta > 0.0 {
            InteractionTag::Help
        } else {
            InteractionTag::Neutral
        }
    }
}

/// Per-kind decision state
#[derive(Debug, Clone)]
enum Strategy {
    Aggressive,
    Altruistic,
    TitForTat,
    Cooperative,
    Selfish,
    QLearning(QLearner),
    DeepQLearning(Box<DeepQLearner>),
}

/// A behavior instance, exclusively owned by one organism
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Multiplier applied by the owner to both energy deltas
    pub interaction_strength: f32,
    memory: InteractionMemory,
    strategy: Strategy,
}

impl Behavior {
    /// Fresh behavior of the given kind with default parameters
    pub fn new<R: Rng + ?Sized>(kind: BehaviorKind, rng: &mut R) -> Self {
        let defaults = BehaviorParams::default();
        let strategy = match kind {
            BehaviorKind::Aggressive => Strategy::Aggressive,
            BehaviorKind::Altruistic => Strategy::Altruistic,
            BehaviorKind::TitForTat => Strategy::TitForTat,
            BehaviorKind::Cooperative => Strategy::Cooperative,
            BehaviorKind::Selfish => Strategy::Selfish,
            BehaviorKind::QLearning => Strategy::QLearning(QLearner::new()),
            BehaviorKind::DeepQLearning => Strategy::DeepQLearning(Box::new(DeepQLearner::new(rng))),
        };

        Self {
            interaction_strength: defaults.interaction_strength,
            memory: InteractionMemory::new(defaults.memory_duration),
            strategy,
        }
    }

    /// Fresh behavior of a uniformly random kind
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let kind = BehaviorKind::random(rng);
        Self::new(kind, rng)
    }

    pub fn kind(&self) -> BehaviorKind {
        match self.strategy {
            Strategy::Aggressive => BehaviorKind::Aggressive,
            Strategy::Altruistic => BehaviorKind::Altruistic,
            Strategy::TitForTat => BehaviorKind::TitForTat,
            Strategy::Cooperative => BehaviorKind::Cooperative,
            Strategy::Selfish => BehaviorKind::Selfish,
            Strategy::QLearning(_) => BehaviorKind::QLearning,
            Strategy::DeepQLearning(_) => BehaviorKind::DeepQLearning,
        }
    }

    pub fn color(&self) -> Color {
        self.kind().color()
    }

    /// Overwrite the externally tunable parameters
    pub fn apply_params(&mut self, params: &BehaviorParams) {
        self.interaction_strength = params.interaction_strength;
        self.memory.set_duration(params.memory_duration);
        self.memory.set_unlimited(params.unlimited_memory);
    }

    pub fn memory(&self) -> &InteractionMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut InteractionMemory {
        &mut self.memory
    }

    pub fn set_unlimited_memory(&mut self, enabled: bool) {
        self.memory.set_unlimited(enabled);
    }

    /// Last non-expired interaction with `partner`
    pub fn last_interaction(&self, partner: OrganismId, now: f64) -> Option<Recollection> {
        self.memory.recall(partner, now)
    }

    /// Pick which nearby organism to approach
    pub fn select_target<'n, R: Rng + ?Sized>(
        &self,
        me: &Profile,
        nearby: &'n [Profile],
        now: f64,
        rng: &mut R,
    ) -> Option<&'n Profile> {
        match &self.strategy {
            Strategy::Aggressive => reactive::select_aggressive(me, nearby),
            Strategy::Altruistic => reactive::select_altruistic(me, nearby),
            Strategy::TitForTat => reactive::select_tit_for_tat(me, nearby, &self.memory, now, rng),
            Strategy::Cooperative => reactive::select_cooperative(me, nearby, &self.memory, now),
            Strategy::Selfish => reactive::select_selfish(nearby),
            Strategy::QLearning(q) => q.select_target(me, nearby, &self.memory, now, rng),
            Strategy::DeepQLearning(dq) => dq.select_target(me, nearby, &self.memory, now, rng),
        }
    }

    /// Decide the energy exchange with `target` and record its polarity
    pub fn interact<R: Rng + ?Sized>(
        &mut self,
        me: &Profile,
        target: &Profile,
        now: f64,
        rng: &mut R,
    ) -> Interaction {
        let memory = &mut self.memory;
        match &mut self.strategy {
            Strategy::Aggressive => reactive::interact_aggressive(target, memory, now),
            Strategy::Altruistic => reactive::interact_altruistic(me, target, memory, now),
            Strategy::TitForTat => reactive::interact_tit_for_tat(target, memory, now),
            Strategy::Cooperative => reactive::interact_cooperative(target, memory, now),
            Strategy::Selfish => reactive::interact_selfish(target, memory, now),
            Strategy::QLearning(q) => q.interact(me, target, memory, now, rng),
            Strategy::DeepQLearning(dq) => dq.interact(me, target, memory, now, rng),
        }
    }

    pub fn q_learner(&self) -> Option<&QLearner> {
        match &self.strategy {
            Strategy::QLearning(q) => Some(q),
            _ => None,
        }
    }

    pub fn deep_q_learner(&self) -> Option<&DeepQLearner> {
        match &self.strategy {
            Strategy::DeepQLearning(dq) => Some(dq),
            _ => None,
        }
    }

    /// Whether learned state is numerically sound
    pub fn is_valid(&self) -> bool {
        match &self.strategy {
            Strategy::QLearning(q) => q.is_valid(),
            Strategy::DeepQLearning(dq) => dq.is_valid(),
            _ => true,
        }
    }

    /// Discard learned state, keeping kind, parameters and memory
    pub fn reset_learning<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match &mut self.strategy {
            Strategy::QLearning(q) => *q = QLearner::new(),
            Strategy::DeepQLearning(dq) => **dq = DeepQLearner::new(rng),
            _ => {}
        }
    }
}

//! Tabular Q-learning over a coarse social state.

use super::{BehaviorKind, Interaction, InteractionMemory, Profile};
use rand::Rng;
use std::collections::HashMap;

/// The three moves available to both learning behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearnedAction {
    /// Give min(8, 10% own energy); the partner receives 1.5× that
    Cooperate,
    /// Take min(10, 15% of the partner's energy)
    Compete,
    /// No transfer
    Ignore,
}

impl LearnedAction {
    pub const ALL: [LearnedAction; 3] = [LearnedAction::Cooperate, LearnedAction::Compete, LearnedAction::Ignore];

    pub fn index(self) -> usize {
        match self {
            LearnedAction::Cooperate => 0,
            LearnedAction::Compete => 1,
            LearnedAction::Ignore => 2,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Energy exchange for this action; `idle_gain` is what ignoring pays the actor
    pub(crate) fn payout(self, me: &Profile, target: &Profile, idle_gain: f32) -> Interaction {
        match self {
            LearnedAction::Cooperate => {
                let shared = (me.energy * 0.1).min(8.0);
                Interaction::give(shared, shared * 1.5)
            }
            LearnedAction::Compete => Interaction::take((target.energy * 0.15).min(10.0)),
            LearnedAction::Ignore => Interaction {
                self_energy_delta: idle_gain,
                target_energy_delta: 0.0,
            },
        }
    }

    /// Record the action's polarity against the partner; ignoring records nothing
    pub(crate) fn remember(self, target: &Profile, memory: &mut InteractionMemory, now: f64) {
        match self {
            LearnedAction::Cooperate => memory.remember(target.id, true, now),
            LearnedAction::Compete => memory.remember(target.id, false, now),
            LearnedAction::Ignore => {}
        }
    }
}

/// Energy bucket: low below 30, high above 70
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub fn of(energy: f32) -> Self {
        if energy < 30.0 {
            EnergyLevel::Low
        } else if energy > 70.0 {
            EnergyLevel::High
        } else {
            EnergyLevel::Medium
        }
    }
}

/// Polarity of the last remembered interaction with a partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorContact {
    None,
    Positive,
    Negative,
}

impl PriorContact {
    pub fn recall(memory: &InteractionMemory, target: &Profile, now: f64) -> Self {
        match memory.recall(target.id, now) {
            None => PriorContact::None,
            Some(r) if r.was_positive => PriorContact::Positive,
            Some(_) => PriorContact::Negative,
        }
    }
}

/// Discretised view of one pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QState {
    pub self_energy: EnergyLevel,
    pub target_energy: EnergyLevel,
    pub target_kind: BehaviorKind,
    pub prior: PriorContact,
}

impl QState {
    pub fn observe(me: &Profile, target: &Profile, memory: &InteractionMemory, now: f64) -> Self {
        Self {
            self_energy: EnergyLevel::of(me.energy),
            target_energy: EnergyLevel::of(target.energy),
            target_kind: target.kind,
            prior: PriorContact::recall(memory, target, now),
        }
    }
}

/// Last step taken, waiting for the next state before it can be learned
#[derive(Debug, Clone, Copy)]
struct Pending {
    state: QState,
    action: LearnedAction,
    reward: f32,
}

/// Q-table learner with epsilon-greedy exploration
#[derive(Debug, Clone)]
pub struct QLearner {
    pub learning_rate: f32,
    pub discount: f32,
    pub exploration_rate: f32,
    table: HashMap<QState, [f32; 3]>,
    pending: Option<Pending>,
}

impl Default for QLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl QLearner {
    pub fn new() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            exploration_rate: 0.2,
            table: HashMap::new(),
            pending: None,
        }
    }

    /// Action values of `state`; unseen states read as all zero
    pub fn values(&self, state: &QState) -> [f32; 3] {
        self.table.get(state).copied().unwrap_or([0.0; 3])
    }

    pub fn q_value(&self, state: &QState, action: LearnedAction) -> f32 {
        self.values(state)[action.index()]
    }

    pub fn set_q_value(&mut self, state: QState, action: LearnedAction, value: f32) {
        self.table.entry(state).or_insert([0.0; 3])[action.index()] = value;
    }

    pub fn max_q(&self, state: &QState) -> f32 {
        self.values(state).into_iter().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Greedy action; ties resolve to the earliest action
    pub fn best_action(&self, state: &QState) -> LearnedAction {
        let values = self.values(state);
        let mut best = LearnedAction::Cooperate;
        for action in LearnedAction::ALL {
            if values[action.index()] > values[best.index()] {
                best = action;
            }
        }
        best
    }

    /// Number of states visited so far
    pub fn states_seen(&self) -> usize {
        self.table.len()
    }

    /// `Q(s,a) += α·(r + γ·max Q(s') − Q(s,a))`
    pub fn learn(&mut self, state: QState, action: LearnedAction, reward: f32, next: &QState) {
        let max_next = self.max_q(next);
        self.table.entry(*next).or_insert([0.0; 3]);

        let alpha = self.learning_rate;
        let gamma = self.discount;
        let q = &mut self.table.entry(state).or_insert([0.0; 3])[action.index()];
        *q += alpha * (reward + gamma * max_next - *q);
    }

    fn choose_action<R: Rng + ?Sized>(&self, state: &QState, rng: &mut R) -> LearnedAction {
        if rng.gen::<f32>() < self.exploration_rate {
            LearnedAction::random(rng)
        } else {
            self.best_action(state)
        }
    }

    pub(super) fn select_target<'n, R: Rng + ?Sized>(
        &self,
        me: &Profile,
        nearby: &'n [Profile],
        memory: &InteractionMemory,
        now: f64,
        rng: &mut R,
    ) -> Option<&'n Profile> {
        if nearby.is_empty() {
            return None;
        }
        if rng.gen::<f32>() < self.exploration_rate {
            return super::reactive::random_pick(nearby, rng);
        }

        let mut best: Option<&'n Profile> = None;
        let mut best_value = f32::NEG_INFINITY;
        for candidate in nearby {
            let value = self.max_q(&QState::observe(me, candidate, memory, now));
            if value > best_value {
                best_value = value;
                best = Some(candidate);
            }
        }

        // Nothing learned about any of them yet
        if best_value == 0.0 {
            return super::reactive::random_pick(nearby, rng);
        }
        best
    }

    pub(super) fn interact<R: Rng + ?Sized>(
        &mut self,
        me: &Profile,
        target: &Profile,
        memory: &mut InteractionMemory,
        now: f64,
        rng: &mut R,
    ) -> Interaction {
        let state = QState::observe(me, target, memory, now);
        let action = self.choose_action(&state, rng);
        let outcome = action.payout(me, target, 0.0);
        action.remember(target, memory, now);

        if let Some(prev) = self.pending.take() {
            self.learn(prev.state, prev.action, prev.reward, &state);
        }
        self.pending = Some(Pending {
            state,
            action,
            reward: outcome.self_energy_delta,
        });

        outcome
    }

    pub fn is_valid(&self) -> bool {
        self.table.values().flatten().all(|q| q.is_finite())
    }
}

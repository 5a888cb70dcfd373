//! Neural Q-learning with experience replay.

use super::q_learning::{LearnedAction, PriorContact};
use super::{BehaviorKind, Interaction, InteractionMemory, Profile};
use crate::neural::QNetwork;
use rand::Rng;
use std::collections::VecDeque;

/// Width of the feature vector fed to the network
pub const STATE_SIZE: usize = 12;
const HIDDEN_SIZE: usize = 8;

const REPLAY_CAPACITY: usize = 100;
const MINI_BATCH: usize = 10;

/// Normalised features of one pairing
pub type StateVector = [f32; STATE_SIZE];

/// One remembered transition
#[derive(Debug, Clone)]
pub struct Experience {
    pub state: StateVector,
    pub action: LearnedAction,
    pub reward: f32,
    pub next_state: StateVector,
}

/// Encode `(me, target)` as network input.
///
/// Layout: own energy/100, target energy/100, own size/2, target size/2,
/// one-hot target kind (7), prior contact (+1 positive, −1 negative, 0 none).
pub fn encode_state(me: &Profile, target: &Profile, memory: &InteractionMemory, now: f64) -> StateVector {
    let mut v = [0.0; STATE_SIZE];
    v[0] = me.energy / 100.0;
    v[1] = target.energy / 100.0;
    v[2] = me.size / 2.0;
    v[3] = target.size / 2.0;
    v[4 + target.kind.index()] = 1.0;
    v[4 + BehaviorKind::ALL.len()] = match PriorContact::recall(memory, target, now) {
        PriorContact::None => 0.0,
        PriorContact::Positive => 1.0,
        PriorContact::Negative => -1.0,
    };
    v
}

/// Online neural Q-learner
#[derive(Debug, Clone)]
pub struct DeepQLearner {
    pub learning_rate: f32,
    pub discount: f32,
    pub exploration_rate: f32,
    pub exploration_decay: f32,
    pub min_exploration_rate: f32,
    network: QNetwork,
    replay: VecDeque<Experience>,
    last: Option<(StateVector, LearnedAction, f32)>,
}

impl DeepQLearner {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            learning_rate: 0.05,
            discount: 0.9,
            exploration_rate: 0.3,
            exploration_decay: 0.9999,
            min_exploration_rate: 0.05,
            network: QNetwork::new(STATE_SIZE, HIDDEN_SIZE, LearnedAction::ALL.len(), rng),
            replay: VecDeque::with_capacity(REPLAY_CAPACITY + 1),
            last: None,
        }
    }

    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn q_values(&self, state: &StateVector) -> Vec<f32> {
        self.network.forward(state)
    }

    /// Greedy action; ties resolve to the earliest action
    pub fn best_action(&self, state: &StateVector) -> LearnedAction {
        let q = self.q_values(state);
        let mut best = 0;
        for i in 1..q.len() {
            if q[i] > q[best] {
                best = i;
            }
        }
        LearnedAction::ALL[best]
    }

    /// Append a transition, dropping the oldest beyond capacity
    pub fn remember_experience(&mut self, experience: Experience) {
        self.replay.push_back(experience);
        if self.replay.len() > REPLAY_CAPACITY {
            self.replay.pop_front();
        }
    }

    /// Train on a uniform mini-batch, sampled with replacement
    pub fn replay_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.replay.len() < MINI_BATCH {
            return;
        }
        for _ in 0..MINI_BATCH {
            let index = rng.gen_range(0..self.replay.len());
            let experience = self.replay[index].clone();
            self.learn(&experience);
        }
    }

    /// One TD step: target = r + γ·max Q(s') in the taken slot
    pub fn learn(&mut self, experience: &Experience) {
        let mut target = self.network.forward(&experience.state);
        let max_next = self
            .network
            .forward(&experience.next_state)
            .into_iter()
            .fold(f32::NEG_INFINITY, f32::max);

        target[experience.action.index()] = experience.reward + self.discount * max_next;
        self.network.train(&experience.state, &target, self.learning_rate);
    }

    fn decay_exploration(&mut self) {
        self.exploration_rate = (self.exploration_rate * self.exploration_decay).max(self.min_exploration_rate);
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
            let q = self.q_values(&encode_state(me, candidate, memory, now));
            let value = q.into_iter().fold(f32::NEG_INFINITY, f32::max);
            if value > best_value {
                best_value = value;
                best = Some(candidate);
            }
        }

        best.or(nearby.first())
    }

    pub(super) fn interact<R: Rng + ?Sized>(
        &mut self,
        me: &Profile,
        target: &Profile,
        memory: &mut InteractionMemory,
        now: f64,
        rng: &mut R,
    ) -> Interaction {
        let state = encode_state(me, target, memory, now);
        let action = if rng.gen::<f32>() < self.exploration_rate {
            LearnedAction::random(rng)
        } else {
            self.best_action(&state)
        };
        let outcome = action.payout(me, target, 1.0);
        action.remember(target, memory, now);

        if let Some((prev_state, prev_action, prev_reward)) = self.last.take() {
            self.remember_experience(Experience {
                state: prev_state,
                action: prev_action,
                reward: prev_reward,
                next_state: state,
            });
            self.replay_batch(rng);
        }
        self.last = Some((state, action, outcome.self_energy_delta));

        self.decay_exploration();
        outcome
    }

    pub fn is_valid(&self) -> bool {
        self.network.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn profile(id: u64, kind: BehaviorKind, energy: f32, size: f32) -> Profile {
        Profile {
            id,
            kind,
            position: Vec2::new(id as f32, 0.0),
            energy,
            size,
        }
    }

    fn experience(reward: f32) -> Experience {
        Experience {
            state: [0.5; STATE_SIZE],
            action: LearnedAction::Compete,
            reward,
            next_state: [0.2; STATE_SIZE],
        }
    }

    #[test]
    fn test_state_encoding() {
        let mut memory = InteractionMemory::new(50.0);
        let me = profile(0, BehaviorKind::DeepQLearning, 80.0, 1.2);
        let target = profile(1, BehaviorKind::TitForTat, 40.0, 1.0);

        let v = encode_state(&me, &target, &memory, 0.0);
        assert!((v[0] - 0.8).abs() < 1e-6);
        assert!((v[1] - 0.4).abs() < 1e-6);
        assert!((v[2] - 0.6).abs() < 1e-6);
        assert_eq!(v[3], 0.5);
        assert_eq!(v[4..11].iter().sum::<f32>(), 1.0);
        assert_eq!(v[4 + BehaviorKind::TitForTat.index()], 1.0);
        assert_eq!(v[11], 0.0);

        memory.remember(1, false, 0.0);
        assert_eq!(encode_state(&me, &target, &memory, 0.0)[11], -1.0);
    }

    #[test]
    fn test_replay_buffer_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut dq = DeepQLearner::new(&mut rng);
        for i in 0..150 {
            dq.remember_experience(experience(i as f32));
        }
        assert_eq!(dq.replay_len(), REPLAY_CAPACITY);
        assert_eq!(dq.replay[0].reward, 50.0);
    }

    #[test]
    fn test_exploration_decays_to_floor() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut dq = DeepQLearner::new(&mut rng);
        let mut memory = InteractionMemory::new(50.0);
        let me = profile(0, BehaviorKind::DeepQLearning, 100.0, 1.0);
        let target = profile(1, BehaviorKind::Selfish, 100.0, 1.0);

        let before = dq.exploration_rate;
        dq.interact(&me, &target, &mut memory, 0.0, &mut rng);
        assert!(dq.exploration_rate < before);

        dq.exploration_rate = 0.05;
        dq.interact(&me, &target, &mut memory, 1.0, &mut rng);
        assert_eq!(dq.exploration_rate, 0.05);
    }

    #[test]
    fn test_learning_moves_taken_action_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut dq = DeepQLearner::new(&mut rng);
        let e = experience(10.0);

        let before = dq.q_values(&e.state);
        for _ in 0..50 {
            dq.learn(&e);
        }
        let after = dq.q_values(&e.state);

        assert!(after[LearnedAction::Compete.index()] > before[LearnedAction::Compete.index()]);
        assert!(dq.is_valid());
    }

    #[test]
    fn test_interactions_fill_replay_and_stay_finite() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut dq = DeepQLearner::new(&mut rng);
        let mut memory = InteractionMemory::new(50.0);
        let me = profile(0, BehaviorKind::DeepQLearning, 90.0, 1.0);

        for step in 0..40 {
            let target = profile(1 + step % 3, BehaviorKind::ALL[step as usize % 7], 60.0, 1.0);
            let i = dq.interact(&me, &target, &mut memory, step as f64, &mut rng);
            assert!(i.self_energy_delta.is_finite());
        }
        assert_eq!(dq.replay_len(), 39);
        assert!(dq.is_valid());
    }

    #[test]
    fn test_select_target_falls_back_to_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let dq = DeepQLearner::new(&mut rng);
        let memory = InteractionMemory::new(50.0);
        let me = profile(0, BehaviorKind::DeepQLearning, 90.0, 1.0);
        let nearby = [profile(1, BehaviorKind::Selfish, 50.0, 1.0)];

        assert_eq!(dq.select_target(&me, &nearby, &memory, 0.0, &mut rng).unwrap().id, 1);
        assert!(dq.select_target(&me, &[], &memory, 0.0, &mut rng).is_none());
    }
}

//! Statistics tracking for the simulation.

use crate::behavior::{BehaviorKind, BehaviorTable};
use crate::config::StatsConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples averaged by [`StatisticsTracker::reproduction_ratio`]
const RATIO_WINDOW: usize = 5;

/// Current population snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Simulation time of the last update
    pub time: f64,
    /// Living organisms
    pub total_population: usize,
    /// Living organisms per behavior kind
    pub behavior_counts: BehaviorTable<usize>,
    /// Cumulative births since reset
    pub births: u64,
    /// Cumulative deaths since reset
    pub deaths: u64,
}

impl Stats {
    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let c = &self.behavior_counts;
        format!(
            "T:{:8.1} | Pop:{:4} | Agg:{:3} Alt:{:3} TfT:{:3} Coop:{:3} Self:{:3} Q:{:3} DQ:{:3} | B:{} D:{}",
            self.time,
            self.total_population,
            c.aggressive,
            c.altruistic,
            c.tit_for_tat,
            c.cooperative,
            c.selfish,
            c.q_learning,
            c.deep_q,
            self.births,
            self.deaths,
        )
    }
}

/// One history point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub population: usize,
    pub behaviors: BehaviorTable<usize>,
}

/// Passive aggregator of population statistics with a bounded history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatisticsTracker {
    current: Stats,
    history: VecDeque<Sample>,
    sample_interval: f64,
    max_history: usize,
    last_sample: f64,
    births_checkpoint: u64,
    deaths_checkpoint: u64,
}

impl StatisticsTracker {
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            current: Stats::default(),
            history: VecDeque::with_capacity(config.history_length + 1),
            sample_interval: config.sample_interval,
            max_history: config.history_length,
            last_sample: 0.0,
            births_checkpoint: 0,
            deaths_checkpoint: 0,
        }
    }

    /// Refresh the current counts; append a history sample once per
    /// interval. Returns whether a sample was taken.
    pub fn update(&mut self, now: f64, counts: BehaviorTable<usize>) -> bool {
        self.current.time = now;
        self.current.total_population = counts.iter().map(|(_, n)| *n).sum();
        self.current.behavior_counts = counts;

        if now - self.last_sample < self.sample_interval {
            return false;
        }
        self.last_sample = now;

        self.history.push_back(Sample {
            time: now,
            population: self.current.total_population,
            behaviors: self.current.behavior_counts.clone(),
        });
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        true
    }

    pub fn record_births(&mut self, n: usize) {
        self.current.births += n as u64;
    }

    pub fn record_deaths(&mut self, n: usize) {
        self.current.deaths += n as u64;
    }

    pub fn stats(&self) -> &Stats {
        &self.current
    }

    pub fn history(&self) -> impl Iterator<Item = &Sample> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Get population over time
    pub fn population_series(&self) -> Vec<(f64, usize)> {
        self.history.iter().map(|s| (s.time, s.population)).collect()
    }

    /// Get one behavior's head count over time
    pub fn behavior_series(&self, kind: BehaviorKind) -> Vec<(f64, usize)> {
        self.history.iter().map(|s| (s.time, *s.behaviors.get(kind))).collect()
    }

    /// Mean ratio of consecutive population samples over the last few
    /// samples. Pairs with an empty predecessor are skipped; 1.0 when no
    /// pair is usable.
    pub fn reproduction_ratio(&self) -> f32 {
        let skip = self.history.len().saturating_sub(RATIO_WINDOW);
        let recent: Vec<usize> = self.history.iter().skip(skip).map(|s| s.population).collect();
        population_ratio(&recent)
    }

    /// Share of the living population with this behavior, in percent
    pub fn behavior_percentage(&self, kind: BehaviorKind) -> f32 {
        if self.current.total_population == 0 {
            return 0.0;
        }
        *self.current.behavior_counts.get(kind) as f32 / self.current.total_population as f32 * 100.0
    }

    /// Births over deaths since the previous call
    pub fn birth_death_ratio(&mut self) -> f32 {
        let births = self.current.births - self.births_checkpoint;
        let deaths = self.current.deaths - self.deaths_checkpoint;
        self.births_checkpoint = self.current.births;
        self.deaths_checkpoint = self.current.deaths;

        match (births, deaths) {
            (0, 0) => 1.0,
            (_, 0) => f32::INFINITY,
            (b, d) => b as f32 / d as f32,
        }
    }

    pub fn reset(&mut self) {
        self.current = Stats::default();
        self.history.clear();
        self.last_sample = 0.0;
        self.births_checkpoint = 0;
        self.deaths_checkpoint = 0;
    }

    pub fn summary(&self) -> String {
        format!("{} | R:{:.2}", self.current.summary(), self.reproduction_ratio())
    }

    /// Save stats and history to JSON file
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load stats and history from JSON file
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Mean of `b / a` over consecutive pairs with `a > 0`
pub fn population_ratio(samples: &[usize]) -> f32 {
    let ratios: Vec<f32> = samples
        .windows(2)
        .filter(|w| w[0] > 0)
        .map(|w| w[1] as f32 / w[0] as f32)
        .collect();

    if ratios.is_empty() {
        1.0
    } else {
        ratios.iter().sum::<f32>() / ratios.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> StatisticsTracker {
        StatisticsTracker::new(&StatsConfig {
            sample_interval: 1.0,
            history_length: 4,
        })
    }

    fn counts(selfish: usize, cooperative: usize) -> BehaviorTable<usize> {
        BehaviorTable {
            selfish,
            cooperative,
            ..Default::default()
        }
    }

    #[test]
    fn test_samples_once_per_interval() {
        let mut t = tracker();
        assert!(!t.update(0.5, counts(1, 1)));
        assert_eq!(t.stats().total_population, 2);
        assert!(t.update(1.0, counts(2, 1)));
        assert!(!t.update(1.5, counts(2, 1)));
        assert!(t.update(2.0, counts(2, 2)));
        assert_eq!(t.history_len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut t = tracker();
        for i in 1..=10 {
            t.update(i as f64, counts(i, 0));
        }
        assert_eq!(t.history_len(), 4);
        assert_eq!(t.population_series()[0], (7.0, 7));
        assert_eq!(t.behavior_series(BehaviorKind::Selfish).last(), Some(&(10.0, 10)));
    }

    #[test]
    fn test_ratio_defaults_and_skips_zero() {
        assert_eq!(population_ratio(&[]), 1.0);
        assert_eq!(population_ratio(&[5]), 1.0);
        assert_eq!(population_ratio(&[0, 4]), 1.0);
        assert_eq!(population_ratio(&[10, 20, 0, 5]), 1.0);
        assert_eq!(population_ratio(&[10, 20, 10]), 1.25);
    }

    #[test]
    fn test_reproduction_ratio_uses_last_samples() {
        let mut t = StatisticsTracker::new(&StatsConfig::default());
        for (i, pop) in [100, 1, 2, 2, 2, 2].iter().enumerate() {
            t.update(i as f64 + 1.0, counts(*pop, 0));
        }
        // only the last five samples count: 1, 2, 2, 2, 2
        assert_eq!(t.reproduction_ratio(), 1.25);
    }

    #[test]
    fn test_birth_death_ratio() {
        let mut t = tracker();
        assert_eq!(t.birth_death_ratio(), 1.0);
        t.record_births(3);
        assert_eq!(t.birth_death_ratio(), f32::INFINITY);
        t.record_births(2);
        t.record_deaths(4);
        assert_eq!(t.birth_death_ratio(), 0.5);
        assert_eq!(t.stats().births, 5);
    }

    #[test]
    fn test_behavior_percentage() {
        let mut t = tracker();
        assert_eq!(t.behavior_percentage(BehaviorKind::Selfish), 0.0);
        t.update(1.0, counts(1, 3));
        assert_eq!(t.behavior_percentage(BehaviorKind::Cooperative), 75.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut t = tracker();
        t.update(1.0, counts(2, 2));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        t.save_json(&path).unwrap();

        let loaded = StatisticsTracker::load_json(&path).unwrap();
        assert_eq!(loaded.stats(), t.stats());
        assert_eq!(loaded.history_len(), 1);
    }
}

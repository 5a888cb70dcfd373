//! Time-bounded recollection of past interactions.

use crate::organism::OrganismId;
use std::collections::HashMap;

/// Outcome of the most recent interaction with one partner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recollection {
    pub was_positive: bool,
    /// Simulation clock (seconds) when the interaction happened
    pub timestamp: f64,
}

/// Memory keyed by partner identity.
///
/// Entries older than `duration` seconds are invisible to [`recall`](Self::recall)
/// and are evicted on the next write, unless unlimited memory is enabled.
#[derive(Debug, Clone)]
pub struct InteractionMemory {
    entries: HashMap<OrganismId, Recollection>,
    duration: f64,
    unlimited: bool,
}

impl InteractionMemory {
    pub fn new(duration: f64) -> Self {
        Self {
            entries: HashMap::new(),
            duration,
            unlimited: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn set_unlimited(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
    }

    /// Record the outcome of an interaction with `partner`
    pub fn remember(&mut self, partner: OrganismId, was_positive: bool, now: f64) {
        self.entries.insert(
            partner,
            Recollection {
                was_positive,
                timestamp: now,
            },
        );

        if !self.unlimited {
            self.evict_expired(now);
        }
    }

    /// Last interaction with `partner`, if it has not expired
    pub fn recall(&self, partner: OrganismId, now: f64) -> Option<Recollection> {
        self.entries
            .get(&partner)
            .copied()
            .filter(|r| self.unlimited || !self.is_expired(r, now))
    }

    /// Whether a live memory of `partner` exists
    #[inline]
    pub fn knows(&self, partner: OrganismId, now: f64) -> bool {
        self.recall(partner, now).is_some()
    }

    /// Drop every entry older than the memory duration
    pub fn evict_expired(&mut self, now: f64) {
        if self.unlimited {
            return;
        }
        let duration = self.duration;
        self.entries.retain(|_, r| now - r.timestamp <= duration);
    }

    #[inline]
    fn is_expired(&self, r: &Recollection, now: f64) -> bool {
        now - r.timestamp > self.duration
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! The five fixed social policies.

use super::{Interaction, InteractionMemory, Profile};
use rand::Rng;

/// Nearest entity by squared planar distance; the first one wins ties
pub(crate) fn nearest<'n, I>(me: &Profile, candidates: I) -> Option<&'n Profile>
where
    I: IntoIterator<Item = &'n Profile>,
{
    let mut best: Option<(&'n Profile, f32)> = None;
    for candidate in candidates {
        let d = me.position.distance_squared(candidate.position);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((candidate, d)),
        }
    }
    best.map(|(p, _)| p)
}

pub(crate) fn random_pick<'n, R: Rng + ?Sized>(nearby: &'n [Profile], rng: &mut R) -> Option<&'n Profile> {
    if nearby.is_empty() {
        None
    } else {
        Some(&nearby[rng.gen_range(0..nearby.len())])
    }
}

// Aggressive

pub(super) fn select_aggressive<'n>(me: &Profile, nearby: &'n [Profile]) -> Option<&'n Profile> {
    let weaker = nearest(
        me,
        nearby.iter().filter(|p| p.energy < me.energy || p.size < me.size),
    );
    weaker.or_else(|| nearest(me, nearby))
}

pub(super) fn interact_aggressive(target: &Profile, memory: &mut InteractionMemory, now: f64) -> Interaction {
    let stolen = (target.energy * 0.2).min(10.0);
    memory.remember(target.id, false, now);
    Interaction::take(stolen)
}

// Altruistic

const NEEDS_HELP_BELOW: f32 = 50.0;
const CAN_HELP_ABOVE: f32 = 30.0;

pub(super) fn select_altruistic<'n>(me: &Profile, nearby: &'n [Profile]) -> Option<&'n Profile> {
    let mut neediest: Option<&'n Profile> = None;
    for p in nearby.iter().filter(|p| p.energy < NEEDS_HELP_BELOW) {
        if neediest.map_or(true, |n| p.energy < n.energy) {
            neediest = Some(p);
        }
    }
    neediest.or_else(|| nearest(me, nearby))
}

pub(super) fn interact_altruistic(
    me: &Profile,
    target: &Profile,
    memory: &mut InteractionMemory,
    now: f64,
) -> Interaction {
    if me.energy <= CAN_HELP_ABOVE {
        return Interaction::NONE;
    }
    let shared = (me.energy * 0.15).min(10.0);
    memory.remember(target.id, true, now);
    Interaction::give(shared, shared)
}

// Cooperative

const COOPERATIVE_EXCHANGE: f32 = 8.0;
const COOPERATIVE_COST_FACTOR: f32 = 0.7;

pub(super) fn select_cooperative<'n>(
    me: &Profile,
    nearby: &'n [Profile],
    memory: &InteractionMemory,
    now: f64,
) -> Option<&'n Profile> {
    nearest(me, nearby.iter().filter(|p| p.kind == me.kind))
        .or_else(|| {
            nearest(
                me,
                nearby
                    .iter()
                    .filter(|p| memory.recall(p.id, now).map_or(false, |r| r.was_positive)),
            )
        })
        .or_else(|| nearest(me, nearby))
}

pub(super) fn interact_cooperative(target: &Profile, memory: &mut InteractionMemory, now: f64) -> Interaction {
    memory.remember(target.id, true, now);
    Interaction::give(COOPERATIVE_EXCHANGE * COOPERATIVE_COST_FACTOR, COOPERATIVE_EXCHANGE)
}

// Selfish

pub(super) fn select_selfish(nearby: &[Profile]) -> Option<&Profile> {
    let mut richest: Option<&Profile> = None;
    for p in nearby {
        if richest.map_or(true, |r| p.energy > r.energy) {
            richest = Some(p);
        }
    }
    richest
}

pub(super) fn interact_selfish(target: &Profile, memory: &mut InteractionMemory, now: f64) -> Interaction {
    let taken = (target.energy * 0.1).min(5.0);
    memory.remember(target.id, false, now);
    Interaction::take(taken)
}

// Tit-for-tat

const TIT_FOR_TAT_SHARE: f32 = 5.0;

pub(super) fn select_tit_for_tat<'n, R: Rng + ?Sized>(
    me: &Profile,
    nearby: &'n [Profile],
    memory: &InteractionMemory,
    now: f64,
    rng: &mut R,
) -> Option<&'n Profile> {
    nearest(me, nearby.iter().filter(|p| memory.knows(p.id, now))).or_else(|| random_pick(nearby, rng))
}

pub(super) fn interact_tit_for_tat(target: &Profile, memory: &mut InteractionMemory, now: f64) -> Interaction {
    let cooperate = memory.recall(target.id, now).map_or(true, |r| r.was_positive);

    if cooperate {
        memory.remember(target.id, true, now);
        Interaction::give(TIT_FOR_TAT_SHARE, TIT_FOR_TAT_SHARE)
    } else {
        let taken = (target.energy * 0.15).min(8.0);
        memory.remember(target.id, false, now);
        Interaction::take(taken)
    }
}

//! Swiss pairing.
//!
//! Players are ranked by score, then seed. With an odd count one player sits
//! out with a bye, picked among those who never had one, preferring the
//! longest run of same-colored games. The rest are paired top-down: each
//! player takes a fresh opponent if one remains, preferably one whose last
//! color differs, and among those the one whose color imbalance cancels
//! theirs best.

use arena_core::PlayerId;
use chess_core::Color;

use crate::competition::Entrant;
use crate::standings::{Standing, StandingsLedger};

/// One slot of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    Game { white: PlayerId, black: PlayerId },
    Bye(PlayerId),
}

impl Pairing {
    pub fn players(&self) -> Vec<PlayerId> {
        match *self {
            Self::Game { white, black } => vec![white, black],
            Self::Bye(player) => vec![player],
        }
    }
}

/// Lexicographic cost of one color assignment; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ColorCost {
    /// How far either player ends up beyond +/-1.
    excess: u32,
    /// Players who would repeat their last color.
    repeats: u32,
    /// Sum of both players' absolute imbalance afterwards.
    combined: u32,
    /// Absolute imbalance of the pair taken together.
    total: u32,
}

fn color_cost(white: &Standing, black: &Standing) -> ColorCost {
    let w = white.imbalance() + 1;
    let b = black.imbalance() - 1;
    let excess = |x: i32| x.unsigned_abs().saturating_sub(1);
    let repeats = u32::from(white.last_color() == Some(Color::White))
        + u32::from(black.last_color() == Some(Color::Black));
    ColorCost {
        excess: excess(w) + excess(b),
        repeats,
        combined: w.unsigned_abs() + b.unsigned_abs(),
        total: (w + b).unsigned_abs(),
    }
}

/// Decide who plays white. `first` is the higher-ranked player and keeps
/// white when both orders cost the same.
pub fn assign_colors(
    first: PlayerId,
    second: PlayerId,
    standings: &StandingsLedger,
) -> (PlayerId, PlayerId) {
    let blank = Standing::default();
    let a = standings.get(first).unwrap_or(&blank);
    let b = standings.get(second).unwrap_or(&blank);
    if color_cost(a, b) <= color_cost(b, a) {
        (first, second)
    } else {
        (second, first)
    }
}

/// Entrants ordered by score (high first), then seed.
fn ranking(entrants: &[Entrant], standings: &StandingsLedger) -> Vec<PlayerId> {
    let mut order: Vec<&Entrant> = entrants.iter().collect();
    order.sort_by(|a, b| {
        standings
            .score(b.player)
            .total_cmp(&standings.score(a.player))
            .then(a.seed.cmp(&b.seed))
    });
    order.into_iter().map(|e| e.player).collect()
}

fn pick_bye(order: &[PlayerId], standings: &StandingsLedger) -> Option<usize> {
    let blank = Standing::default();
    let standing = |p: PlayerId| standings.get(p).unwrap_or(&blank);

    let fresh: Vec<usize> = (0..order.len())
        .filter(|&i| !standing(order[i]).had_bye)
        .collect();
    let pool = if fresh.is_empty() {
        (0..order.len()).collect()
    } else {
        fresh
    };
    // Longest streak wins; among equals the lowest ranked.
    pool.into_iter()
        .max_by_key(|&i| (standing(order[i]).color_streak(), i))
}

fn pick_opponent(first: PlayerId, pool: &[PlayerId], standings: &StandingsLedger) -> usize {
    let blank = Standing::default();
    let standing = |p: PlayerId| standings.get(p).unwrap_or(&blank);
    let me = standing(first);

    let all: Vec<usize> = (0..pool.len()).collect();
    let fresh: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| !me.has_played(pool[i]))
        .collect();
    let candidates = if fresh.is_empty() { all } else { fresh };

    let alternating: Vec<usize> = match me.last_color() {
        Some(last) => candidates
            .iter()
            .copied()
            .filter(|&i| standing(pool[i]).last_color() != Some(last))
            .collect(),
        None => Vec::new(),
    };
    let candidates = if alternating.is_empty() {
        candidates
    } else {
        alternating
    };

    candidates
        .into_iter()
        .min_by_key(|&i| {
            let other = standing(pool[i]);
            let offset = (me.imbalance() + other.imbalance()).unsigned_abs();
            let cost = color_cost(me, other).min(color_cost(other, me));
            (offset, cost.combined, i)
        })
        .unwrap_or(0)
}

/// Pair one Swiss round. A bye, if any, comes last.
pub fn pair_round(entrants: &[Entrant], standings: &StandingsLedger) -> Vec<Pairing> {
    let mut pool = ranking(entrants, standings);
    let mut pairings = Vec::with_capacity(pool.len() / 2 + 1);

    let bye = if pool.len() % 2 == 1 {
        pick_bye(&pool, standings).map(|i| pool.remove(i))
    } else {
        None
    };

    while pool.len() >= 2 {
        let first = pool.remove(0);
        let idx = pick_opponent(first, &pool, standings);
        let second = pool.remove(idx);
        let (white, black) = assign_colors(first, second, standings);
        pairings.push(Pairing::Game { white, black });
    }

    if let Some(player) = bye {
        pairings.push(Pairing::Bye(player));
    }
    pairings
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod pairing_tests;

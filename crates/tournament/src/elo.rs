//! Elo rating calculation

use arena_core::PlayerId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// K-factor for competition rating updates (higher = more volatile)
pub const K_FACTOR: f64 = 20.0;

/// Expected score of a player rated `rating` against `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((opponent - rating) / 400.0))
}

/// A finished game as the rating replay sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedGame {
    pub white: PlayerId,
    pub black: PlayerId,
    /// 1, 0.5 or 0 from white's point of view.
    pub white_score: f64,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloCalculator {
    k_factor: f64,
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self::new(K_FACTOR)
    }
}

impl EloCalculator {
    pub fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Ratings of white and black after one game, rounded to whole points.
    pub fn calculate(
        &self,
        white: i32,
        black: i32,
        white_score: f64,
        black_score: f64,
    ) -> (i32, i32) {
        let (w, b) = (f64::from(white), f64::from(black));
        let white_after = w + self.k_factor * (white_score - expected_score(w, b));
        let black_after = b + self.k_factor * (black_score - expected_score(b, w));
        (white_after.round() as i32, black_after.round() as i32)
    }

    /// Replay `games` oldest first, starting from `ratings`, and return each
    /// player's net change. Players missing from `ratings` start at
    /// `default_rating`.
    pub fn replay(
        &self,
        ratings: &HashMap<PlayerId, i32>,
        games: &[RatedGame],
        default_rating: i32,
    ) -> HashMap<PlayerId, i32> {
        let mut ordered: Vec<&RatedGame> = games.iter().collect();
        ordered.sort_by_key(|g| g.finished_at);

        let mut current = ratings.clone();
        for game in ordered {
            let white = *current.entry(game.white).or_insert(default_rating);
            let black = *current.entry(game.black).or_insert(default_rating);
            let (white_after, black_after) =
                self.calculate(white, black, game.white_score, 1.0 - game.white_score);
            current.insert(game.white, white_after);
            current.insert(game.black, black_after);
        }

        current
            .into_iter()
            .map(|(player, after)| {
                let before = ratings.get(&player).copied().unwrap_or(default_rating);
                (player, after - before)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "elo_tests.rs"]
mod elo_tests;

//! Per-player standings within one competition.

use arena_core::{LeaderboardEntry, PlayerId};
use chess_core::Color;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Score and pairing history of one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Wins + 0.5 * draws, byes included.
    pub score: f64,
    /// Colors played, oldest first.
    pub colors: Vec<Color>,
    pub white_games: u32,
    pub black_games: u32,
    pub opponents: BTreeSet<PlayerId>,
    pub had_bye: bool,
    /// Buchholz: sum of the opponents' scores.
    pub tiebreak: f64,
}

impl Standing {
    /// Whites minus blacks.
    pub fn imbalance(&self) -> i32 {
        self.white_games as i32 - self.black_games as i32
    }

    pub fn last_color(&self) -> Option<Color> {
        self.colors.last().copied()
    }

    /// Length of the run of identical colors at the end of the history.
    pub fn color_streak(&self) -> usize {
        match self.last_color() {
            Some(last) => self.colors.iter().rev().take_while(|c| **c == last).count(),
            None => 0,
        }
    }

    pub fn has_played(&self, opponent: PlayerId) -> bool {
        self.opponents.contains(&opponent)
    }

    fn record_color(&mut self, color: Color, opponent: PlayerId) {
        self.colors.push(color);
        match color {
            Color::White => self.white_games += 1,
            Color::Black => self.black_games += 1,
        }
        self.opponents.insert(opponent);
    }
}

/// Standings of every enrolled player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingsLedger {
    entries: HashMap<PlayerId, Standing>,
}

impl StandingsLedger {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            entries: players.into_iter().map(|p| (p, Standing::default())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, player: PlayerId) -> Option<&Standing> {
        self.entries.get(&player)
    }

    pub fn score(&self, player: PlayerId) -> f64 {
        self.entries.get(&player).map_or(0.0, |s| s.score)
    }

    fn entry(&mut self, player: PlayerId) -> &mut Standing {
        self.entries.entry(player).or_default()
    }

    /// Colors and opponents are fixed as soon as a pairing is published.
    pub fn record_pairing(&mut self, white: PlayerId, black: PlayerId) {
        self.entry(white).record_color(Color::White, black);
        self.entry(black).record_color(Color::Black, white);
    }

    /// A bye counts as a win.
    pub fn record_bye(&mut self, player: PlayerId) {
        let standing = self.entry(player);
        standing.score += 1.0;
        standing.had_bye = true;
    }

    pub fn record_result(&mut self, white: PlayerId, black: PlayerId, white_score: f64) {
        self.entry(white).score += white_score;
        self.entry(black).score += 1.0 - white_score;
    }

    /// Recompute every Buchholz tiebreak from current scores.
    pub fn refresh_tiebreaks(&mut self) {
        let scores: HashMap<PlayerId, f64> =
            self.entries.iter().map(|(p, s)| (*p, s.score)).collect();
        for standing in self.entries.values_mut() {
            standing.tiebreak = standing
                .opponents
                .iter()
                .filter_map(|o| scores.get(o))
                .sum();
        }
    }

    /// Ranked by score, then rating, then player id.
    pub fn leaderboard(&self, ratings: &HashMap<PlayerId, i32>) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<(PlayerId, &Standing, i32)> = self
            .entries
            .iter()
            .map(|(p, s)| (*p, s, ratings.get(p).copied().unwrap_or_default()))
            .collect();
        rows.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(Ordering::Equal)
                .then(b.2.cmp(&a.2))
                .then(a.0.cmp(&b.0))
        });

        rows.into_iter()
            .enumerate()
            .map(|(i, (player, standing, rating))| LeaderboardEntry {
                rank: i as u32 + 1,
                player,
                score: standing.score,
                rating,
                tiebreak: standing.tiebreak,
            })
            .collect()
    }
}

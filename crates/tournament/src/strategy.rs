//! How a competition moves from round to round.

use arena_core::{ArenaError, CompetitionStatus, LeaderboardEntry, PlayerId, Result};
use arena_runner::MatchCompletion;
use std::collections::HashMap;

use crate::competition::{Competition, Round};
use crate::elo::EloCalculator;
use crate::pairing::{assign_colors, pair_round, Pairing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    NextRound,
    Finish,
}

/// Snapshot taken when every game of a round is in.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundCompletion {
    pub round: u32,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub next: RoundStep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishSummary {
    /// Leaderboard leader; provisional until reviewed.
    pub winner: Option<PlayerId>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Net rating change per player, unchanged players left out.
    pub rating_changes: Vec<(PlayerId, i32)>,
}

/// Round scheduling for one competition format.
///
/// Only [`pairings`](Self::pairings) differs between formats by default;
/// the other hooks share one implementation.
pub trait CompetitionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pairings for the next round.
    fn pairings(&self, competition: &Competition) -> Result<Vec<Pairing>>;

    /// Pair and publish the next round.
    fn start_round<'c>(&self, competition: &'c mut Competition) -> Result<&'c Round> {
        if competition.status != CompetitionStatus::Started {
            return Err(ArenaError::conflict(format!(
                "competition {} is not running",
                competition.id
            )));
        }
        if !competition.has_more_rounds() {
            return Err(ArenaError::conflict(format!(
                "competition {} has played all {} rounds",
                competition.id, competition.total_rounds
            )));
        }
        if competition.current_round > 0 && !competition.round_complete() {
            return Err(ArenaError::conflict(format!(
                "round {} of competition {} is still running",
                competition.current_round, competition.id
            )));
        }
        let pairings = self.pairings(competition)?;
        Ok(competition.open_round(pairings))
    }

    /// Record a finished game. Returns `false` when it was already known.
    fn handle_match_completion(
        &self,
        competition: &mut Competition,
        completion: &MatchCompletion,
    ) -> Result<bool> {
        competition.record_result(
            completion.match_id,
            Some(completion.outcome),
            completion.finished_at,
        )
    }

    /// `None` while games of the current round are still running.
    fn handle_round_completion(&self, competition: &mut Competition) -> Option<RoundCompletion> {
        if !competition.round_complete() {
            return None;
        }
        let next = if competition.has_more_rounds() {
            RoundStep::NextRound
        } else {
            RoundStep::Finish
        };
        Some(RoundCompletion {
            round: competition.current_round,
            leaderboard: competition.leaderboard(),
            next,
        })
    }

    /// Replay every decided game through Elo from `ratings` and close the
    /// competition.
    fn finish(
        &self,
        competition: &mut Competition,
        ratings: &HashMap<PlayerId, i32>,
        elo: &EloCalculator,
        default_rating: i32,
    ) -> FinishSummary {
        let deltas = elo.replay(ratings, &competition.decided_games(), default_rating);
        let mut rating_changes: Vec<(PlayerId, i32)> =
            deltas.into_iter().filter(|(_, d)| *d != 0).collect();
        rating_changes.sort();

        let leaderboard = competition.leaderboard();
        competition.status = CompetitionStatus::Finished;
        FinishSummary {
            winner: leaderboard.first().map(|e| e.player),
            leaderboard,
            rating_changes,
        }
    }
}

/// A single game between the only two entrants.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePairing;

impl CompetitionStrategy for SinglePairing {
    fn name(&self) -> &'static str {
        "single_pairing"
    }

    fn pairings(&self, competition: &Competition) -> Result<Vec<Pairing>> {
        let [first, second] = competition.entrants.as_slice() else {
            return Err(ArenaError::validation(format!(
                "a single pairing needs exactly two players, competition {} has {}",
                competition.id,
                competition.entrants.len()
            )));
        };
        let (white, black) = assign_colors(first.player, second.player, &competition.standings);
        Ok(vec![Pairing::Game { white, black }])
    }

    fn handle_round_completion(&self, competition: &mut Competition) -> Option<RoundCompletion> {
        if !competition.round_complete() {
            return None;
        }
        Some(RoundCompletion {
            round: competition.current_round,
            leaderboard: competition.leaderboard(),
            next: RoundStep::Finish,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Swiss;

impl CompetitionStrategy for Swiss {
    fn name(&self) -> &'static str {
        "swiss"
    }

    fn pairings(&self, competition: &Competition) -> Result<Vec<Pairing>> {
        if competition.entrants.len() < 2 {
            return Err(ArenaError::validation(format!(
                "competition {} needs at least two players",
                competition.id
            )));
        }
        Ok(pair_round(&competition.entrants, &competition.standings))
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod strategy_tests;

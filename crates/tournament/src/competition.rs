//! Competition model: enrollment, seeding, rounds and results.
//!
//! A [`Competition`] is plain data; the async service owns one behind a
//! mutex and drives it through a [`crate::CompetitionStrategy`].

use arena_core::{
    ArenaConfig, ArenaError, CompetitionId, CompetitionRecord, CompetitionStatus, GameMode,
    GameOutcome, LeaderboardEntry, MatchId, PairingSummary, PlayerId, RatingBucket, Result,
    TimeControl,
};
use arena_runner::{Variant, VariantMeta};
use chrono::{DateTime, Utc};
use chess_core::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::elo::RatedGame;
use crate::pairing::Pairing;
use crate::standings::StandingsLedger;
use crate::strategy::{CompetitionStrategy, SinglePairing, Swiss};

/// An enrolled player as seeded at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub player: PlayerId,
    pub rating: i32,
    /// 1 = highest rating.
    pub seed: u32,
}

/// A pairing inside a round. Byes carry no match id and no black player.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionMatch {
    pub match_id: Option<MatchId>,
    pub white: PlayerId,
    pub black: Option<PlayerId>,
    pub completed: bool,
    /// `None` for byes and for games that could not be started.
    pub result: Option<GameOutcome>,
    pub winner: Option<PlayerId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompetitionMatch {
    pub fn is_bye(&self) -> bool {
        self.black.is_none()
    }

    fn game(white: PlayerId, black: PlayerId) -> Self {
        Self {
            match_id: Some(MatchId::new()),
            white,
            black: Some(black),
            completed: false,
            result: None,
            winner: None,
            completed_at: None,
        }
    }

    fn bye(player: PlayerId) -> Self {
        Self {
            match_id: None,
            white: player,
            black: None,
            completed: true,
            result: None,
            winner: Some(player),
            completed_at: Some(Utc::now()),
        }
    }

    fn summary(&self) -> PairingSummary {
        PairingSummary {
            match_id: self.match_id,
            white: self.white,
            black: self.black,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// 1-based.
    pub number: u32,
    pub matches: Vec<CompetitionMatch>,
}

impl Round {
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(|m| m.completed)
    }

    pub fn summaries(&self) -> Vec<PairingSummary> {
        self.matches.iter().map(CompetitionMatch::summary).collect()
    }

    /// Games that still need a live match.
    pub fn pending_games(&self) -> impl Iterator<Item = (MatchId, PlayerId, PlayerId)> + '_ {
        self.matches.iter().filter(|m| !m.completed).filter_map(|m| {
            let id = m.match_id?;
            let black = m.black?;
            Some((id, m.white, black))
        })
    }
}

/// How rounds are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionFormat {
    /// One game between two players.
    SinglePairing,
    Swiss,
}

impl CompetitionFormat {
    pub fn for_meta(meta: &VariantMeta) -> Self {
        if meta.is_special_game() {
            Self::SinglePairing
        } else {
            Self::Swiss
        }
    }

    pub fn strategy(self) -> &'static dyn CompetitionStrategy {
        static SINGLE: SinglePairing = SinglePairing;
        static SWISS: Swiss = Swiss;
        match self {
            Self::SinglePairing => &SINGLE,
            Self::Swiss => &SWISS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub mode: GameMode,
    pub time_control: TimeControl,
    pub format: CompetitionFormat,
    pub meta: VariantMeta,
    pub status: CompetitionStatus,
    /// Enrollment order; fixed once the competition starts.
    pub players: Vec<PlayerId>,
    /// Empty until the competition starts.
    pub entrants: Vec<Entrant>,
    /// Rounds started so far; 0 before the first one.
    pub current_round: u32,
    pub total_rounds: u32,
    pub standings: StandingsLedger,
    pub rounds: Vec<Round>,
}

impl Competition {
    pub fn new(
        id: CompetitionId,
        name: impl Into<String>,
        mode: GameMode,
        time_control: TimeControl,
        config: &ArenaConfig,
    ) -> Self {
        let meta = Variant::meta_for(mode);
        let format = CompetitionFormat::for_meta(&meta);
        let total_rounds = match format {
            CompetitionFormat::SinglePairing => 1,
            CompetitionFormat::Swiss => config
                .competition
                .swiss_rounds
                .unwrap_or(meta.default_rounds)
                .max(1),
        };
        Self {
            id,
            name: name.into(),
            mode,
            time_control,
            format,
            meta,
            status: CompetitionStatus::Pending,
            players: Vec::new(),
            entrants: Vec::new(),
            current_round: 0,
            total_rounds,
            standings: StandingsLedger::default(),
            rounds: Vec::new(),
        }
    }

    pub fn bucket(&self) -> RatingBucket {
        RatingBucket::new(self.mode, self.time_control)
    }

    pub fn strategy(&self) -> &'static dyn CompetitionStrategy {
        self.format.strategy()
    }

    pub fn record(&self) -> CompetitionRecord {
        CompetitionRecord {
            id: self.id,
            name: self.name.clone(),
            mode: self.mode,
            time_control: self.time_control,
            status: self.status,
            players: self.players.clone(),
            current_round: self.current_round,
            total_rounds: self.total_rounds,
            winner: None,
            leaderboard: Vec::new(),
        }
    }

    pub fn is_enrolled(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn enroll(&mut self, player: PlayerId) -> Result<()> {
        if self.status != CompetitionStatus::Pending {
            return Err(ArenaError::conflict(format!(
                "competition {} has already started",
                self.id
            )));
        }
        if self.is_enrolled(player) {
            return Err(ArenaError::conflict(format!(
                "player {player} is already enrolled"
            )));
        }
        if self.players.len() >= self.meta.max_players {
            return Err(ArenaError::validation(format!(
                "competition {} is full ({} players)",
                self.id, self.meta.max_players
            )));
        }
        self.players.push(player);
        Ok(())
    }

    pub fn withdraw(&mut self, player: PlayerId) -> Result<()> {
        if self.status != CompetitionStatus::Pending {
            return Err(ArenaError::conflict(format!(
                "competition {} has already started",
                self.id
            )));
        }
        let before = self.players.len();
        self.players.retain(|p| *p != player);
        if self.players.len() == before {
            return Err(ArenaError::validation(format!("player {player} is not enrolled")));
        }
        Ok(())
    }

    /// Players needed to start, never fewer than two.
    pub fn min_players(&self, config: &ArenaConfig) -> usize {
        config.competition.min_players.max(self.meta.min_players).max(2)
    }

    /// Seed by rating (highest first, ties by id) and open the ledger.
    pub fn seed(&mut self, ratings: &HashMap<PlayerId, i32>) {
        let mut rated: Vec<(PlayerId, i32)> = self
            .players
            .iter()
            .map(|p| (*p, ratings.get(p).copied().unwrap_or_default()))
            .collect();
        rated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        self.entrants = rated
            .into_iter()
            .enumerate()
            .map(|(i, (player, rating))| Entrant {
                player,
                rating,
                seed: i as u32 + 1,
            })
            .collect();
        self.standings = StandingsLedger::new(self.players.iter().copied());
    }

    pub fn seed_ratings(&self) -> HashMap<PlayerId, i32> {
        self.entrants.iter().map(|e| (e.player, e.rating)).collect()
    }

    pub fn round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn has_more_rounds(&self) -> bool {
        self.current_round < self.total_rounds
    }

    /// Publish a round: colors, opponents and byes go into the ledger now.
    pub(crate) fn open_round(&mut self, pairings: Vec<Pairing>) -> &Round {
        let mut matches = Vec::with_capacity(pairings.len());
        for pairing in pairings {
            match pairing {
                Pairing::Game { white, black } => {
                    self.standings.record_pairing(white, black);
                    matches.push(CompetitionMatch::game(white, black));
                }
                Pairing::Bye(player) => {
                    self.standings.record_bye(player);
                    matches.push(CompetitionMatch::bye(player));
                }
            }
        }
        self.current_round += 1;
        self.rounds.push(Round {
            number: self.current_round,
            matches,
        });
        &self.rounds[self.rounds.len() - 1]
    }

    fn find_match_mut(&mut self, match_id: MatchId) -> Option<(u32, &mut CompetitionMatch)> {
        self.rounds.iter_mut().find_map(|round| {
            let number = round.number;
            round
                .matches
                .iter_mut()
                .find(|m| m.match_id == Some(match_id))
                .map(|m| (number, m))
        })
    }

    /// Record the result of a game in the current round. Returns `false`
    /// for a game that was already recorded or belongs to an older round.
    pub fn record_result(
        &mut self,
        match_id: MatchId,
        outcome: Option<GameOutcome>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let current = self.current_round;
        let (number, game) = self
            .find_match_mut(match_id)
            .ok_or_else(|| ArenaError::not_found("competition match", match_id))?;
        if game.completed || number != current {
            return Ok(false);
        }
        let white = game.white;
        let Some(black) = game.black else {
            return Ok(false);
        };

        game.completed = true;
        game.completed_at = Some(at);
        game.result = outcome;
        game.winner = outcome.and_then(|o| o.winner).map(|c| match c {
            Color::White => white,
            Color::Black => black,
        });
        if let Some(outcome) = outcome {
            self.standings
                .record_result(white, black, outcome.score_for(Color::White));
        }
        Ok(true)
    }

    pub fn round_complete(&self) -> bool {
        self.round().is_some_and(Round::is_complete)
    }

    /// Every game with a result, oldest first.
    pub fn decided_games(&self) -> Vec<RatedGame> {
        let mut games: Vec<RatedGame> = self
            .rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .filter_map(|m| {
                let black = m.black?;
                let outcome = m.result?;
                Some(RatedGame {
                    white: m.white,
                    black,
                    white_score: outcome.score_for(Color::White),
                    finished_at: m.completed_at?,
                })
            })
            .collect();
        games.sort_by_key(|g| g.finished_at);
        games
    }

    pub fn leaderboard(&mut self) -> Vec<LeaderboardEntry> {
        self.standings.refresh_tiebreaks();
        self.standings.leaderboard(&self.seed_ratings())
    }
}

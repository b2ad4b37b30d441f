//! Event payloads handed to the broadcast gateway.
//!
//! The core only builds these values; how they reach clients is up to the
//! transport behind [`crate::Broadcaster`].

use chess_core::Color;
use serde::{Deserialize, Serialize};

use crate::ids::{CompetitionId, MatchId, PlayerId};
use crate::mode::{GameMode, TimeControl};
use crate::outcome::GameOutcome;

/// Who an event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Target {
    Player(PlayerId),
    /// Both players and spectators of one match.
    Match(MatchId),
    /// Everyone enrolled in a competition.
    Competition(CompetitionId),
    Everyone,
}

/// One row of a competition leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player: PlayerId,
    pub score: f64,
    pub rating: i32,
    pub tiebreak: f64,
}

/// A pairing as announced to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSummary {
    pub match_id: Option<MatchId>,
    pub white: PlayerId,
    /// `None` for a bye.
    pub black: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEvent {
    SearchQueued {
        player: PlayerId,
        queue_position: u32,
    },
    SearchCancelled {
        player: PlayerId,
    },
    MatchFound {
        match_id: MatchId,
        white: PlayerId,
        black: PlayerId,
        mode: GameMode,
        time_control: TimeControl,
    },
    MoveApplied {
        match_id: MatchId,
        uci: String,
        fen: String,
        side_to_move: Color,
        white_ms: u64,
        black_ms: u64,
        /// The mover keeps the turn for one more move.
        extra_turn: bool,
    },
    DrawOffered {
        match_id: MatchId,
        by: Color,
    },
    DrawDeclined {
        match_id: MatchId,
        by: Color,
    },
    UndoOffered {
        match_id: MatchId,
        by: Color,
    },
    MoveUndone {
        match_id: MatchId,
        fen: String,
    },
    GameOver {
        match_id: MatchId,
        outcome: GameOutcome,
    },
    CompetitionStarted {
        competition_id: CompetitionId,
        total_rounds: u32,
    },
    RoundStarted {
        competition_id: CompetitionId,
        round: u32,
        pairings: Vec<PairingSummary>,
    },
    LeaderboardUpdated {
        competition_id: CompetitionId,
        round: u32,
        entries: Vec<LeaderboardEntry>,
    },
    CompetitionFinished {
        competition_id: CompetitionId,
        winner: Option<PlayerId>,
        leaderboard: Vec<LeaderboardEntry>,
    },
}

impl ArenaEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchQueued { .. } => "search_queued",
            Self::SearchCancelled { .. } => "search_cancelled",
            Self::MatchFound { .. } => "match_found",
            Self::MoveApplied { .. } => "move_applied",
            Self::DrawOffered { .. } => "draw_offered",
            Self::DrawDeclined { .. } => "draw_declined",
            Self::UndoOffered { .. } => "undo_offered",
            Self::MoveUndone { .. } => "move_undone",
            Self::GameOver { .. } => "game_over",
            Self::CompetitionStarted { .. } => "competition_started",
            Self::RoundStarted { .. } => "round_started",
            Self::LeaderboardUpdated { .. } => "leaderboard_updated",
            Self::CompetitionFinished { .. } => "competition_finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ArenaEvent::DrawOffered {
            match_id: MatchId::new(),
            by: Color::White,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "draw_offered");
        assert_eq!(json["by"], "white");
        assert_eq!(event.name(), "draw_offered");
    }
}

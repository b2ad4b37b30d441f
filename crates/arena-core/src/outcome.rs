//! How a match ended.

use chess_core::Color;
use serde::{Deserialize, Serialize};

/// Reason a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Timeout,
    Resignation,
    DrawAgreement,
    FiftyMoveRule,
    InsufficientMaterial,
    ThreefoldRepetition,
    /// Third check delivered (three-check variant).
    ThreeChecks,
    /// King reached the centre (king-of-the-hill variant).
    KingOfTheHill,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::Timeout => "timeout",
            Self::Resignation => "resignation",
            Self::DrawAgreement => "draw_agreement",
            Self::FiftyMoveRule => "fifty_move_rule",
            Self::InsufficientMaterial => "insufficient_material",
            Self::ThreefoldRepetition => "threefold_repetition",
            Self::ThreeChecks => "three_checks",
            Self::KingOfTheHill => "king_of_the_hill",
        };
        f.write_str(s)
    }
}

/// Final result of a match: the winning color (`None` for a draw) and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Option<Color>,
    pub reason: EndReason,
}

impl GameOutcome {
    #[must_use]
    pub const fn win(winner: Color, reason: EndReason) -> Self {
        Self {
            winner: Some(winner),
            reason,
        }
    }

    #[must_use]
    pub const fn draw(reason: EndReason) -> Self {
        Self {
            winner: None,
            reason,
        }
    }

    #[must_use]
    pub const fn is_draw(&self) -> bool {
        self.winner.is_none()
    }

    /// Points scored by `color`: 1, 0.5 or 0.
    #[must_use]
    pub fn score_for(&self, color: Color) -> f64 {
        match self.winner {
            None => 0.5,
            Some(w) if w == color => 1.0,
            Some(_) => 0.0,
        }
    }
}

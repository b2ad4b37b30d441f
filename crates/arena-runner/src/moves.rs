//! Moves as seen by the match engine.

use chess_core::Move;
use serde::{Deserialize, Serialize};

/// Key naming which rule produced a move outside plain chess legality.
/// Upgrades claim moves by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Special {
    /// Chess960 castle, encoded king-takes-own-rook.
    Castle960,
    /// Two-square pawn advance away from the start rank.
    PawnDash,
    /// Slider leaping one friendly piece.
    PieceJump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameMove {
    pub mv: Move,
    pub special: Option<Special>,
}

impl GameMove {
    pub fn plain(mv: Move) -> Self {
        Self { mv, special: None }
    }

    pub fn special(mv: Move, special: Special) -> Self {
        Self {
            mv,
            special: Some(special),
        }
    }

    pub fn uci(&self) -> String {
        self.mv.to_string()
    }
}

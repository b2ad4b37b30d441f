//! Rule variants: board setup, move generation, application and extra
//! win conditions for one match.
//!
//! Every variant is a plain value; cloning one gives an independent copy
//! that can be played forward for previews or kept in an undo snapshot.

mod chess960;
mod king_of_the_hill;
mod standard;
mod three_check;

pub use chess960::Chess960;
pub use king_of_the_hill::KingOfTheHill;
pub use standard::Standard;
pub use three_check::ThreeCheck;

use arena_core::{GameMode, GameOutcome};
use chess_core::{legal_moves, Color, Position};
use rand::RngCore;

use crate::moves::GameMove;

/// Static facts a competition needs about a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantMeta {
    pub min_players: usize,
    pub max_players: usize,
    /// Rounds a competition in this variant runs by default.
    pub default_rounds: u32,
    /// Whether bare-material positions end in a draw.
    pub material_draws: bool,
}

impl VariantMeta {
    /// Played as a single game between two players.
    pub fn is_special_game(&self) -> bool {
        self.max_players == 2 && self.default_rounds == 1
    }
}

/// Behavior shared by every variant.
pub trait RuleSet {
    fn meta(&self) -> VariantMeta;

    /// Build the starting position, recording any per-game setup state.
    fn setup_board(&mut self, rng: &mut dyn RngCore) -> Position;

    /// Ordinary legal moves for the side to move.
    fn legal_moves(&self, pos: &Position) -> Vec<GameMove> {
        legal_moves(pos).into_iter().map(GameMove::plain).collect()
    }

    /// Moves only this variant allows, keyed by a special marker.
    fn special_moves(&self, _pos: &Position) -> Vec<GameMove> {
        Vec::new()
    }

    /// Apply a move that no upgrade claimed. Returns `false` without
    /// touching `pos` when the variant cannot apply it.
    fn apply_move(&mut self, pos: &mut Position, mv: &GameMove) -> bool {
        if mv.special.is_some() {
            return false;
        }
        pos.make_move(mv.mv);
        true
    }

    /// Observe a move after it was applied, whoever applied it.
    fn after_move(&mut self, _mv: &GameMove, _mover: Color, _pos: &Position) {}

    /// Variant-specific end of game, checked before checkmate/stalemate.
    fn outcome(&self, _pos: &Position) -> Option<GameOutcome> {
        None
    }
}

/// The variant a match is played under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Standard(Standard),
    Chess960(Chess960),
    KingOfTheHill(KingOfTheHill),
    ThreeCheck(ThreeCheck),
}

macro_rules! dispatch {
    ($self:ident, $v:ident => $body:expr) => {
        match $self {
            Variant::Standard($v) => $body,
            Variant::Chess960($v) => $body,
            Variant::KingOfTheHill($v) => $body,
            Variant::ThreeCheck($v) => $body,
        }
    };
}

impl Variant {
    pub fn for_mode(mode: GameMode) -> Self {
        match mode {
            GameMode::Standard => Self::Standard(Standard),
            GameMode::Chess960 => Self::Chess960(Chess960::default()),
            GameMode::KingOfTheHill => Self::KingOfTheHill(KingOfTheHill),
            GameMode::ThreeCheck => Self::ThreeCheck(ThreeCheck::default()),
        }
    }

    pub fn mode(&self) -> GameMode {
        match self {
            Self::Standard(_) => GameMode::Standard,
            Self::Chess960(_) => GameMode::Chess960,
            Self::KingOfTheHill(_) => GameMode::KingOfTheHill,
            Self::ThreeCheck(_) => GameMode::ThreeCheck,
        }
    }

    /// Metadata of a mode without building a game.
    pub fn meta_for(mode: GameMode) -> VariantMeta {
        Self::for_mode(mode).meta()
    }
}

impl RuleSet for Variant {
    fn meta(&self) -> VariantMeta {
        dispatch!(self, v => v.meta())
    }

    fn setup_board(&mut self, rng: &mut dyn RngCore) -> Position {
        dispatch!(self, v => v.setup_board(rng))
    }

    fn legal_moves(&self, pos: &Position) -> Vec<GameMove> {
        dispatch!(self, v => v.legal_moves(pos))
    }

    fn special_moves(&self, pos: &Position) -> Vec<GameMove> {
        dispatch!(self, v => v.special_moves(pos))
    }

    fn apply_move(&mut self, pos: &mut Position, mv: &GameMove) -> bool {
        dispatch!(self, v => v.apply_move(pos, mv))
    }

    fn after_move(&mut self, mv: &GameMove, mover: Color, pos: &Position) {
        dispatch!(self, v => v.after_move(mv, mover, pos))
    }

    fn outcome(&self, pos: &Position) -> Option<GameOutcome> {
        dispatch!(self, v => v.outcome(pos))
    }
}

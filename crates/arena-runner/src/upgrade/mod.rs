//! Upgrades: optional rule modifiers stacked on top of a variant.
//!
//! An upgrade can contribute extra legal moves, claim a move so that it
//! applies it instead of the variant, react after every applied move, and
//! override game-over detection. Upgrades run in the order they were
//! registered on the match.

mod check_bonus;
mod extra_turn;
mod pawn_dash;
mod piece_jump;

pub use check_bonus::CheckBonus;
pub use extra_turn::ExtraTurn;
pub use pawn_dash::PawnDash;
pub use piece_jump::PieceJump;

use arena_core::{GameOutcome, TimeControl, UpgradeConfig, UpgradeKind};
use chess_core::{Color, Position};
use std::fmt;

use crate::moves::GameMove;

/// State handed to [`Upgrade::after_move`].
pub struct AfterMove<'a> {
    pub pos: &'a mut Position,
    pub mover: Color,
    pub mv: GameMove,
    pub time_control: TimeControl,
    /// The game already ended with this move.
    pub game_over: bool,
    /// Milliseconds credited to the mover's clock on top of the increment.
    pub bonus_ms: u64,
}

impl AfterMove<'_> {
    /// Whether the move just played checks the opponent.
    pub fn gives_check(&self) -> bool {
        self.pos.in_check(self.mover.other())
    }
}

pub trait Upgrade: fmt::Debug + Send + Sync {
    fn kind(&self) -> UpgradeKind;

    /// Moves this upgrade makes legal for the side to move in `pos`.
    fn extra_moves(&self, _pos: &Position) -> Vec<GameMove> {
        Vec::new()
    }

    /// Whether this upgrade applies `mv` itself.
    fn claims(&self, _mv: &GameMove) -> bool {
        false
    }

    /// Apply a move previously claimed by this upgrade.
    fn apply_claimed(&mut self, pos: &mut Position, mv: &GameMove) {
        pos.make_move(mv.mv);
    }

    fn after_move(&mut self, _ctx: &mut AfterMove<'_>) {}

    fn outcome_override(&self, _pos: &Position) -> Option<GameOutcome> {
        None
    }

    fn box_clone(&self) -> Box<dyn Upgrade>;
}

impl Clone for Box<dyn Upgrade> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub fn build(kind: UpgradeKind, config: &UpgradeConfig) -> Box<dyn Upgrade> {
    match kind {
        UpgradeKind::CheckBonus => Box::new(CheckBonus::new(config.check_bonus_moves)),
        UpgradeKind::PawnDash => Box::new(PawnDash::new(config.pawn_dash_uses)),
        UpgradeKind::PieceJump => Box::new(PieceJump),
        UpgradeKind::ExtraTurn => Box::new(ExtraTurn::new(config.extra_turn_recharge)),
    }
}

/// Build upgrades in the given order.
pub fn build_all(kinds: &[UpgradeKind], config: &UpgradeConfig) -> Vec<Box<dyn Upgrade>> {
    kinds.iter().map(|&kind| build(kind, config)).collect()
}

#[cfg(test)]
#[path = "upgrade_tests.rs"]
mod upgrade_tests;

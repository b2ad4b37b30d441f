use arena_core::{EndReason, GameOutcome};
use chess_core::{Color, Position};
use rand::RngCore;

use super::{RuleSet, VariantMeta};
use crate::moves::GameMove;

pub const CHECKS_TO_WIN: u8 = 3;

/// Orthodox chess where the third check given wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreeCheck {
    checks: [u8; 2],
}

impl ThreeCheck {
    /// Checks given so far by `color`.
    pub fn checks_given(&self, color: Color) -> u8 {
        self.checks[color.idx()]
    }
}

impl RuleSet for ThreeCheck {
    fn meta(&self) -> VariantMeta {
        VariantMeta {
            min_players: 2,
            max_players: 2,
            default_rounds: 1,
            material_draws: false,
        }
    }

    fn setup_board(&mut self, _rng: &mut dyn RngCore) -> Position {
        self.checks = [0; 2];
        Position::startpos()
    }

    fn after_move(&mut self, _mv: &GameMove, mover: Color, pos: &Position) {
        if pos.in_check(mover.other()) {
            let given = &mut self.checks[mover.idx()];
            *given = given.saturating_add(1);
        }
    }

    fn outcome(&self, _pos: &Position) -> Option<GameOutcome> {
        Color::ALL
            .into_iter()
            .find(|&c| self.checks_given(c) >= CHECKS_TO_WIN)
            .map(|c| GameOutcome::win(c, EndReason::ThreeChecks))
    }
}

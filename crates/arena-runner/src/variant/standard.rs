use chess_core::Position;
use rand::RngCore;

use super::{RuleSet, VariantMeta};

/// Orthodox chess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Standard;

impl RuleSet for Standard {
    fn meta(&self) -> VariantMeta {
        VariantMeta {
            min_players: 2,
            max_players: 256,
            default_rounds: 5,
            material_draws: true,
        }
    }

    fn setup_board(&mut self, _rng: &mut dyn RngCore) -> Position {
        Position::startpos()
    }
}

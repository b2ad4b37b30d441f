use arena_core::{EndReason, GameOutcome};
use chess_core::{Color, PieceKind, Position, Square};
use rand::RngCore;

use super::{RuleSet, VariantMeta};

/// d4, e4, d5, e5.
pub const HILL: [Square; 4] = [27, 28, 35, 36];

/// Orthodox chess where a king reaching the centre wins on the spot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KingOfTheHill;

impl RuleSet for KingOfTheHill {
    fn meta(&self) -> VariantMeta {
        VariantMeta {
            min_players: 2,
            max_players: 2,
            default_rounds: 1,
            material_draws: false,
        }
    }

    fn setup_board(&mut self, _rng: &mut dyn RngCore) -> Position {
        Position::startpos()
    }

    fn outcome(&self, pos: &Position) -> Option<GameOutcome> {
        // The four hill squares are mutually adjacent, so at most one king
        // can stand on them.
        Color::ALL.into_iter().find_map(|color| {
            HILL.iter()
                .any(|&sq| {
                    pos.piece_at(sq)
                        .map(|pc| pc.color == color && pc.kind == PieceKind::King)
                        .unwrap_or(false)
                })
                .then(|| GameOutcome::win(color, EndReason::KingOfTheHill))
        })
    }
}

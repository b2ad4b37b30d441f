use arena_core::UpgradeKind;
use chess_core::{leaves_king_safe, ray, Move, Position};

use super::Upgrade;
use crate::moves::{GameMove, Special};

/// Bishops, rooks and queens may leap exactly one friendly piece and land
/// on the empty square right behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieceJump;

impl Upgrade for PieceJump {
    fn kind(&self) -> UpgradeKind {
        UpgradeKind::PieceJump
    }

    fn extra_moves(&self, pos: &Position) -> Vec<GameMove> {
        let color = pos.side_to_move;
        let mut out = Vec::new();
        for (from, pc) in pos.pieces(color) {
            if !pc.kind.is_slider() {
                continue;
            }
            for &dir in pc.kind.slide_dirs() {
                let mut walk = ray(from, dir).skip_while(|&s| pos.is_empty_at(s));
                let (Some(blocker), Some(landing)) = (walk.next(), walk.next()) else {
                    continue;
                };
                let friendly = pos.piece_at(blocker).map(|p| p.color == color).unwrap_or(false);
                if friendly && pos.is_empty_at(landing) {
                    out.push(Move::new(from, landing));
                }
            }
        }
        out.retain(|&mv| leaves_king_safe(pos, mv));
        out.into_iter()
            .map(|mv| GameMove::special(mv, Special::PieceJump))
            .collect()
    }

    fn claims(&self, mv: &GameMove) -> bool {
        mv.special == Some(Special::PieceJump)
    }

    fn box_clone(&self) -> Box<dyn Upgrade> {
        Box::new(*self)
    }
}

use arena_core::UpgradeKind;
use chess_core::{file_of, leaves_king_safe, rank_of, sq, Move, PieceKind, Position};

use super::Upgrade;
use crate::moves::{GameMove, Special};

const PROMOTIONS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// A limited number of two-square pawn advances from any rank but the
/// start rank, which already has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PawnDash {
    uses: [u32; 2],
}

impl PawnDash {
    pub fn new(uses: u32) -> Self {
        Self { uses: [uses; 2] }
    }

    pub fn uses_left(&self, color: chess_core::Color) -> u32 {
        self.uses[color.idx()]
    }
}

impl Upgrade for PawnDash {
    fn kind(&self) -> UpgradeKind {
        UpgradeKind::PawnDash
    }

    fn extra_moves(&self, pos: &Position) -> Vec<GameMove> {
        let color = pos.side_to_move;
        if self.uses[color.idx()] == 0 {
            return Vec::new();
        }
        let dir = color.forward();
        let mut out = Vec::new();
        for (from, pc) in pos.pieces(color) {
            let (f, r) = (file_of(from), rank_of(from));
            if pc.kind != PieceKind::Pawn || r == color.pawn_rank() {
                continue;
            }
            let (Some(mid), Some(to)) = (sq(f, r + dir), sq(f, r + 2 * dir)) else {
                continue;
            };
            if !pos.is_empty_at(mid) || !pos.is_empty_at(to) {
                continue;
            }
            if rank_of(to) == color.promotion_rank() {
                out.extend(PROMOTIONS.iter().map(|&pk| Move::new(from, to).with_promo(pk)));
            } else {
                out.push(Move::new(from, to));
            }
        }
        out.retain(|&mv| leaves_king_safe(pos, mv));
        out.into_iter()
            .map(|mv| GameMove::special(mv, Special::PawnDash))
            .collect()
    }

    fn claims(&self, mv: &GameMove) -> bool {
        mv.special == Some(Special::PawnDash)
    }

    fn apply_claimed(&mut self, pos: &mut Position, mv: &GameMove) {
        let left = &mut self.uses[pos.side_to_move.idx()];
        *left = left.saturating_sub(1);
        pos.make_move(mv.mv);
    }

    fn box_clone(&self) -> Box<dyn Upgrade> {
        Box::new(self.clone())
    }
}

use chess_core::{sq, CastlingRights, Color, Move, Piece, PieceKind, Position, Square};
use rand::{Rng, RngCore};

use super::{RuleSet, VariantMeta};
use crate::moves::{GameMove, Special};

const QUEEN_SIDE: usize = 0;
const KING_SIDE: usize = 1;

/// Destination files of king and rook after castling, per side.
const KING_DEST: [i8; 2] = [2, 6];
const ROOK_DEST: [i8; 2] = [3, 5];

/// Chess960: shuffled back rank, castling to the orthodox c/g files from
/// wherever king and rook start.
///
/// Castling is entered as the king capturing its own rook (`e1h1`-style),
/// which stays unambiguous when the king does not need to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chess960 {
    king_file: i8,
    /// Queen-side rook file, king-side rook file.
    rook_files: [i8; 2],
    /// `rights[color][side]`
    rights: [[bool; 2]; 2],
}

impl Default for Chess960 {
    fn default() -> Self {
        Self {
            king_file: 4,
            rook_files: [0, 7],
            rights: [[true; 2]; 2],
        }
    }
}

impl Chess960 {
    /// Set up from a white back rank (mirrored for black). The king must
    /// stand between the two rooks.
    pub fn from_back_rank(back: [PieceKind; 8]) -> Option<(Self, Position)> {
        let files_of = |kind: PieceKind| {
            back.iter()
                .enumerate()
                .filter(move |(_, k)| **k == kind)
                .map(|(f, _)| f as i8)
        };
        let king_file = files_of(PieceKind::King).next()?;
        let rooks: Vec<i8> = files_of(PieceKind::Rook).collect();
        if rooks.len() != 2 || !(rooks[0] < king_file && king_file < rooks[1]) {
            return None;
        }
        let variant = Self {
            king_file,
            rook_files: [rooks[0], rooks[1]],
            rights: [[true; 2]; 2],
        };
        // Orthodox rights stay empty so the core generator never castles.
        Some((variant, Position::with_back_rank(back, CastlingRights::none())))
    }

    pub fn can_castle(&self, color: Color, king_side: bool) -> bool {
        self.rights[color.idx()][usize::from(king_side)]
    }

    fn home(color: Color, file: i8) -> Option<Square> {
        sq(file, color.back_rank())
    }

    fn castle_move(&self, pos: &Position, color: Color, side: usize) -> Option<GameMove> {
        if !self.rights[color.idx()][side] {
            return None;
        }
        let rank = color.back_rank();
        let king_sq = Self::home(color, self.king_file)?;
        let rook_sq = Self::home(color, self.rook_files[side])?;
        let holds = |s: Square, kind: PieceKind| pos.piece_at(s) == Some(Piece::new(color, kind));
        if !holds(king_sq, PieceKind::King) || !holds(rook_sq, PieceKind::Rook) {
            return None;
        }
        if pos.in_check(color) {
            return None;
        }

        let files = [self.king_file, self.rook_files[side], KING_DEST[side], ROOK_DEST[side]];
        let lo = files.iter().copied().min()?;
        let hi = files.iter().copied().max()?;
        for f in lo..=hi {
            let s = sq(f, rank)?;
            if s != king_sq && s != rook_sq && !pos.is_empty_at(s) {
                return None;
            }
        }

        let (from, to) = if self.king_file <= KING_DEST[side] {
            (self.king_file, KING_DEST[side])
        } else {
            (KING_DEST[side], self.king_file)
        };
        for f in from..=to {
            if pos.is_square_attacked(sq(f, rank)?, color.other()) {
                return None;
            }
        }

        let mv = GameMove::special(Move::castle(king_sq, rook_sq), Special::Castle960);
        let mut after = pos.clone();
        castle(&mut after, color, king_sq, rook_sq, side)?;
        (!after.in_check(color)).then_some(mv)
    }

    fn side_of(&self, color: Color, rook_sq: Square) -> Option<usize> {
        [QUEEN_SIDE, KING_SIDE]
            .into_iter()
            .find(|&side| Self::home(color, self.rook_files[side]) == Some(rook_sq))
    }
}

/// Move king and rook to their castled squares.
fn castle(pos: &mut Position, color: Color, king_sq: Square, rook_sq: Square, side: usize) -> Option<()> {
    let rank = color.back_rank();
    let king_to = sq(KING_DEST[side], rank)?;
    let rook_to = sq(ROOK_DEST[side], rank)?;
    pos.set_piece(king_sq, None);
    pos.set_piece(rook_sq, None);
    pos.set_piece(king_to, Some(Piece::new(color, PieceKind::King)));
    pos.set_piece(rook_to, Some(Piece::new(color, PieceKind::Rook)));
    pos.en_passant = None;
    pos.halfmove_clock += 1;
    pos.pass_turn();
    Some(())
}

impl RuleSet for Chess960 {
    fn meta(&self) -> VariantMeta {
        VariantMeta {
            min_players: 2,
            max_players: 256,
            default_rounds: 5,
            material_draws: true,
        }
    }

    fn setup_board(&mut self, rng: &mut dyn RngCore) -> Position {
        let back = random_back_rank(rng);
        match Self::from_back_rank(back) {
            Some((variant, pos)) => {
                *self = variant;
                pos
            }
            // The generator always places the king between the rooks.
            None => {
                *self = Self::default();
                Position::startpos()
            }
        }
    }

    fn special_moves(&self, pos: &Position) -> Vec<GameMove> {
        let color = pos.side_to_move;
        [QUEEN_SIDE, KING_SIDE]
            .into_iter()
            .filter_map(|side| self.castle_move(pos, color, side))
            .collect()
    }

    fn apply_move(&mut self, pos: &mut Position, mv: &GameMove) -> bool {
        match mv.special {
            None => {
                pos.make_move(mv.mv);
                true
            }
            Some(Special::Castle960) => {
                let color = pos.side_to_move;
                let Some(side) = self.side_of(color, mv.mv.to) else {
                    return false;
                };
                castle(pos, color, mv.mv.from, mv.mv.to, side).is_some()
            }
            Some(_) => false,
        }
    }

    fn after_move(&mut self, mv: &GameMove, mover: Color, _pos: &Position) {
        if Self::home(mover, self.king_file) == Some(mv.mv.from) {
            self.rights[mover.idx()] = [false; 2];
        }
        for color in Color::ALL {
            for side in [QUEEN_SIDE, KING_SIDE] {
                let home = Self::home(color, self.rook_files[side]);
                if home == Some(mv.mv.from) || home == Some(mv.mv.to) {
                    self.rights[color.idx()][side] = false;
                }
            }
        }
    }
}

/// Random legal Chess960 back rank: bishops on opposite shades, king
/// between the rooks.
pub fn random_back_rank(rng: &mut dyn RngCore) -> [PieceKind; 8] {
    let mut slots: [Option<PieceKind>; 8] = [None; 8];
    // a1 is dark, so even files are dark on the first rank.
    slots[2 * rng.gen_range(0..4)] = Some(PieceKind::Bishop);
    slots[2 * rng.gen_range(0..4) + 1] = Some(PieceKind::Bishop);

    let place = |slots: &mut [Option<PieceKind>; 8], kind: PieceKind, nth: usize| {
        if let Some(slot) = slots.iter_mut().filter(|s| s.is_none()).nth(nth) {
            *slot = Some(kind);
        }
    };
    let q = rng.gen_range(0..6);
    place(&mut slots, PieceKind::Queen, q);
    let n1 = rng.gen_range(0..5);
    place(&mut slots, PieceKind::Knight, n1);
    let n2 = rng.gen_range(0..4);
    place(&mut slots, PieceKind::Knight, n2);
    for kind in [PieceKind::Rook, PieceKind::King, PieceKind::Rook] {
        place(&mut slots, kind, 0);
    }

    let mut back = [PieceKind::Pawn; 8];
    for (dst, slot) in back.iter_mut().zip(slots) {
        *dst = slot.unwrap_or(PieceKind::Pawn);
    }
    back
}

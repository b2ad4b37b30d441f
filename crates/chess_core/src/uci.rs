//! Coordinate (UCI-style) move text, e.g. `e2e4` or `e7e8q`.

use crate::{board::Position, movegen::legal_moves, types::*};

pub fn move_to_uci(mv: Move) -> String {
    mv.to_string()
}

/// Squares and optional promotion of a coordinate move, without any
/// legality check.
pub fn parse_uci_squares(txt: &str) -> Option<(Square, Square, Option<PieceKind>)> {
    let txt = txt.trim();
    if txt.len() < 4 || txt.len() > 5 || !txt.is_ascii() {
        return None;
    }
    let from = coord_to_sq(&txt[0..2])?;
    let to = coord_to_sq(&txt[2..4])?;
    let promo = match txt[4..].chars().next() {
        None => None,
        Some(ch) => match PieceKind::from_char(ch)? {
            PieceKind::Pawn | PieceKind::King => return None,
            kind => Some(kind),
        },
    };
    Some((from, to, promo))
}

/// Resolve coordinate text against the legal moves of `pos`, so the
/// castle/en-passant flags come from the generator.
pub fn parse_uci_move(pos: &Position, txt: &str) -> Option<Move> {
    let (from, to, promo) = parse_uci_squares(txt)?;
    legal_moves(pos)
        .into_iter()
        .find(|m| m.from == from && m.to == to && m.promo == promo)
}

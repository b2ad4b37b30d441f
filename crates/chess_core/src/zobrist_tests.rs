use super::*;
use crate::types::{Color, PieceKind};
use std::collections::HashSet;

#[test]
fn test_zobrist_keys_unique() {
    let mut seen = HashSet::new();
    for key in ZOBRIST.pieces.iter().flatten().flatten() {
        assert!(seen.insert(*key), "Duplicate piece key");
    }
    assert!(seen.insert(ZOBRIST.side_to_move), "Side to move key collision");
    for key in ZOBRIST.castling.iter().chain(ZOBRIST.en_passant.iter()) {
        assert!(seen.insert(*key), "Castling/en-passant key collision");
    }
}

#[test]
fn test_zobrist_piece_key_depends_on_square_and_color() {
    let white = Piece::new(Color::White, PieceKind::Pawn);
    let black = Piece::new(Color::Black, PieceKind::Pawn);
    assert_ne!(ZOBRIST.piece_key(white, 0), ZOBRIST.piece_key(white, 1));
    assert_ne!(ZOBRIST.piece_key(white, 12), ZOBRIST.piece_key(black, 12));
}

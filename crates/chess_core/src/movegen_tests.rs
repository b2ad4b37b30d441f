use super::*;

#[test]
fn test_startpos_moves() {
    let pos = Position::startpos();
    // Starting position has 20 legal moves
    assert_eq!(legal_moves(&pos).len(), 20);
}

#[test]
fn test_kiwipete_moves() {
    // Kiwipete position - complex with many move types
    let pos =
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -")
            .unwrap();
    let moves = legal_moves(&pos);
    assert_eq!(moves.len(), 48);
    assert_eq!(moves.iter().filter(|m| m.is_castle).count(), 2);
}

#[test]
fn test_moves_from_single_square() {
    let pos = Position::startpos();
    let knight = legal_moves_from(&pos, coord_to_sq("g1").unwrap());
    assert_eq!(knight.len(), 2);
    // Black piece while white is to move
    assert!(legal_moves_from(&pos, coord_to_sq("g8").unwrap()).is_empty());
}

#[test]
fn test_pinned_piece_cannot_move() {
    // White knight on e2 pinned by rook on e8
    let pos = Position::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
    assert!(legal_moves_from(&pos, coord_to_sq("e2").unwrap()).is_empty());
}

#[test]
fn test_en_passant_generated() {
    let pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
    let ep: Vec<_> = legal_moves(&pos).into_iter().filter(|m| m.is_en_passant).collect();
    assert_eq!(ep.len(), 1);
    let after = pos.after(ep[0]);
    assert!(after.piece_at(coord_to_sq("d5").unwrap()).is_none());
}

#[test]
fn test_mate_and_stalemate_helpers() {
    let mate = Position::from_fen("r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4")
        .unwrap();
    assert!(is_checkmate(&mate));
    assert!(!is_stalemate(&mate));

    let stale = Position::from_fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(is_stalemate(&stale));
}

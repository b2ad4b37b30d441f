//! Move generator node counts against well-known reference values.

use chess_core::{legal_moves, Position};

fn perft(pos: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves.into_iter().map(|mv| perft(&pos.after(mv), depth - 1)).sum()
}

const CASES: &[(&str, u8, u64)] = &[
    ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 3, 8_902),
    ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 2, 2_039),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 3, 2_812),
    ("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 2, 264),
];

#[test]
fn perft_reference_positions() {
    for (fen, depth, expected) in CASES {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(perft(&pos, *depth), *expected, "perft mismatch for '{fen}' at depth {depth}");
    }
}

#[test]
fn fen_round_trips_through_moves() {
    let mut pos = Position::startpos();
    for txt in ["e2e4", "c7c5", "g1f3"] {
        let mv = chess_core::parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
    }
    let fen = pos.to_fen();
    assert_eq!(fen, "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
    assert_eq!(Position::from_fen(&fen).unwrap(), pos);
}

use super::*;
use chess_core::{coord_to_sq, Move, Square};

use crate::moves::Special;

fn pos(fen: &str) -> Position {
    Position::from_fen(fen).unwrap()
}

fn s(coord: &str) -> Square {
    coord_to_sq(coord).unwrap()
}

fn ucis(moves: &[GameMove]) -> Vec<String> {
    let mut out: Vec<_> = moves.iter().map(|m| m.uci()).collect();
    out.sort();
    out
}

fn after<'a>(p: &'a mut Position, mover: Color, mv: GameMove, game_over: bool) -> AfterMove<'a> {
    AfterMove {
        pos: p,
        mover,
        mv,
        time_control: TimeControl::BLITZ,
        game_over,
        bonus_ms: 0,
    }
}

#[test]
fn pawn_dash_skips_start_rank_pawns() {
    let dash = PawnDash::new(3);
    let p = pos("4k3/8/8/8/8/4P3/3P4/4K3 w - - 0 1");
    assert_eq!(ucis(&dash.extra_moves(&p)), vec!["e3e5"]);
    assert!(dash.extra_moves(&p).iter().all(|m| m.special == Some(Special::PawnDash)));
}

#[test]
fn pawn_dash_needs_both_squares_empty() {
    let dash = PawnDash::new(3);
    let blocked_mid = pos("4k3/8/8/8/4p3/4P3/8/4K3 w - - 0 1");
    assert!(dash.extra_moves(&blocked_mid).is_empty());
    let blocked_far = pos("4k3/8/8/4p3/8/4P3/8/4K3 w - - 0 1");
    assert!(dash.extra_moves(&blocked_far).is_empty());
}

#[test]
fn pawn_dash_uses_run_out_per_color() {
    let mut dash = PawnDash::new(2);
    let mut p = pos("4k3/8/8/8/8/P1P5/8/4K3 w - - 0 1");

    let first = GameMove::special(Move::new(s("a3"), s("a5")), Special::PawnDash);
    assert!(dash.claims(&first));
    dash.apply_claimed(&mut p, &first);
    assert_eq!(dash.uses_left(Color::White), 1);
    assert_eq!(dash.uses_left(Color::Black), 2);
    assert_eq!(p.piece_at(s("a5")).unwrap().kind, chess_core::PieceKind::Pawn);
    assert_eq!(p.halfmove_clock, 0);

    p.side_to_move = Color::White;
    let second = GameMove::special(Move::new(s("c3"), s("c5")), Special::PawnDash);
    dash.apply_claimed(&mut p, &second);
    p.side_to_move = Color::White;
    assert_eq!(dash.uses_left(Color::White), 0);
    assert!(dash.extra_moves(&p).is_empty());
}

#[test]
fn pawn_dash_onto_last_rank_promotes() {
    let dash = PawnDash::new(1);
    let p = pos("k7/8/4P3/8/8/8/8/4K3 w - - 0 1");
    let moves = ucis(&dash.extra_moves(&p));
    assert_eq!(moves, vec!["e6e8b", "e6e8n", "e6e8q", "e6e8r"]);
}

#[test]
fn piece_jump_leaps_one_friendly_piece() {
    let jump = PieceJump;
    let moves = ucis(&jump.extra_moves(&Position::startpos()));
    assert_eq!(
        moves,
        vec!["a1a3", "c1a3", "c1e3", "d1b3", "d1d3", "d1f3", "f1d3", "f1h3", "h1h3"]
    );
}

#[test]
fn piece_jump_never_leaps_enemies_or_two_pieces() {
    let jump = PieceJump;
    // Enemy pawn on a2, a friendly pair on h2/h3, and each rook's far
    // neighbor is the other rook with no square behind it.
    let p = pos("4k3/8/8/8/8/1K5P/p6P/R6R w - - 0 1");
    assert!(jump.extra_moves(&p).is_empty());
}

#[test]
fn piece_jump_respects_pins() {
    let jump = PieceJump;
    // The e2 rook is pinned on the e-file, so jumping d2 is illegal.
    let pinned = pos("4r1k1/8/8/8/8/8/3PR3/4K3 w - - 0 1");
    assert!(jump.extra_moves(&pinned).is_empty());

    let free = pos("6k1/8/8/8/8/8/3PR3/4K3 w - - 0 1");
    assert_eq!(ucis(&jump.extra_moves(&free)), vec!["e2c2"]);
}

#[test]
fn check_bonus_credits_on_check_only() {
    let mut bonus = CheckBonus::new(40);
    let mv = GameMove::plain(Move::new(s("d1"), s("e1")));

    let mut checking = pos("4k3/8/8/8/8/8/8/4R1K1 b - - 0 1");
    let mut ctx = after(&mut checking, Color::White, mv, false);
    bonus.after_move(&mut ctx);
    assert_eq!(ctx.bonus_ms, 300_000 / 40 + 3_000);

    let mut quiet = pos("4k3/8/8/8/8/8/8/3R2K1 b - - 0 1");
    let mut ctx = after(&mut quiet, Color::White, mv, false);
    bonus.after_move(&mut ctx);
    assert_eq!(ctx.bonus_ms, 0);
}

#[test]
fn extra_turn_fires_once_charged() {
    let mut extra = ExtraTurn::new(2);
    let mv = GameMove::plain(Move::new(s("a2"), s("a3")));
    let quiet = pos("4k3/8/8/8/8/P7/8/4K3 b - - 0 1");

    for expected_left in [1, 0] {
        let mut p = quiet.clone();
        extra.after_move(&mut after(&mut p, Color::White, mv, false));
        assert_eq!(p.side_to_move, Color::Black);
        assert_eq!(extra.countdown(Color::White), expected_left);
    }

    let mut p = quiet.clone();
    extra.after_move(&mut after(&mut p, Color::White, mv, false));
    assert_eq!(p.side_to_move, Color::White);
    assert_eq!(extra.countdown(Color::White), 2);
    assert_eq!(extra.countdown(Color::Black), 2);
}

#[test]
fn extra_turn_not_after_check_or_game_end() {
    let mut extra = ExtraTurn::new(1);
    let mv = GameMove::plain(Move::new(s("d1"), s("e1")));
    let warm = pos("4k3/8/8/8/8/8/8/3R2K1 b - - 0 1");
    extra.after_move(&mut after(&mut warm.clone(), Color::White, mv, false));
    assert_eq!(extra.countdown(Color::White), 0);

    let mut checking = pos("4k3/8/8/8/8/8/8/4R1K1 b - - 0 1");
    extra.after_move(&mut after(&mut checking, Color::White, mv, false));
    assert_eq!(checking.side_to_move, Color::Black);

    let mut over = warm.clone();
    extra.after_move(&mut after(&mut over, Color::White, mv, true));
    assert_eq!(over.side_to_move, Color::Black);
    assert_eq!(extra.countdown(Color::White), 0);
}

#[test]
fn boxed_upgrades_clone_independently() {
    let config = UpgradeConfig::default();
    let original = build_all(&[UpgradeKind::PawnDash, UpgradeKind::ExtraTurn], &config);
    let mut copy = original.clone();
    let mut p = pos("4k3/8/8/8/8/4P3/8/4K3 w - - 0 1");
    let dash = GameMove::special(Move::new(s("e3"), s("e5")), Special::PawnDash);
    copy[0].apply_claimed(&mut p, &dash);

    let probe = pos("4k3/8/8/8/8/4P3/8/4K3 w - - 0 1");
    assert_eq!(original[0].extra_moves(&probe).len(), 1);
    assert_eq!(copy[0].kind(), UpgradeKind::PawnDash);
    assert_eq!(original[1].kind(), UpgradeKind::ExtraTurn);
}

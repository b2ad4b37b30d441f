use super::*;
use chess_core::{coord_to_sq, PieceKind, STARTPOS_FEN};
use std::time::Duration;

fn setup(mode: GameMode) -> EngineSetup {
    EngineSetup::new(mode, TimeControl::BLITZ)
}

fn engine_at(setup: &EngineSetup, fen: &str, now: Instant) -> MatchEngine {
    MatchEngine::with_position(
        setup,
        &UpgradeConfig::default(),
        Position::from_fen(fen).unwrap(),
        now,
    )
}

fn standard(now: Instant) -> MatchEngine {
    engine_at(&setup(GameMode::Standard), STARTPOS_FEN, now)
}

fn play_all(engine: &mut MatchEngine, moves: &[&str], now: Instant) {
    for uci in moves {
        let mover = engine.side_to_move();
        engine.apply_move(mover, uci, now).unwrap();
    }
}

#[test]
fn legal_moves_filter_by_square() {
    let now = Instant::now();
    let engine = standard(now);
    assert_eq!(engine.legal_moves(None).len(), 20);
    let from_e2 = engine.legal_moves(Some(coord_to_sq("e2").unwrap()));
    let mut ucis: Vec<_> = from_e2.iter().map(|m| m.uci()).collect();
    ucis.sort();
    assert_eq!(ucis, vec!["e2e3", "e2e4"]);
    assert!(engine.legal_moves(Some(coord_to_sq("e4").unwrap())).is_empty());
}

#[test]
fn rejects_bad_requests_without_changing_state() {
    let now = Instant::now();
    let mut engine = standard(now);

    assert_eq!(engine.apply_move(Color::Black, "e7e5", now), Err(ArenaError::NotYourTurn));
    assert!(matches!(
        engine.apply_move(Color::White, "e2e5", now),
        Err(ArenaError::Validation(_))
    ));
    assert!(matches!(
        engine.apply_move(Color::White, "zz99", now),
        Err(ArenaError::Validation(_))
    ));
    assert_eq!(engine.fen(), STARTPOS_FEN);
    assert!(engine.moves().is_empty());
}

#[test]
fn checkmate_ends_game_and_blocks_moves() {
    let now = Instant::now();
    let mut engine = standard(now);
    play_all(&mut engine, &["f2f3", "e7e5", "g2g4"], now);
    let last = engine.apply_move(Color::Black, "d8h4", now).unwrap();

    let mate = GameOutcome::win(Color::Black, EndReason::Checkmate);
    assert_eq!(last.outcome, Some(mate));
    assert!(engine.is_over());
    assert_eq!(engine.winner(), Some(Color::Black));
    assert!(engine.legal_moves(None).is_empty());
    assert_eq!(engine.apply_move(Color::White, "a2a3", now), Err(ArenaError::MatchOver));
    assert_eq!(engine.resign(Color::Black, now), mate);
}

#[test]
fn third_check_wins_three_check() {
    let now = Instant::now();
    let mut engine = engine_at(&setup(GameMode::ThreeCheck), "4k3/8/8/8/8/8/8/R3K3 w - - 0 1", now);
    play_all(&mut engine, &["a1a8", "e8e7", "a8a7", "e7e6"], now);
    assert!(!engine.is_over());

    let last = engine.apply_move(Color::White, "a7a6", now).unwrap();
    assert_eq!(
        last.outcome,
        Some(GameOutcome::win(Color::White, EndReason::ThreeChecks))
    );
}

#[test]
fn king_reaching_the_hill_wins() {
    let now = Instant::now();
    let mut engine = engine_at(&setup(GameMode::KingOfTheHill), "4k3/8/8/8/8/3K4/8/8 w - - 0 1", now);
    let last = engine.apply_move(Color::White, "d3d4", now).unwrap();
    assert_eq!(
        last.outcome,
        Some(GameOutcome::win(Color::White, EndReason::KingOfTheHill))
    );
}

#[test]
fn flag_fall_rejects_later_moves() {
    let t0 = Instant::now();
    let setup = EngineSetup::new(GameMode::Standard, TimeControl::new(1, 0));
    let mut engine = engine_at(&setup, STARTPOS_FEN, t0);

    let later = t0 + Duration::from_secs(2);
    assert_eq!(engine.apply_move(Color::White, "e2e4", later), Err(ArenaError::MatchOver));
    assert_eq!(
        engine.outcome(),
        Some(GameOutcome::win(Color::Black, EndReason::Timeout))
    );
    assert_eq!(engine.remaining_ms(Color::White, later), 0);
    assert_eq!(engine.tick(later), None);
}

#[test]
fn tick_reports_timeout_once() {
    let t0 = Instant::now();
    let setup = EngineSetup::new(GameMode::Standard, TimeControl::new(1, 0));
    let mut engine = engine_at(&setup, STARTPOS_FEN, t0);
    assert_eq!(engine.tick(t0 + Duration::from_millis(500)), None);
    let flagged = engine.tick(t0 + Duration::from_millis(1_000));
    assert_eq!(flagged, Some(GameOutcome::win(Color::Black, EndReason::Timeout)));
    assert_eq!(engine.tick(t0 + Duration::from_millis(1_200)), None);
}

#[test]
fn draw_offer_accept_and_decline() {
    let now = Instant::now();
    let mut engine = standard(now);

    assert!(matches!(engine.accept_draw(Color::Black, now), Err(ArenaError::Validation(_))));
    assert!(!engine.offer_draw(Color::White, now).unwrap());
    assert!(engine.is_draw_offered(Color::White));
    engine.decline_draw(Color::Black, now).unwrap();
    assert!(!engine.is_draw_offered(Color::White));

    engine.offer_draw(Color::White, now).unwrap();
    engine.apply_move(Color::White, "e2e4", now).unwrap();
    assert!(!engine.is_draw_offered(Color::White), "offers lapse after a move");

    engine.offer_draw(Color::Black, now).unwrap();
    let outcome = engine.accept_draw(Color::White, now).unwrap();
    assert_eq!(outcome, GameOutcome::draw(EndReason::DrawAgreement));
    assert!(engine.is_over());
}

#[test]
fn crossing_draw_offers_agree() {
    let now = Instant::now();
    let mut engine = standard(now);
    assert!(!engine.offer_draw(Color::White, now).unwrap());
    assert!(engine.offer_draw(Color::Black, now).unwrap());
    assert_eq!(engine.outcome(), Some(GameOutcome::draw(EndReason::DrawAgreement)));
}

#[test]
fn takeback_restores_position_and_keeps_clocks() {
    let t0 = Instant::now();
    let setup = setup(GameMode::Standard).with_undo(true);
    let mut engine = engine_at(&setup, STARTPOS_FEN, t0);

    let t1 = t0 + Duration::from_secs(4);
    engine.apply_move(Color::White, "e2e4", t1).unwrap();
    let white_after_move = engine.remaining_ms(Color::White, t1);

    assert!(matches!(engine.accept_undo(Color::Black, t1), Err(ArenaError::Validation(_))));
    engine.offer_undo(Color::White, t1).unwrap();
    assert_eq!(engine.undo_offered_by(), Some(Color::White));

    let t2 = t1 + Duration::from_secs(1);
    let fen = engine.accept_undo(Color::Black, t2).unwrap();
    assert_eq!(fen, STARTPOS_FEN);
    assert!(engine.moves().is_empty());
    assert_eq!(engine.side_to_move(), Color::White);
    assert_eq!(engine.remaining_ms(Color::White, t2), white_after_move);
    assert_eq!(engine.remaining_ms(Color::Black, t2), 299_000);

    assert!(matches!(engine.offer_undo(Color::White, t2), Err(ArenaError::Validation(_))));
}

#[test]
fn takebacks_disabled_unless_allowed() {
    let now = Instant::now();
    let mut engine = standard(now);
    engine.apply_move(Color::White, "e2e4", now).unwrap();
    assert!(matches!(engine.offer_undo(Color::White, now), Err(ArenaError::Validation(_))));
}

#[test]
fn extra_turn_keeps_the_move_for_exactly_one_move() {
    let now = Instant::now();
    let config = UpgradeConfig {
        extra_turn_recharge: 1,
        ..UpgradeConfig::default()
    };
    let setup = setup(GameMode::Standard).with_upgrades([UpgradeKind::ExtraTurn]);
    let mut engine = MatchEngine::with_position(&setup, &config, Position::startpos(), now);

    play_all(&mut engine, &["e2e4", "e7e5"], now);
    let charged = engine.apply_move(Color::White, "d2d4", now).unwrap();
    assert!(charged.extra_turn);
    assert_eq!(charged.side_to_move, Color::White);

    let second = engine.apply_move(Color::White, "g1f3", now).unwrap();
    assert!(!second.extra_turn);
    assert_eq!(second.side_to_move, Color::Black);
}

#[test]
fn check_bonus_lands_on_the_clock() {
    let now = Instant::now();
    let setup = setup(GameMode::Standard).with_upgrades([UpgradeKind::CheckBonus]);
    let mut engine = engine_at(&setup, "4k3/8/8/8/8/8/8/3RK3 w - - 0 1", now);
    let applied = engine.apply_move(Color::White, "d1d8", now).unwrap();
    assert_eq!(applied.white_ms, 300_000 + 3_000 + 300_000 / 40 + 3_000);
    assert_eq!(applied.black_ms, 300_000);
}

#[test]
fn duplicate_claims_are_a_conflict() {
    let now = Instant::now();
    let setup = setup(GameMode::Standard).with_upgrades([UpgradeKind::PawnDash, UpgradeKind::PawnDash]);
    let fen = "4k3/8/8/8/8/4P3/8/4K3 w - - 0 1";
    let mut engine = engine_at(&setup, fen, now);

    let err = engine.apply_move(Color::White, "e3e5", now).unwrap_err();
    assert_eq!(
        err,
        ArenaError::UpgradeConflict {
            first: UpgradeKind::PawnDash,
            second: UpgradeKind::PawnDash,
            mv: "e3e5".into(),
        }
    );
    assert_eq!(engine.fen(), fen);
    assert!(engine.moves().is_empty());
}

#[test]
fn upgrade_moves_are_playable() {
    let now = Instant::now();
    let setup = setup(GameMode::Standard).with_upgrades([UpgradeKind::PawnDash, UpgradeKind::PieceJump]);
    let mut engine = engine_at(&setup, STARTPOS_FEN, now);
    assert_eq!(engine.legal_moves(None).len(), 20 + 9);

    engine.apply_move(Color::White, "a1a3", now).unwrap();
    engine.apply_move(Color::Black, "e7e6", now).unwrap();
    engine.apply_move(Color::White, "a3b3", now).unwrap();
    let dash = engine.apply_move(Color::Black, "e6e4", now).unwrap();
    assert_eq!(dash.mv.special, Some(crate::moves::Special::PawnDash));
    let e4 = coord_to_sq("e4").unwrap();
    assert_eq!(engine.position().piece_at(e4).map(|p| p.kind), Some(PieceKind::Pawn));
}

#[test]
fn preview_leaves_game_untouched() {
    let now = Instant::now();
    let engine = standard(now);
    let preview = engine.preview("g1f3").unwrap();
    assert_eq!(preview.side_to_move, Color::Black);
    assert!(preview.piece_at(coord_to_sq("f3").unwrap()).is_some());
    assert_eq!(engine.fen(), STARTPOS_FEN);
    assert!(matches!(engine.preview("g1g3"), Err(ArenaError::Validation(_))));
}

#[test]
fn bare_kings_are_a_draw() {
    let now = Instant::now();
    let mut engine = engine_at(&setup(GameMode::Standard), "4k3/8/8/8/8/8/3p4/4K3 w - - 0 1", now);
    let last = engine.apply_move(Color::White, "e1d2", now).unwrap();
    assert_eq!(
        last.outcome,
        Some(GameOutcome::draw(EndReason::InsufficientMaterial))
    );
}

#[test]
fn threefold_repetition_is_a_draw() {
    let now = Instant::now();
    let mut engine = standard(now);
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
    play_all(&mut engine, &shuffle, now);
    assert!(!engine.is_over());
    play_all(&mut engine, &shuffle[..3], now);
    let last = engine.apply_move(Color::Black, "f6g8", now).unwrap();
    assert_eq!(
        last.outcome,
        Some(GameOutcome::draw(EndReason::ThreefoldRepetition))
    );
}

#[test]
fn chess960_castle_through_the_engine() {
    let now = Instant::now();
    let mut engine = engine_at(&setup(GameMode::Chess960), "r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1", now);
    engine.apply_move(Color::White, "e1h1", now).unwrap();
    let g1 = coord_to_sq("g1").unwrap();
    let f1 = coord_to_sq("f1").unwrap();
    assert_eq!(engine.position().piece_at(g1).map(|p| p.kind), Some(PieceKind::King));
    assert_eq!(engine.position().piece_at(f1).map(|p| p.kind), Some(PieceKind::Rook));
}

#[test]
fn resignation_is_idempotent() {
    let now = Instant::now();
    let mut engine = standard(now);
    let first = engine.resign(Color::White, now);
    assert_eq!(first, GameOutcome::win(Color::Black, EndReason::Resignation));
    assert_eq!(engine.resign(Color::Black, now), first);
}

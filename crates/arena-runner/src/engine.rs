//! Per-match rules engine: validates and applies moves through the
//! variant and its upgrades, runs the clock, negotiates draws and
//! takebacks, and decides when and how the game ends.
//!
//! The engine is synchronous and owns no tasks. The match actor feeds it
//! one command at a time together with the current instant.

use arena_core::{
    ArenaError, EndReason, GameMode, GameOutcome, Result, TimeControl, UpgradeConfig, UpgradeKind,
};
use chess_core::{has_legal_move, parse_uci_squares, Color, Position, Square};
use rand::RngCore;
use tokio::time::Instant;

use crate::clock::MatchClock;
use crate::moves::GameMove;
use crate::upgrade::{self, AfterMove, Upgrade};
use crate::variant::{RuleSet, Variant};

/// How a match engine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSetup {
    pub mode: GameMode,
    pub time_control: TimeControl,
    /// Applied in this order.
    pub upgrades: Vec<UpgradeKind>,
    /// Takebacks are only offered in casual games outside competitions.
    pub allow_undo: bool,
}

impl EngineSetup {
    pub fn new(mode: GameMode, time_control: TimeControl) -> Self {
        Self {
            mode,
            time_control,
            upgrades: Vec::new(),
            allow_undo: false,
        }
    }

    pub fn with_upgrades(mut self, upgrades: impl IntoIterator<Item = UpgradeKind>) -> Self {
        self.upgrades = upgrades.into_iter().collect();
        self
    }

    pub fn with_undo(mut self, allow: bool) -> Self {
        self.allow_undo = allow;
        self
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveApplied {
    pub mv: GameMove,
    pub uci: String,
    pub fen: String,
    pub side_to_move: Color,
    /// The mover keeps the turn.
    pub extra_turn: bool,
    pub white_ms: u64,
    pub black_ms: u64,
    pub outcome: Option<GameOutcome>,
}

/// State restored by a takeback.
struct Snapshot {
    position: Position,
    variant: Variant,
    upgrades: Vec<Box<dyn Upgrade>>,
    moves_len: usize,
}

struct Played {
    extra_turn: bool,
    bonus_ms: u64,
}

pub struct MatchEngine {
    variant: Variant,
    upgrades: Vec<Box<dyn Upgrade>>,
    position: Position,
    clock: MatchClock,
    allow_undo: bool,
    draw_offers: [bool; 2],
    undo_offer: Option<Color>,
    history: Vec<Snapshot>,
    /// Position hashes, starting position first.
    repetitions: Vec<u64>,
    moves: Vec<String>,
    outcome: Option<GameOutcome>,
}

impl MatchEngine {
    /// Build a fresh game; white's clock starts at `now`.
    pub fn new(
        setup: &EngineSetup,
        config: &UpgradeConfig,
        rng: &mut dyn RngCore,
        now: Instant,
    ) -> Self {
        let mut variant = Variant::for_mode(setup.mode);
        let position = variant.setup_board(rng);
        Self::assemble(setup, config, variant, position, now)
    }

    /// Build a game from an arbitrary position. Variant state starts from
    /// its defaults.
    pub fn with_position(
        setup: &EngineSetup,
        config: &UpgradeConfig,
        position: Position,
        now: Instant,
    ) -> Self {
        Self::assemble(setup, config, Variant::for_mode(setup.mode), position, now)
    }

    fn assemble(
        setup: &EngineSetup,
        config: &UpgradeConfig,
        variant: Variant,
        position: Position,
        now: Instant,
    ) -> Self {
        let mut clock = MatchClock::new(setup.time_control);
        clock.start(position.side_to_move, now);
        let repetitions = vec![position.position_hash()];
        Self {
            variant,
            upgrades: upgrade::build_all(&setup.upgrades, config),
            position,
            clock,
            allow_undo: setup.allow_undo,
            draw_offers: [false; 2],
            undo_offer: None,
            history: Vec::new(),
            repetitions,
            moves: Vec::new(),
            outcome: None,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn fen(&self) -> String {
        self.position.to_fen()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move
    }

    pub fn mode(&self) -> GameMode {
        self.variant.mode()
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn upgrade_kinds(&self) -> Vec<UpgradeKind> {
        self.upgrades.iter().map(|u| u.kind()).collect()
    }

    pub fn time_control(&self) -> TimeControl {
        self.clock.time_control
    }

    /// Moves played so far, in coordinate notation.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn remaining_ms(&self, color: Color, now: Instant) -> u64 {
        self.clock.remaining_ms(color, now)
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Color> {
        self.outcome.and_then(|o| o.winner)
    }

    pub fn is_draw_offered(&self, by: Color) -> bool {
        self.draw_offers[by.idx()]
    }

    pub fn undo_offered_by(&self) -> Option<Color> {
        self.undo_offer
    }

    /// Legal moves for the side to move, optionally only those starting
    /// on `from`. Empty once the game is over.
    pub fn legal_moves(&self, from: Option<Square>) -> Vec<GameMove> {
        if self.is_over() {
            return Vec::new();
        }
        let mut moves = collect_moves(&self.variant, &self.upgrades, &self.position);
        if let Some(from) = from {
            moves.retain(|m| m.mv.from == from);
        }
        moves
    }

    /// The position `uci` would lead to, without touching the game.
    pub fn preview(&self, uci: &str) -> Result<Position> {
        if self.is_over() {
            return Err(ArenaError::MatchOver);
        }
        let mv = self.resolve(uci)?;
        let mut variant = self.variant.clone();
        let mut upgrades = self.upgrades.clone();
        let mut position = self.position.clone();
        play(
            &mut variant,
            &mut upgrades,
            &mut position,
            mv,
            self.clock.time_control,
        )?;
        Ok(position)
    }

    pub fn apply_move(&mut self, by: Color, uci: &str, now: Instant) -> Result<MoveApplied> {
        self.ensure_live(now)?;
        if by != self.position.side_to_move {
            return Err(ArenaError::NotYourTurn);
        }
        let mv = self.resolve(uci)?;
        let snapshot = self.allow_undo.then(|| Snapshot {
            position: self.position.clone(),
            variant: self.variant.clone(),
            upgrades: self.upgrades.clone(),
            moves_len: self.moves.len(),
        });

        let played = play(
            &mut self.variant,
            &mut self.upgrades,
            &mut self.position,
            mv,
            self.clock.time_control,
        )?;

        let next = self.position.side_to_move;
        self.clock.commit_move(by, next, played.bonus_ms, now);
        self.history.extend(snapshot);
        self.moves.push(mv.uci());
        self.repetitions.push(self.position.position_hash());
        self.draw_offers = [false; 2];
        self.undo_offer = None;

        tracing::debug!(
            mover = %by,
            mv = %mv.uci(),
            special = ?mv.special,
            extra_turn = played.extra_turn,
            "move applied"
        );
        if let Some(outcome) = self.detect_outcome() {
            self.finish(outcome, now);
        }

        Ok(MoveApplied {
            mv,
            uci: mv.uci(),
            fen: self.fen(),
            side_to_move: next,
            extra_turn: played.extra_turn,
            white_ms: self.clock.remaining_ms(Color::White, now),
            black_ms: self.clock.remaining_ms(Color::Black, now),
            outcome: self.outcome,
        })
    }

    /// Advance the clock. Returns the outcome if this tick ended the game.
    pub fn tick(&mut self, now: Instant) -> Option<GameOutcome> {
        if self.is_over() {
            return None;
        }
        let flagged = self.clock.tick(now)?;
        let outcome = GameOutcome::win(flagged.other(), EndReason::Timeout);
        self.finish(outcome, now);
        Some(outcome)
    }

    /// Resigning a finished game returns the existing outcome.
    pub fn resign(&mut self, by: Color, now: Instant) -> GameOutcome {
        self.tick(now);
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = GameOutcome::win(by.other(), EndReason::Resignation);
        self.finish(outcome, now);
        outcome
    }

    /// Offer a draw. Returns `true` when the opponent had already offered
    /// one, which ends the game by agreement.
    pub fn offer_draw(&mut self, by: Color, now: Instant) -> Result<bool> {
        self.ensure_live(now)?;
        self.draw_offers[by.idx()] = true;
        if self.draw_offers[by.other().idx()] {
            self.finish(GameOutcome::draw(EndReason::DrawAgreement), now);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn accept_draw(&mut self, by: Color, now: Instant) -> Result<GameOutcome> {
        self.ensure_live(now)?;
        if !self.draw_offers[by.other().idx()] {
            return Err(ArenaError::validation("no draw offer to accept"));
        }
        let outcome = GameOutcome::draw(EndReason::DrawAgreement);
        self.finish(outcome, now);
        Ok(outcome)
    }

    pub fn decline_draw(&mut self, by: Color, now: Instant) -> Result<()> {
        self.ensure_live(now)?;
        let offer = &mut self.draw_offers[by.other().idx()];
        if !*offer {
            return Err(ArenaError::validation("no draw offer to decline"));
        }
        *offer = false;
        Ok(())
    }

    pub fn offer_undo(&mut self, by: Color, now: Instant) -> Result<()> {
        self.ensure_live(now)?;
        if !self.allow_undo {
            return Err(ArenaError::validation("takebacks are disabled in this match"));
        }
        if self.history.is_empty() {
            return Err(ArenaError::validation("no move to take back"));
        }
        self.undo_offer = Some(by);
        Ok(())
    }

    /// Take back the last move. Clocks keep their current readings and the
    /// restored side to move is put on the clock.
    pub fn accept_undo(&mut self, by: Color, now: Instant) -> Result<String> {
        self.ensure_live(now)?;
        if self.undo_offer != Some(by.other()) {
            return Err(ArenaError::validation("no takeback offer to accept"));
        }
        let snapshot = self
            .history
            .pop()
            .ok_or_else(|| ArenaError::validation("no move to take back"))?;
        self.position = snapshot.position;
        self.variant = snapshot.variant;
        self.upgrades = snapshot.upgrades;
        self.moves.truncate(snapshot.moves_len);
        self.repetitions.truncate(snapshot.moves_len + 1);
        self.undo_offer = None;
        self.draw_offers = [false; 2];
        self.clock.stop(now);
        self.clock.start(self.position.side_to_move, now);
        tracing::debug!(fen = %self.fen(), "move taken back");
        Ok(self.fen())
    }

    /// Stop the clock and drop takeback history.
    pub fn dispose(&mut self, now: Instant) {
        self.clock.stop(now);
        self.history.clear();
        self.undo_offer = None;
    }

    fn ensure_live(&mut self, now: Instant) -> Result<()> {
        if self.is_over() || self.tick(now).is_some() {
            return Err(ArenaError::MatchOver);
        }
        Ok(())
    }

    fn resolve(&self, uci: &str) -> Result<GameMove> {
        let (from, to, promo) = parse_uci_squares(uci)
            .ok_or_else(|| ArenaError::validation(format!("malformed move '{uci}'")))?;
        collect_moves(&self.variant, &self.upgrades, &self.position)
            .into_iter()
            .find(|m| m.mv.from == from && m.mv.to == to && m.mv.promo == promo)
            .ok_or_else(|| ArenaError::validation(format!("illegal move '{uci}'")))
    }

    /// Timeout, then upgrade overrides, then the variant, then the board.
    fn detect_outcome(&self) -> Option<GameOutcome> {
        if let Some(flagged) = self.clock.flagged() {
            return Some(GameOutcome::win(flagged.other(), EndReason::Timeout));
        }
        if let Some(outcome) = board_outcome(&self.variant, &self.upgrades, &self.position) {
            return Some(outcome);
        }
        let current = self.position.position_hash();
        let seen = self.repetitions.iter().filter(|&&h| h == current).count();
        (seen >= 3).then(|| GameOutcome::draw(EndReason::ThreefoldRepetition))
    }

    fn finish(&mut self, outcome: GameOutcome, now: Instant) {
        self.outcome = Some(outcome);
        self.clock.stop(now);
        self.draw_offers = [false; 2];
        self.undo_offer = None;
        tracing::info!(
            winner = ?outcome.winner,
            reason = %outcome.reason,
            moves = self.moves.len(),
            "game over"
        );
    }
}

fn collect_moves(variant: &Variant, upgrades: &[Box<dyn Upgrade>], pos: &Position) -> Vec<GameMove> {
    let mut moves = variant.legal_moves(pos);
    moves.extend(variant.special_moves(pos));
    for upgrade in upgrades {
        for mv in upgrade.extra_moves(pos) {
            if !moves.contains(&mv) {
                moves.push(mv);
            }
        }
    }
    moves
}

fn board_outcome(
    variant: &Variant,
    upgrades: &[Box<dyn Upgrade>],
    pos: &Position,
) -> Option<GameOutcome> {
    if let Some(outcome) = upgrades.iter().find_map(|u| u.outcome_override(pos)) {
        return Some(outcome);
    }
    if let Some(outcome) = variant.outcome(pos) {
        return Some(outcome);
    }
    let stuck = !has_legal_move(pos)
        && variant.special_moves(pos).is_empty()
        && upgrades.iter().all(|u| u.extra_moves(pos).is_empty());
    if stuck {
        let side = pos.side_to_move;
        return Some(if pos.in_check(side) {
            GameOutcome::win(side.other(), EndReason::Checkmate)
        } else {
            GameOutcome::draw(EndReason::Stalemate)
        });
    }
    if pos.is_fifty_move_draw() {
        return Some(GameOutcome::draw(EndReason::FiftyMoveRule));
    }
    if variant.meta().material_draws && pos.is_insufficient_material() {
        return Some(GameOutcome::draw(EndReason::InsufficientMaterial));
    }
    None
}

/// Apply `mv` to the given state: at most one upgrade may claim it,
/// otherwise the variant applies it; then the after-move hooks run in
/// registration order. Nothing is mutated when this fails.
fn play(
    variant: &mut Variant,
    upgrades: &mut [Box<dyn Upgrade>],
    pos: &mut Position,
    mv: GameMove,
    time_control: TimeControl,
) -> Result<Played> {
    let mover = pos.side_to_move;
    let mut claimant: Option<usize> = None;
    for (i, upgrade) in upgrades.iter().enumerate() {
        if !upgrade.claims(&mv) {
            continue;
        }
        if let Some(first) = claimant {
            return Err(ArenaError::UpgradeConflict {
                first: upgrades[first].kind(),
                second: upgrade.kind(),
                mv: mv.uci(),
            });
        }
        claimant = Some(i);
    }

    match claimant {
        Some(i) => upgrades[i].apply_claimed(pos, &mv),
        None => {
            if !variant.apply_move(pos, &mv) {
                return Err(ArenaError::validation(format!(
                    "move '{}' cannot be applied",
                    mv.uci()
                )));
            }
        }
    }
    variant.after_move(&mv, mover, pos);

    let game_over = board_outcome(variant, upgrades, pos).is_some();
    let mut ctx = AfterMove {
        pos: &mut *pos,
        mover,
        mv,
        time_control,
        game_over,
        bonus_ms: 0,
    };
    for upgrade in upgrades.iter_mut() {
        upgrade.after_move(&mut ctx);
    }
    let bonus_ms = ctx.bonus_ms;

    Ok(Played {
        extra_turn: pos.side_to_move == mover,
        bonus_ms,
    })
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;

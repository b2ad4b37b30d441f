//! One task per live match.
//!
//! Every request, including clock ticks, goes through the match's command
//! channel, so moves, resignations and flag falls are applied strictly one
//! after another.

use arena_core::{
    ArenaError, ArenaEvent, CompetitionId, GameMode, GameOutcome, Gateways, MatchId, MatchPatch,
    MatchType, PlayerId, Result, Target, TimeControl,
};
use chess_core::{Color, Square};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::engine::{MatchEngine, MoveApplied};
use crate::moves::GameMove;
use crate::registry::MatchCompletion;

const COMMAND_BUFFER: usize = 64;

/// Who plays a match and under which settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchInfo {
    pub id: MatchId,
    pub white: PlayerId,
    pub black: PlayerId,
    pub mode: GameMode,
    pub match_type: MatchType,
    pub time_control: TimeControl,
    pub competition: Option<CompetitionId>,
}

impl MatchInfo {
    pub fn color_of(&self, player: PlayerId) -> Result<Color> {
        if player == self.white {
            Ok(Color::White)
        } else if player == self.black {
            Ok(Color::Black)
        } else {
            Err(ArenaError::validation(format!(
                "player {player} is not part of match {}",
                self.id
            )))
        }
    }

    pub fn player(&self, color: Color) -> PlayerId {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// Point-in-time view of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub info: MatchInfo,
    pub fen: String,
    pub side_to_move: Color,
    pub moves: Vec<String>,
    pub white_ms: u64,
    pub black_ms: u64,
    pub outcome: Option<GameOutcome>,
    pub draw_offered_by: Option<Color>,
    pub undo_offered_by: Option<Color>,
}

type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum MatchCommand {
    Move {
        player: PlayerId,
        uci: String,
        reply: Reply<MoveApplied>,
    },
    Preview {
        uci: String,
        reply: Reply<String>,
    },
    LegalMoves {
        from: Option<Square>,
        reply: oneshot::Sender<Vec<GameMove>>,
    },
    OfferDraw {
        player: PlayerId,
        reply: Reply<bool>,
    },
    AcceptDraw {
        player: PlayerId,
        reply: Reply<GameOutcome>,
    },
    DeclineDraw {
        player: PlayerId,
        reply: Reply<()>,
    },
    OfferUndo {
        player: PlayerId,
        reply: Reply<()>,
    },
    AcceptUndo {
        player: PlayerId,
        reply: Reply<String>,
    },
    Resign {
        player: PlayerId,
        reply: Reply<GameOutcome>,
    },
    Timeout {
        reply: oneshot::Sender<Option<GameOutcome>>,
    },
    View {
        reply: oneshot::Sender<MatchView>,
    },
    Tick,
    Shutdown,
}

/// Cloneable address of a running match.
#[derive(Clone)]
pub struct MatchHandle {
    info: MatchInfo,
    tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub fn id(&self) -> MatchId {
        self.info.id
    }

    pub fn info(&self) -> &MatchInfo {
        &self.info
    }

    /// The actor has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn gone(&self) -> ArenaError {
        ArenaError::not_found("match", self.info.id)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> MatchCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| self.gone())?;
        rx.await.map_err(|_| self.gone())
    }

    pub async fn apply_move(&self, player: PlayerId, uci: impl Into<String>) -> Result<MoveApplied> {
        let uci = uci.into();
        self.request(|reply| MatchCommand::Move { player, uci, reply })
            .await?
    }

    /// FEN of the position `uci` would lead to.
    pub async fn preview(&self, uci: impl Into<String>) -> Result<String> {
        let uci = uci.into();
        self.request(|reply| MatchCommand::Preview { uci, reply }).await?
    }

    pub async fn legal_moves(&self, from: Option<Square>) -> Result<Vec<GameMove>> {
        self.request(|reply| MatchCommand::LegalMoves { from, reply })
            .await
    }

    pub async fn offer_draw(&self, player: PlayerId) -> Result<bool> {
        self.request(|reply| MatchCommand::OfferDraw { player, reply })
            .await?
    }

    pub async fn accept_draw(&self, player: PlayerId) -> Result<GameOutcome> {
        self.request(|reply| MatchCommand::AcceptDraw { player, reply })
            .await?
    }

    pub async fn decline_draw(&self, player: PlayerId) -> Result<()> {
        self.request(|reply| MatchCommand::DeclineDraw { player, reply })
            .await?
    }

    pub async fn offer_undo(&self, player: PlayerId) -> Result<()> {
        self.request(|reply| MatchCommand::OfferUndo { player, reply })
            .await?
    }

    pub async fn accept_undo(&self, player: PlayerId) -> Result<String> {
        self.request(|reply| MatchCommand::AcceptUndo { player, reply })
            .await?
    }

    pub async fn resign(&self, player: PlayerId) -> Result<GameOutcome> {
        self.request(|reply| MatchCommand::Resign { player, reply })
            .await?
    }

    /// Check the clock now instead of waiting for the next tick.
    pub async fn on_timeout(&self) -> Result<Option<GameOutcome>> {
        self.request(|reply| MatchCommand::Timeout { reply }).await
    }

    pub async fn view(&self) -> Result<MatchView> {
        self.request(|reply| MatchCommand::View { reply }).await
    }

    /// Ask the actor to stop. Returns once the request is queued.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(MatchCommand::Shutdown).await;
    }
}

struct MatchActor {
    info: MatchInfo,
    engine: MatchEngine,
    gateways: Gateways,
    completions: mpsc::UnboundedSender<MatchCompletion>,
    ticker: Option<JoinHandle<()>>,
    linger: Duration,
    /// Set once the result has been reported.
    linger_until: Option<Instant>,
}

pub(crate) struct ActorSettings {
    pub tick_interval: Duration,
    pub linger: Duration,
}

pub(crate) fn spawn(
    info: MatchInfo,
    engine: MatchEngine,
    gateways: Gateways,
    completions: mpsc::UnboundedSender<MatchCompletion>,
    settings: ActorSettings,
) -> MatchHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let ticker = spawn_ticker(tx.downgrade(), settings.tick_interval);
    let actor = MatchActor {
        info: info.clone(),
        engine,
        gateways,
        completions,
        ticker: Some(ticker),
        linger: settings.linger,
        linger_until: None,
    };
    tokio::spawn(actor.run(rx));
    MatchHandle { info, tx }
}

/// Feed `Tick` into the match's own queue until the match goes away.
fn spawn_ticker(tx: mpsc::WeakSender<MatchCommand>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(tx) = tx.upgrade() else { break };
            if tx.send(MatchCommand::Tick).await.is_err() {
                break;
            }
        }
    })
}

impl MatchActor {
    async fn run(mut self, mut rx: mpsc::Receiver<MatchCommand>) {
        tracing::info!(
            match_id = %self.info.id,
            white = %self.info.white,
            black = %self.info.black,
            mode = %self.info.mode,
            time_control = %self.info.time_control,
            "match started"
        );
        loop {
            let cmd = match self.linger_until {
                Some(deadline) => tokio::select! {
                    cmd = rx.recv() => cmd,
                    _ = tokio::time::sleep_until(deadline) => None,
                },
                None => rx.recv().await,
            };
            let Some(cmd) = cmd else { break };
            if matches!(cmd, MatchCommand::Shutdown) {
                break;
            }
            self.handle(cmd).await;
            if self.linger_until.is_none() && self.engine.is_over() {
                self.report().await;
            }
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.engine.dispose(Instant::now());
        tracing::debug!(match_id = %self.info.id, "match actor stopped");
    }

    async fn handle(&mut self, cmd: MatchCommand) {
        let now = Instant::now();
        match cmd {
            MatchCommand::Move { player, uci, reply } => {
                let result = self.apply_move(player, &uci, now).await;
                let _ = reply.send(result);
            }
            MatchCommand::Preview { uci, reply } => {
                let _ = reply.send(self.engine.preview(&uci).map(|pos| pos.to_fen()));
            }
            MatchCommand::LegalMoves { from, reply } => {
                let _ = reply.send(self.engine.legal_moves(from));
            }
            MatchCommand::OfferDraw { player, reply } => {
                let result = self.offer_draw(player, now).await;
                let _ = reply.send(result);
            }
            MatchCommand::AcceptDraw { player, reply } => {
                let result = self
                    .info
                    .color_of(player)
                    .and_then(|color| self.engine.accept_draw(color, now));
                let _ = reply.send(result);
            }
            MatchCommand::DeclineDraw { player, reply } => {
                let result = self.decline_draw(player, now).await;
                let _ = reply.send(result);
            }
            MatchCommand::OfferUndo { player, reply } => {
                let result = self.offer_undo(player, now).await;
                let _ = reply.send(result);
            }
            MatchCommand::AcceptUndo { player, reply } => {
                let result = self.accept_undo(player, now).await;
                let _ = reply.send(result);
            }
            MatchCommand::Resign { player, reply } => {
                let result = self
                    .info
                    .color_of(player)
                    .map(|color| self.engine.resign(color, now));
                let _ = reply.send(result);
            }
            MatchCommand::Timeout { reply } => {
                self.engine.tick(now);
                let _ = reply.send(self.engine.outcome());
            }
            MatchCommand::View { reply } => {
                let _ = reply.send(self.view(now));
            }
            MatchCommand::Tick => {
                self.engine.tick(now);
            }
            // Handled by the run loop.
            MatchCommand::Shutdown => {}
        }
    }

    async fn apply_move(&mut self, player: PlayerId, uci: &str, now: Instant) -> Result<MoveApplied> {
        let color = self.info.color_of(player)?;
        let applied = match self.engine.apply_move(color, uci, now) {
            Ok(applied) => applied,
            Err(err) => {
                tracing::debug!(match_id = %self.info.id, %player, uci, error = %err, "move rejected");
                return Err(err);
            }
        };
        let event = ArenaEvent::MoveApplied {
            match_id: self.info.id,
            uci: applied.uci.clone(),
            fen: applied.fen.clone(),
            side_to_move: applied.side_to_move,
            white_ms: applied.white_ms,
            black_ms: applied.black_ms,
            extra_turn: applied.extra_turn,
        };
        self.gateways.notify(Target::Match(self.info.id), event).await;
        self.persist_progress().await;
        Ok(applied)
    }

    async fn offer_draw(&mut self, player: PlayerId, now: Instant) -> Result<bool> {
        let by = self.info.color_of(player)?;
        let agreed = self.engine.offer_draw(by, now)?;
        if !agreed {
            let event = ArenaEvent::DrawOffered {
                match_id: self.info.id,
                by,
            };
            self.gateways.notify(Target::Match(self.info.id), event).await;
        }
        Ok(agreed)
    }

    async fn decline_draw(&mut self, player: PlayerId, now: Instant) -> Result<()> {
        let by = self.info.color_of(player)?;
        self.engine.decline_draw(by, now)?;
        let event = ArenaEvent::DrawDeclined {
            match_id: self.info.id,
            by,
        };
        self.gateways.notify(Target::Match(self.info.id), event).await;
        Ok(())
    }

    async fn offer_undo(&mut self, player: PlayerId, now: Instant) -> Result<()> {
        let by = self.info.color_of(player)?;
        self.engine.offer_undo(by, now)?;
        let event = ArenaEvent::UndoOffered {
            match_id: self.info.id,
            by,
        };
        self.gateways.notify(Target::Match(self.info.id), event).await;
        Ok(())
    }

    async fn accept_undo(&mut self, player: PlayerId, now: Instant) -> Result<String> {
        let by = self.info.color_of(player)?;
        let fen = self.engine.accept_undo(by, now)?;
        let event = ArenaEvent::MoveUndone {
            match_id: self.info.id,
            fen: fen.clone(),
        };
        self.gateways.notify(Target::Match(self.info.id), event).await;
        self.persist_progress().await;
        Ok(fen)
    }

    fn view(&self, now: Instant) -> MatchView {
        let draw_offered_by = Color::ALL
            .into_iter()
            .find(|&c| self.engine.is_draw_offered(c));
        MatchView {
            info: self.info.clone(),
            fen: self.engine.fen(),
            side_to_move: self.engine.side_to_move(),
            moves: self.engine.moves().to_vec(),
            white_ms: self.engine.remaining_ms(Color::White, now),
            black_ms: self.engine.remaining_ms(Color::Black, now),
            outcome: self.engine.outcome(),
            draw_offered_by,
            undo_offered_by: self.engine.undo_offered_by(),
        }
    }

    async fn persist_progress(&self) {
        let patch = MatchPatch {
            fen: Some(self.engine.fen()),
            moves: Some(self.engine.moves().to_vec()),
            ..MatchPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_match(self.info.id, patch).await {
            tracing::warn!(match_id = %self.info.id, error = %err, "failed to persist match progress");
        }
    }

    /// Stop the clock task, announce the result, store it and hand the
    /// completion to whoever listens. Runs once per match.
    async fn report(&mut self) {
        let Some(outcome) = self.engine.outcome() else {
            return;
        };
        self.linger_until = Some(Instant::now() + self.linger);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let id = self.info.id;
        let finished_at = Utc::now();

        self.gateways
            .notify(Target::Match(id), ArenaEvent::GameOver { match_id: id, outcome })
            .await;

        let patch = MatchPatch {
            fen: Some(self.engine.fen()),
            moves: Some(self.engine.moves().to_vec()),
            outcome: Some(outcome),
            finished_at: Some(finished_at),
        };
        if let Err(err) = self.gateways.store.patch_match(id, patch).await {
            tracing::warn!(match_id = %id, error = %err, "failed to persist match result");
        }

        let completion = MatchCompletion {
            match_id: id,
            competition: self.info.competition,
            white: self.info.white,
            black: self.info.black,
            outcome,
            finished_at,
        };
        if self.completions.send(completion).is_err() {
            tracing::warn!(match_id = %id, "no listener for match completions");
        }
        tracing::info!(
            match_id = %id,
            winner = ?outcome.winner.map(|c| self.info.player(c)),
            reason = %outcome.reason,
            "match finished"
        );
    }
}

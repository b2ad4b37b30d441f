//! Directory of live matches.

use arena_core::{
    ArenaConfig, ArenaError, ArenaEvent, CompetitionId, GameMode, GameOutcome, Gateways, MatchId,
    MatchRecord, MatchType, PlayerId, Result, Target, TimeControl, UpgradeKind,
};
use chess_core::{Color, Square};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;

use crate::actor::{self, ActorSettings, MatchHandle, MatchInfo, MatchView};
use crate::engine::{EngineSetup, MatchEngine, MoveApplied};
use crate::moves::GameMove;

/// Request to start a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSettings {
    pub id: MatchId,
    pub white: PlayerId,
    pub black: PlayerId,
    pub mode: GameMode,
    pub match_type: MatchType,
    pub time_control: TimeControl,
    pub upgrades: Vec<UpgradeKind>,
    pub competition: Option<CompetitionId>,
}

impl MatchSettings {
    /// Casual game with a fresh id and no upgrades.
    pub fn new(white: PlayerId, black: PlayerId, mode: GameMode, time_control: TimeControl) -> Self {
        Self {
            id: MatchId::new(),
            white,
            black,
            mode,
            match_type: MatchType::Casual,
            time_control,
            upgrades: Vec::new(),
            competition: None,
        }
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_upgrades(mut self, upgrades: impl IntoIterator<Item = UpgradeKind>) -> Self {
        self.upgrades = upgrades.into_iter().collect();
        self
    }

    pub fn in_competition(mut self, competition: CompetitionId) -> Self {
        self.competition = Some(competition);
        self
    }

    pub fn with_id(mut self, id: MatchId) -> Self {
        self.id = id;
        self
    }

    /// Takebacks are a courtesy of casual games outside competitions.
    pub fn allows_undo(&self) -> bool {
        self.match_type == MatchType::Casual && self.competition.is_none()
    }
}

/// Sent exactly once when a match ends.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCompletion {
    pub match_id: MatchId,
    pub competition: Option<CompetitionId>,
    pub white: PlayerId,
    pub black: PlayerId,
    pub outcome: GameOutcome,
    pub finished_at: DateTime<Utc>,
}

impl MatchCompletion {
    pub fn winner(&self) -> Option<PlayerId> {
        self.outcome.winner.map(|c| match c {
            Color::White => self.white,
            Color::Black => self.black,
        })
    }
}

pub struct MatchRegistry {
    config: ArenaConfig,
    gateways: Gateways,
    matches: RwLock<HashMap<MatchId, MatchHandle>>,
    completions: mpsc::UnboundedSender<MatchCompletion>,
}

impl MatchRegistry {
    /// The receiver yields one [`MatchCompletion`] per finished match.
    pub fn new(
        config: ArenaConfig,
        gateways: Gateways,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<MatchCompletion>) {
        let (completions, rx) = mpsc::unbounded_channel();
        let registry = Self {
            config,
            gateways,
            matches: RwLock::new(HashMap::new()),
            completions,
        };
        (Arc::new(registry), rx)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    /// Persist and start a match. Nothing is started if the store refuses
    /// the record.
    pub async fn create_match(&self, settings: MatchSettings) -> Result<MatchHandle> {
        if settings.white == settings.black {
            return Err(ArenaError::validation("a player cannot play themselves"));
        }
        if self.matches.read().await.contains_key(&settings.id) {
            return Err(ArenaError::conflict(format!("match {} already exists", settings.id)));
        }

        let setup = EngineSetup::new(settings.mode, settings.time_control)
            .with_upgrades(settings.upgrades.iter().copied())
            .with_undo(settings.allows_undo());
        let engine = {
            let mut rng = rand::thread_rng();
            MatchEngine::new(&setup, &self.config.upgrades, &mut rng, Instant::now())
        };

        let record = MatchRecord {
            id: settings.id,
            white: settings.white,
            black: settings.black,
            mode: settings.mode,
            match_type: settings.match_type,
            time_control: settings.time_control,
            upgrades: settings.upgrades.clone(),
            competition: settings.competition,
            fen: engine.fen(),
            moves: Vec::new(),
            outcome: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.gateways.store.create_match(record).await?;

        let info = MatchInfo {
            id: settings.id,
            white: settings.white,
            black: settings.black,
            mode: settings.mode,
            match_type: settings.match_type,
            time_control: settings.time_control,
            competition: settings.competition,
        };
        let actor_settings = ActorSettings {
            tick_interval: Duration::from_millis(self.config.clock.tick_interval_ms.max(1)),
            linger: Duration::from_millis(self.config.clock.finished_linger_ms),
        };
        let handle = actor::spawn(
            info,
            engine,
            self.gateways.clone(),
            self.completions.clone(),
            actor_settings,
        );
        self.matches.write().await.insert(settings.id, handle.clone());

        for player in [settings.white, settings.black] {
            let event = ArenaEvent::MatchFound {
                match_id: settings.id,
                white: settings.white,
                black: settings.black,
                mode: settings.mode,
                time_control: settings.time_control,
            };
            self.gateways.notify(Target::Player(player), event).await;
        }
        Ok(handle)
    }

    /// Handle of a match whose actor is still running.
    pub async fn get(&self, id: MatchId) -> Result<MatchHandle> {
        let handle = self.matches.read().await.get(&id).cloned();
        match handle {
            Some(handle) if !handle.is_closed() => Ok(handle),
            Some(_) => {
                self.matches.write().await.remove(&id);
                Err(ArenaError::not_found("match", id))
            }
            None => Err(ArenaError::not_found("match", id)),
        }
    }

    pub async fn live_matches(&self) -> Vec<MatchId> {
        self.matches
            .read()
            .await
            .iter()
            .filter(|(_, h)| !h.is_closed())
            .map(|(id, _)| *id)
            .collect()
    }

    pub async fn apply_move(&self, id: MatchId, player: PlayerId, uci: &str) -> Result<MoveApplied> {
        self.get(id).await?.apply_move(player, uci).await
    }

    pub async fn preview(&self, id: MatchId, uci: &str) -> Result<String> {
        self.get(id).await?.preview(uci).await
    }

    pub async fn legal_moves(&self, id: MatchId, from: Option<Square>) -> Result<Vec<GameMove>> {
        self.get(id).await?.legal_moves(from).await
    }

    pub async fn offer_draw(&self, id: MatchId, player: PlayerId) -> Result<bool> {
        self.get(id).await?.offer_draw(player).await
    }

    pub async fn accept_draw(&self, id: MatchId, player: PlayerId) -> Result<GameOutcome> {
        self.get(id).await?.accept_draw(player).await
    }

    pub async fn decline_draw(&self, id: MatchId, player: PlayerId) -> Result<()> {
        self.get(id).await?.decline_draw(player).await
    }

    pub async fn offer_undo(&self, id: MatchId, player: PlayerId) -> Result<()> {
        self.get(id).await?.offer_undo(player).await
    }

    pub async fn accept_undo(&self, id: MatchId, player: PlayerId) -> Result<String> {
        self.get(id).await?.accept_undo(player).await
    }

    pub async fn resign(&self, id: MatchId, player: PlayerId) -> Result<GameOutcome> {
        self.get(id).await?.resign(player).await
    }

    pub async fn on_timeout(&self, id: MatchId) -> Result<Option<GameOutcome>> {
        self.get(id).await?.on_timeout().await
    }

    pub async fn view(&self, id: MatchId) -> Result<MatchView> {
        self.get(id).await?.view().await
    }

    /// Forget a match and stop its actor. Returns whether it was known.
    pub async fn dispose(&self, id: MatchId) -> bool {
        let removed = self.matches.write().await.remove(&id);
        match removed {
            Some(handle) => {
                handle.shutdown().await;
                tracing::debug!(match_id = %id, "match disposed");
                true
            }
            None => false,
        }
    }
}

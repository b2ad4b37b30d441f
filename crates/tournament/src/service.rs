//! Competition service: enrollment, round scheduling and completion
//! handling.
//!
//! Each competition sits behind its own mutex. Every state change is made
//! under that lock, so a match completion and a round start for the same
//! competition never interleave; unrelated competitions proceed in parallel.

use arena_core::{
    ArenaConfig, ArenaError, ArenaEvent, CompetitionId, CompetitionPatch, CompetitionStatus,
    GameMode, GatewayError, Gateways, MatchType, PlayerId, PlayerPatch, RatingBucket, Result,
    Target, TimeControl,
};
use arena_runner::{MatchCompletion, MatchRegistry, MatchSettings};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::competition::Competition;
use crate::elo::EloCalculator;
use crate::strategy::{FinishSummary, RoundStep};

pub struct CompetitionService {
    registry: Arc<MatchRegistry>,
    gateways: Gateways,
    config: ArenaConfig,
    elo: EloCalculator,
    competitions: RwLock<HashMap<CompetitionId, Arc<Mutex<Competition>>>>,
}

impl CompetitionService {
    pub fn new(registry: Arc<MatchRegistry>) -> Arc<Self> {
        let config = registry.config().clone();
        Arc::new(Self {
            gateways: registry.gateways().clone(),
            elo: EloCalculator::new(config.rating.k_factor),
            config,
            registry,
            competitions: RwLock::new(HashMap::new()),
        })
    }

    /// Feed completions from the match registry into this service until the
    /// registry is dropped.
    pub fn spawn_completion_listener(
        self: &Arc<Self>,
        mut completions: mpsc::UnboundedReceiver<MatchCompletion>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(completion) = completions.recv().await {
                let match_id = completion.match_id;
                if let Err(err) = service.on_match_completion(completion).await {
                    tracing::warn!(%match_id, error = %err, "competition update failed");
                }
            }
            tracing::debug!("completion listener stopped");
        })
    }

    async fn get(&self, id: CompetitionId) -> Result<Arc<Mutex<Competition>>> {
        self.competitions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ArenaError::not_found("competition", id))
    }

    /// Copy of a competition's current state.
    pub async fn snapshot(&self, id: CompetitionId) -> Result<Competition> {
        let competition = self.get(id).await?;
        let snapshot = competition.lock().await.clone();
        Ok(snapshot)
    }

    pub async fn active_competitions(&self) -> Vec<CompetitionId> {
        self.competitions.read().await.keys().copied().collect()
    }

    pub async fn create_competition(
        &self,
        name: &str,
        mode: GameMode,
        time_control: TimeControl,
    ) -> Result<CompetitionId> {
        let id = CompetitionId::new();
        let competition = Competition::new(id, name, mode, time_control, &self.config);
        self.gateways
            .store
            .create_competition(competition.record())
            .await?;
        tracing::info!(
            competition_id = %id,
            %mode,
            format = competition.strategy().name(),
            rounds = competition.total_rounds,
            "competition created"
        );
        self.competitions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(competition)));
        Ok(id)
    }

    /// Enroll a player who is not in any other competition.
    pub async fn join(&self, id: CompetitionId, player: PlayerId) -> Result<()> {
        let competition = self.get(id).await?;
        let mut competition = competition.lock().await;

        let record = self.gateways.store.fetch_player(player).await?;
        if let Some(other) = record.active_competition {
            return Err(ArenaError::conflict(format!(
                "player {player} is already in competition {other}"
            )));
        }
        competition.enroll(player)?;

        let marker = PlayerPatch {
            active_competition: Some(Some(id)),
            ..PlayerPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_player(player, marker).await {
            competition.withdraw(player)?;
            return Err(err.into());
        }
        self.save_players(&competition).await;
        tracing::info!(competition_id = %id, %player, enrolled = competition.players.len(), "player joined");
        Ok(())
    }

    /// Withdraw before the competition starts.
    pub async fn leave(&self, id: CompetitionId, player: PlayerId) -> Result<()> {
        let competition = self.get(id).await?;
        let mut competition = competition.lock().await;
        competition.withdraw(player)?;

        let marker = PlayerPatch {
            active_competition: Some(None),
            ..PlayerPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_player(player, marker).await {
            tracing::warn!(competition_id = %id, %player, error = %err, "failed to clear competition marker");
        }
        self.save_players(&competition).await;
        tracing::info!(competition_id = %id, %player, "player left");
        Ok(())
    }

    async fn save_players(&self, competition: &Competition) {
        let patch = CompetitionPatch {
            players: Some(competition.players.clone()),
            ..CompetitionPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_competition(competition.id, patch).await {
            tracing::warn!(competition_id = %competition.id, error = %err, "failed to save enrollment");
        }
    }

    /// Seed the field by current rating and start round one.
    pub async fn start_competition(&self, id: CompetitionId) -> Result<()> {
        let competition = self.get(id).await?;
        let mut competition = competition.lock().await;

        if competition.status != CompetitionStatus::Pending {
            return Err(ArenaError::conflict(format!("competition {id} has already started")));
        }
        let needed = competition.min_players(&self.config);
        if competition.players.len() < needed {
            return Err(ArenaError::validation(format!(
                "competition {id} needs {needed} players, has {}",
                competition.players.len()
            )));
        }

        let ratings = self
            .current_ratings(&competition.players, competition.bucket())
            .await;
        competition.seed(&ratings);
        competition.status = CompetitionStatus::Started;

        let patch = CompetitionPatch {
            status: Some(CompetitionStatus::Started),
            players: Some(competition.players.clone()),
            ..CompetitionPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_competition(id, patch).await {
            tracing::warn!(competition_id = %id, error = %err, "failed to save competition start");
        }
        self.gateways
            .notify(
                Target::Competition(id),
                ArenaEvent::CompetitionStarted {
                    competition_id: id,
                    total_rounds: competition.total_rounds,
                },
            )
            .await;
        tracing::info!(
            competition_id = %id,
            players = competition.players.len(),
            rounds = competition.total_rounds,
            "competition started"
        );

        self.advance(&mut competition).await
    }

    /// Record a finished match and move its competition on when the round
    /// is complete. Completions for unknown, finished or already recorded
    /// matches are ignored.
    pub async fn on_match_completion(&self, completion: MatchCompletion) -> Result<()> {
        let Some(id) = completion.competition else {
            return Ok(());
        };
        let competition = match self.get(id).await {
            Ok(competition) => competition,
            Err(_) => {
                tracing::debug!(competition_id = %id, match_id = %completion.match_id, "late completion ignored");
                return Ok(());
            }
        };
        let mut competition = competition.lock().await;
        if competition.status != CompetitionStatus::Started {
            return Ok(());
        }

        let strategy = competition.strategy();
        if !strategy.handle_match_completion(&mut competition, &completion)? {
            tracing::debug!(competition_id = %id, match_id = %completion.match_id, "duplicate completion ignored");
            return Ok(());
        }
        tracing::debug!(
            competition_id = %id,
            match_id = %completion.match_id,
            reason = %completion.outcome.reason,
            "competition game finished"
        );
        self.close_round(&mut competition).await
    }

    /// Pair rounds until one has a game still to play or the competition
    /// ends.
    async fn advance(&self, competition: &mut Competition) -> Result<()> {
        loop {
            self.open_round(competition).await?;
            if !competition.round_complete() {
                return Ok(());
            }
            match self.publish_round(competition).await {
                Some(RoundStep::NextRound) => continue,
                Some(RoundStep::Finish) => {
                    self.finish(competition).await;
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }

    async fn close_round(&self, competition: &mut Competition) -> Result<()> {
        match self.publish_round(competition).await {
            Some(RoundStep::NextRound) => self.advance(competition).await,
            Some(RoundStep::Finish) => {
                self.finish(competition).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Pair the next round, announce it and start its games.
    async fn open_round(&self, competition: &mut Competition) -> Result<()> {
        let strategy = competition.strategy();
        let id = competition.id;
        let round = strategy.start_round(competition)?;
        let number = round.number;
        let pairings = round.summaries();
        let games: Vec<_> = round.pending_games().collect();

        let patch = CompetitionPatch {
            current_round: Some(number),
            ..CompetitionPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_competition(id, patch).await {
            tracing::warn!(competition_id = %id, error = %err, "failed to save round");
        }
        self.gateways
            .notify(
                Target::Competition(id),
                ArenaEvent::RoundStarted {
                    competition_id: id,
                    round: number,
                    pairings,
                },
            )
            .await;
        tracing::info!(competition_id = %id, round = number, games = games.len(), "round started");

        for (match_id, white, black) in games {
            let settings =
                MatchSettings::new(white, black, competition.mode, competition.time_control)
                    .match_type(MatchType::Rated)
                    .in_competition(id)
                    .with_id(match_id);
            if let Err(err) = self.registry.create_match(settings).await {
                // The pairing stands but the game is void: no points, no rating.
                tracing::warn!(competition_id = %id, %match_id, error = %err, "competition match could not start");
                competition.record_result(match_id, None, Utc::now())?;
            }
        }
        Ok(())
    }

    /// Snapshot the leaderboard once every game of the round is in.
    async fn publish_round(&self, competition: &mut Competition) -> Option<RoundStep> {
        let strategy = competition.strategy();
        let done = strategy.handle_round_completion(competition)?;
        let id = competition.id;

        let patch = CompetitionPatch {
            leaderboard: Some(done.leaderboard.clone()),
            ..CompetitionPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_competition(id, patch).await {
            tracing::warn!(competition_id = %id, error = %err, "failed to save leaderboard");
        }
        self.gateways
            .notify(
                Target::Competition(id),
                ArenaEvent::LeaderboardUpdated {
                    competition_id: id,
                    round: done.round,
                    entries: done.leaderboard,
                },
            )
            .await;
        tracing::info!(competition_id = %id, round = done.round, "round complete");
        Some(done.next)
    }

    /// End a running competition early, rating the games decided so far.
    pub async fn finish_competition(&self, id: CompetitionId) -> Result<FinishSummary> {
        let competition = self.get(id).await?;
        let mut competition = competition.lock().await;
        if competition.status != CompetitionStatus::Started {
            return Err(ArenaError::conflict(format!("competition {id} is not running")));
        }
        for (match_id, white, black) in competition
            .round()
            .map(|r| r.pending_games().collect::<Vec<_>>())
            .unwrap_or_default()
        {
            tracing::debug!(competition_id = %id, %match_id, %white, %black, "unfinished game left unrated");
            self.registry.dispose(match_id).await;
        }
        Ok(self.finish(&mut competition).await)
    }

    async fn finish(&self, competition: &mut Competition) -> FinishSummary {
        let id = competition.id;
        let bucket = competition.bucket();
        let ratings = self.current_ratings(&competition.players, bucket).await;

        let strategy = competition.strategy();
        let summary = strategy.finish(
            competition,
            &ratings,
            &self.elo,
            self.config.rating.default_rating,
        );

        let updates = summary.rating_changes.iter().map(|&(player, delta)| {
            let rating = ratings
                .get(&player)
                .copied()
                .unwrap_or(self.config.rating.default_rating)
                + delta;
            let patch = PlayerPatch {
                rating: Some((bucket, rating)),
                ..PlayerPatch::default()
            };
            async move { (player, self.gateways.store.patch_player(player, patch).await) }
        });
        report_failures(id, "rating update", join_all(updates).await);

        let releases = competition.players.iter().map(|&player| {
            let patch = PlayerPatch {
                active_competition: Some(None),
                ..PlayerPatch::default()
            };
            async move { (player, self.gateways.store.patch_player(player, patch).await) }
        });
        report_failures(id, "marker release", join_all(releases).await);

        let patch = CompetitionPatch {
            status: Some(CompetitionStatus::Finished),
            winner: summary.winner,
            leaderboard: Some(summary.leaderboard.clone()),
            ..CompetitionPatch::default()
        };
        if let Err(err) = self.gateways.store.patch_competition(id, patch).await {
            tracing::warn!(competition_id = %id, error = %err, "failed to save competition result");
        }
        self.gateways
            .notify(
                Target::Competition(id),
                ArenaEvent::CompetitionFinished {
                    competition_id: id,
                    winner: summary.winner,
                    leaderboard: summary.leaderboard.clone(),
                },
            )
            .await;

        self.competitions.write().await.remove(&id);
        tracing::info!(
            competition_id = %id,
            winner = ?summary.winner,
            rated_players = summary.rating_changes.len(),
            "competition finished"
        );
        summary
    }

    /// Ratings for every player; lookups that fail fall back to the
    /// configured default.
    async fn current_ratings(
        &self,
        players: &[PlayerId],
        bucket: RatingBucket,
    ) -> HashMap<PlayerId, i32> {
        let lookups = players.iter().map(|&player| async move {
            (player, self.gateways.ratings.rating(player, bucket).await)
        });
        join_all(lookups)
            .await
            .into_iter()
            .map(|(player, rating)| {
                let rating = rating.unwrap_or_else(|err| {
                    tracing::warn!(%player, error = %err, "rating lookup failed, using default");
                    self.config.rating.default_rating
                });
                (player, rating)
            })
            .collect()
    }
}

type Outcomes = Vec<(PlayerId, std::result::Result<(), GatewayError>)>;

/// Log every failed call of a per-player fan-out.
fn report_failures(id: CompetitionId, what: &str, results: Outcomes) {
    let failed = results
        .into_iter()
        .filter_map(|(player, result)| result.err().map(|err| (player, err)))
        .inspect(|(player, err)| {
            tracing::warn!(competition_id = %id, %player, error = %err, "{what} failed");
        })
        .count();
    if failed > 0 {
        tracing::warn!(competition_id = %id, failed, "{what} incomplete");
    }
}

//! In-memory gateway implementations for tests and single-process embedding.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::GatewayError;
use crate::event::{ArenaEvent, Target};
use crate::gateway::*;
use crate::ids::{CompetitionId, MatchId, PlayerId};
use crate::mode::RatingBucket;

#[derive(Default)]
struct Tables {
    matches: HashMap<MatchId, MatchRecord>,
    players: HashMap<PlayerId, PlayerRecord>,
    competitions: HashMap<CompetitionId, CompetitionRecord>,
    failing_players: HashSet<PlayerId>,
}

/// Persistence and rating lookup backed by hash maps.
///
/// Players missing a rating in a bucket are reported at `default_rating`.
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    default_rating: i32,
}

impl MemoryGateway {
    pub fn new(default_rating: i32) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            default_rating,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_player(&self, record: PlayerRecord) {
        self.lock().players.insert(record.id, record);
    }

    /// Register a player with a single rating.
    pub fn add_player(&self, name: &str, bucket: RatingBucket, rating: i32) -> PlayerId {
        let mut record = PlayerRecord::new(PlayerId::new(), name);
        record.set_rating(bucket, rating);
        let id = record.id;
        self.insert_player(record);
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.lock().players.get(&id).cloned()
    }

    pub fn match_record(&self, id: MatchId) -> Option<MatchRecord> {
        self.lock().matches.get(&id).cloned()
    }

    pub fn matches(&self) -> Vec<MatchRecord> {
        self.lock().matches.values().cloned().collect()
    }

    pub fn competition(&self, id: CompetitionId) -> Option<CompetitionRecord> {
        self.lock().competitions.get(&id).cloned()
    }

    /// Make every later `patch_player` for `id` fail with an internal error.
    pub fn fail_player_patches(&self, id: PlayerId) {
        self.lock().failing_players.insert(id);
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new(1200)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn create_match(&self, record: MatchRecord) -> Result<(), GatewayError> {
        let mut tables = self.lock();
        if tables.matches.contains_key(&record.id) {
            return Err(GatewayError::Conflict {
                reason: format!("match {} already exists", record.id),
            });
        }
        tables.matches.insert(record.id, record);
        Ok(())
    }

    async fn patch_match(&self, id: MatchId, patch: MatchPatch) -> Result<(), GatewayError> {
        let mut tables = self.lock();
        let record = tables
            .matches
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found("match", id))?;
        if let Some(fen) = patch.fen {
            record.fen = fen;
        }
        if let Some(moves) = patch.moves {
            record.moves = moves;
        }
        if patch.outcome.is_some() {
            record.outcome = patch.outcome;
        }
        if patch.finished_at.is_some() {
            record.finished_at = patch.finished_at;
        }
        Ok(())
    }

    async fn fetch_match(&self, id: MatchId) -> Result<MatchRecord, GatewayError> {
        self.match_record(id)
            .ok_or_else(|| GatewayError::not_found("match", id))
    }

    async fn fetch_player(&self, id: PlayerId) -> Result<PlayerRecord, GatewayError> {
        self.player(id)
            .ok_or_else(|| GatewayError::not_found("player", id))
    }

    async fn patch_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<(), GatewayError> {
        let mut tables = self.lock();
        if tables.failing_players.contains(&id) {
            return Err(GatewayError::internal(format!("injected failure for player {id}")));
        }
        let record = tables
            .players
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found("player", id))?;
        if let Some((bucket, rating)) = patch.rating {
            record.set_rating(bucket, rating);
        }
        if let Some(active) = patch.active_competition {
            record.active_competition = active;
        }
        Ok(())
    }

    async fn create_competition(&self, record: CompetitionRecord) -> Result<(), GatewayError> {
        let mut tables = self.lock();
        if tables.competitions.contains_key(&record.id) {
            return Err(GatewayError::Conflict {
                reason: format!("competition {} already exists", record.id),
            });
        }
        tables.competitions.insert(record.id, record);
        Ok(())
    }

    async fn patch_competition(
        &self,
        id: CompetitionId,
        patch: CompetitionPatch,
    ) -> Result<(), GatewayError> {
        let mut tables = self.lock();
        let record = tables
            .competitions
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found("competition", id))?;
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(players) = patch.players {
            record.players = players;
        }
        if let Some(round) = patch.current_round {
            record.current_round = round;
        }
        if patch.winner.is_some() {
            record.winner = patch.winner;
        }
        if let Some(leaderboard) = patch.leaderboard {
            record.leaderboard = leaderboard;
        }
        Ok(())
    }

    async fn fetch_competition(
        &self,
        id: CompetitionId,
    ) -> Result<CompetitionRecord, GatewayError> {
        self.competition(id)
            .ok_or_else(|| GatewayError::not_found("competition", id))
    }
}

#[async_trait]
impl RatingLookup for MemoryGateway {
    async fn rating(&self, player: PlayerId, bucket: RatingBucket) -> Result<i32, GatewayError> {
        let tables = self.lock();
        let record = tables
            .players
            .get(&player)
            .ok_or_else(|| GatewayError::not_found("player", player))?;
        Ok(record.rating(bucket).unwrap_or(self.default_rating))
    }
}

/// Broadcaster that records every event it is asked to deliver.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(Target, ArenaEvent)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Target, ArenaEvent)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Names of recorded events, in delivery order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|(_, e)| e.name()).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn send(&self, target: Target, event: ArenaEvent) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((target, event));
        Ok(())
    }
}

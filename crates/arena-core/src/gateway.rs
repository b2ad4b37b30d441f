//! Contracts for the collaborators the core depends on.
//!
//! The core never retries a gateway call; failures are reported to the
//! caller or logged, depending on the operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::event::{ArenaEvent, LeaderboardEntry, Target};
use crate::ids::{CompetitionId, MatchId, PlayerId};
use crate::mode::{GameMode, MatchType, RatingBucket, TimeControl, UpgradeKind};
use crate::outcome::GameOutcome;

/// Stored view of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub white: PlayerId,
    pub black: PlayerId,
    pub mode: GameMode,
    pub match_type: MatchType,
    pub time_control: TimeControl,
    pub upgrades: Vec<UpgradeKind>,
    pub competition: Option<CompetitionId>,
    pub fen: String,
    pub moves: Vec<String>,
    pub outcome: Option<GameOutcome>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Partial update of a match; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPatch {
    pub fen: Option<String>,
    pub moves: Option<Vec<String>>,
    pub outcome: Option<GameOutcome>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    /// One entry per bucket the player has a rating in.
    pub ratings: Vec<(RatingBucket, i32)>,
    /// Competition the player is currently enrolled in, if any.
    pub active_competition: Option<CompetitionId>,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ratings: Vec::new(),
            active_competition: None,
        }
    }

    pub fn rating(&self, bucket: RatingBucket) -> Option<i32> {
        self.ratings.iter().find(|(b, _)| *b == bucket).map(|(_, r)| *r)
    }

    pub fn set_rating(&mut self, bucket: RatingBucket, rating: i32) {
        match self.ratings.iter_mut().find(|(b, _)| *b == bucket) {
            Some(entry) => entry.1 = rating,
            None => self.ratings.push((bucket, rating)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPatch {
    pub rating: Option<(RatingBucket, i32)>,
    /// `Some(None)` clears the marker.
    pub active_competition: Option<Option<CompetitionId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Pending,
    Started,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionRecord {
    pub id: CompetitionId,
    pub name: String,
    pub mode: GameMode,
    pub time_control: TimeControl,
    pub status: CompetitionStatus,
    pub players: Vec<PlayerId>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub winner: Option<PlayerId>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitionPatch {
    pub status: Option<CompetitionStatus>,
    pub players: Option<Vec<PlayerId>>,
    pub current_round: Option<u32>,
    pub winner: Option<PlayerId>,
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

/// Durable storage of matches, players and competitions.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn create_match(&self, record: MatchRecord) -> Result<(), GatewayError>;
    async fn patch_match(&self, id: MatchId, patch: MatchPatch) -> Result<(), GatewayError>;
    async fn fetch_match(&self, id: MatchId) -> Result<MatchRecord, GatewayError>;

    async fn fetch_player(&self, id: PlayerId) -> Result<PlayerRecord, GatewayError>;
    async fn patch_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<(), GatewayError>;

    async fn create_competition(&self, record: CompetitionRecord) -> Result<(), GatewayError>;
    async fn patch_competition(
        &self,
        id: CompetitionId,
        patch: CompetitionPatch,
    ) -> Result<(), GatewayError>;
    async fn fetch_competition(&self, id: CompetitionId)
        -> Result<CompetitionRecord, GatewayError>;
}

/// Delivery of events to connected clients.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send(&self, target: Target, event: ArenaEvent) -> Result<(), GatewayError>;
}

/// Current rating of a player in one mode/speed bucket.
#[async_trait]
pub trait RatingLookup: Send + Sync {
    async fn rating(&self, player: PlayerId, bucket: RatingBucket) -> Result<i32, GatewayError>;
}

/// The three collaborators, shared by every service.
#[derive(Clone)]
pub struct Gateways {
    pub store: Arc<dyn PersistenceGateway>,
    pub broadcast: Arc<dyn Broadcaster>,
    pub ratings: Arc<dyn RatingLookup>,
}

impl Gateways {
    pub fn new(
        store: Arc<dyn PersistenceGateway>,
        broadcast: Arc<dyn Broadcaster>,
        ratings: Arc<dyn RatingLookup>,
    ) -> Self {
        Self {
            store,
            broadcast,
            ratings,
        }
    }

    /// Send an event and swallow delivery failures; returns whether it was
    /// delivered.
    pub async fn notify(&self, target: Target, event: ArenaEvent) -> bool {
        let name = event.name();
        match self.broadcast.send(target, event).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(event = name, ?target, error = %err, "broadcast failed");
                false
            }
        }
    }
}

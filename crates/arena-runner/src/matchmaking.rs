//! Rating-gated matchmaking.
//!
//! [`MatchmakingQueue`] is the plain FIFO with the pairing rule;
//! [`Matchmaker`] wraps it with rating lookup and match creation.

use arena_core::{
    ArenaError, ArenaEvent, ConnectionId, GameMode, MatchType, PlayerId, RatingBucket, Result,
    Target, TimeControl,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::actor::MatchHandle;
use crate::registry::{MatchRegistry, MatchSettings};

/// What a player is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub player: PlayerId,
    pub connection: ConnectionId,
    pub mode: GameMode,
    pub match_type: MatchType,
    pub time_control: TimeControl,
}

/// A queued search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub params: SearchParams,
    pub rating: i32,
    pub queued_at: DateTime<Utc>,
}

impl SearchRequest {
    pub fn new(params: SearchParams, rating: i32) -> Self {
        Self {
            params,
            rating,
            queued_at: Utc::now(),
        }
    }

    pub fn player(&self) -> PlayerId {
        self.params.player
    }

    /// Same mode, match type and time control, ratings within `max_gap`.
    pub fn compatible_with(&self, other: &SearchRequest, max_gap: i32) -> bool {
        let (a, b) = (&self.params, &other.params);
        a.player != b.player
            && a.mode == b.mode
            && a.match_type == b.match_type
            && a.time_control == b.time_control
            && (self.rating - other.rating).abs() <= max_gap
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    /// No partner yet; 1-based place in the queue.
    Queued { position: usize },
    /// `waiting` was removed from the queue; `incoming` was never added.
    Paired {
        waiting: SearchRequest,
        incoming: SearchRequest,
    },
}

#[derive(Debug, Clone)]
pub struct MatchmakingQueue {
    waiting: VecDeque<SearchRequest>,
    max_rating_gap: i32,
}

impl MatchmakingQueue {
    pub fn new(max_rating_gap: i32) -> Self {
        Self {
            waiting: VecDeque::new(),
            max_rating_gap,
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.waiting.iter().any(|r| r.player() == player)
    }

    /// 1-based.
    pub fn position(&self, player: PlayerId) -> Option<usize> {
        self.waiting.iter().position(|r| r.player() == player).map(|i| i + 1)
    }

    /// Append without looking for a partner.
    pub fn enqueue(&mut self, request: SearchRequest) -> Result<usize> {
        self.reject_duplicate(request.player())?;
        self.waiting.push_back(request);
        Ok(self.waiting.len())
    }

    /// Pair `request` with the longest-waiting compatible search, or queue
    /// it at the back.
    pub fn find_match(&mut self, request: SearchRequest) -> Result<QueueOutcome> {
        self.reject_duplicate(request.player())?;
        let partner = self
            .waiting
            .iter()
            .position(|w| w.compatible_with(&request, self.max_rating_gap));
        match partner.and_then(|i| self.waiting.remove(i)) {
            Some(waiting) => Ok(QueueOutcome::Paired {
                waiting,
                incoming: request,
            }),
            None => {
                self.waiting.push_back(request);
                Ok(QueueOutcome::Queued {
                    position: self.waiting.len(),
                })
            }
        }
    }

    pub fn cancel(&mut self, player: PlayerId) -> Option<SearchRequest> {
        let i = self.waiting.iter().position(|r| r.player() == player)?;
        self.waiting.remove(i)
    }

    /// Drop every search made over `connection`.
    pub fn cancel_connection(&mut self, connection: ConnectionId) -> Vec<SearchRequest> {
        let (gone, kept): (Vec<_>, Vec<_>) = self
            .waiting
            .drain(..)
            .partition(|r| r.params.connection == connection);
        self.waiting = kept.into();
        gone
    }

    /// Put a search back at the head of the queue, keeping its seniority.
    pub fn requeue_front(&mut self, request: SearchRequest) {
        if !self.contains(request.player()) {
            self.waiting.push_front(request);
        }
    }

    fn reject_duplicate(&self, player: PlayerId) -> Result<()> {
        if self.contains(player) {
            return Err(ArenaError::conflict(format!(
                "player {player} is already searching"
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub enum SearchOutcome {
    Queued { position: usize },
    Matched(MatchHandle),
}

/// Matchmaking service shared by all connections.
pub struct Matchmaker {
    registry: Arc<MatchRegistry>,
    queue: Mutex<MatchmakingQueue>,
}

impl Matchmaker {
    pub fn new(registry: Arc<MatchRegistry>) -> Self {
        let max_gap = registry.config().matchmaking.max_rating_gap;
        Self {
            registry,
            queue: Mutex::new(MatchmakingQueue::new(max_gap)),
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_searching(&self, player: PlayerId) -> bool {
        self.queue.lock().await.contains(player)
    }

    /// Look up the player's rating, then pair or queue them. A pairing
    /// starts a match with random colors.
    pub async fn enqueue_search(&self, params: SearchParams) -> Result<SearchOutcome> {
        let gateways = self.registry.gateways();
        let bucket = RatingBucket::new(params.mode, params.time_control);
        let rating = gateways.ratings.rating(params.player, bucket).await?;
        let request = SearchRequest::new(params, rating);

        let outcome = self.queue.lock().await.find_match(request)?;
        match outcome {
            QueueOutcome::Queued { position } => {
                tracing::debug!(player = %params.player, rating, position, "search queued");
                let event = ArenaEvent::SearchQueued {
                    player: params.player,
                    queue_position: position as u32,
                };
                gateways.notify(Target::Player(params.player), event).await;
                Ok(SearchOutcome::Queued { position })
            }
            QueueOutcome::Paired { waiting, incoming } => {
                let (white, black) = if rand::random::<bool>() {
                    (waiting.player(), incoming.player())
                } else {
                    (incoming.player(), waiting.player())
                };
                let settings = MatchSettings::new(white, black, params.mode, params.time_control)
                    .match_type(params.match_type);
                match self.registry.create_match(settings).await {
                    Ok(handle) => {
                        tracing::info!(
                            match_id = %handle.id(),
                            %white,
                            %black,
                            gap = (waiting.rating - incoming.rating).abs(),
                            "players paired"
                        );
                        Ok(SearchOutcome::Matched(handle))
                    }
                    Err(err) => {
                        tracing::warn!(
                            player = %waiting.player(),
                            error = %err,
                            "match creation failed, opponent returned to queue"
                        );
                        self.queue.lock().await.requeue_front(waiting);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Returns whether the player had a pending search.
    pub async fn cancel_search(&self, player: PlayerId) -> bool {
        let removed = self.queue.lock().await.cancel(player);
        if removed.is_none() {
            return false;
        }
        self.registry
            .gateways()
            .notify(Target::Player(player), ArenaEvent::SearchCancelled { player })
            .await;
        true
    }

    /// Drop all searches of a closed connection; returns how many.
    pub async fn cancel_by_connection(&self, connection: ConnectionId) -> usize {
        let removed = self.queue.lock().await.cancel_connection(connection);
        if !removed.is_empty() {
            tracing::debug!(%connection, count = removed.len(), "searches dropped on disconnect");
        }
        removed.len()
    }
}

#[cfg(test)]
#[path = "matchmaking_tests.rs"]
mod matchmaking_tests;

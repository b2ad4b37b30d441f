//! Competitions for the arena
//!
//! This crate provides:
//! - Elo updates replayed over a finished competition
//! - A per-player standings ledger and Swiss pairing
//! - The round model and the strategies that advance it
//! - [`CompetitionService`]: enrollment, round scheduling and completion
//!   handling on top of the match registry

pub mod competition;
pub mod elo;
pub mod pairing;
pub mod service;
pub mod standings;
pub mod strategy;

pub use competition::{Competition, CompetitionFormat, CompetitionMatch, Entrant, Round};
pub use elo::{expected_score, EloCalculator, RatedGame, K_FACTOR};
pub use pairing::{assign_colors, pair_round, Pairing};
pub use service::CompetitionService;
pub use standings::{Standing, StandingsLedger};
pub use strategy::{CompetitionStrategy, FinishSummary, RoundCompletion, RoundStep, SinglePairing, Swiss};

//! Arena runner
//!
//! Live matches and how players get into them:
//! - `variant` and `upgrade`: the rules a match is played under
//! - `engine`: the synchronous per-match rules engine and its clock
//! - `actor` and `registry`: one task per live match, reachable by id
//! - `matchmaking`: rating-gated pairing of searching players

pub mod actor;
pub mod clock;
pub mod engine;
pub mod matchmaking;
pub mod moves;
pub mod registry;
pub mod upgrade;
pub mod variant;

pub use actor::{MatchHandle, MatchInfo, MatchView};
pub use clock::MatchClock;
pub use engine::{EngineSetup, MatchEngine, MoveApplied};
pub use matchmaking::{
    Matchmaker, MatchmakingQueue, QueueOutcome, SearchOutcome, SearchParams, SearchRequest,
};
pub use moves::{GameMove, Special};
pub use registry::{MatchCompletion, MatchRegistry, MatchSettings};
pub use upgrade::Upgrade;
pub use variant::{RuleSet, Variant, VariantMeta};

//! Arena configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [clock]
//! tick_interval_ms = 200
//! finished_linger_ms = 60000
//!
//! [matchmaking]
//! max_rating_gap = 200
//!
//! [rating]
//! k_factor = 20.0
//! default_rating = 1200
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub clock: ClockConfig,
    pub matchmaking: MatchmakingConfig,
    pub rating: RatingConfig,
    pub upgrades: UpgradeConfig,
    pub competition: CompetitionConfig,
}

impl ArenaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// How often a running clock is advanced.
    pub tick_interval_ms: u64,
    /// How long a finished match stays queryable before its actor exits.
    pub finished_linger_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            finished_linger_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Largest rating difference two queued players may be paired across.
    pub max_rating_gap: i32,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self { max_rating_gap: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub default_rating: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 20.0,
            default_rating: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Two-square pawn advances each side may make.
    pub pawn_dash_uses: u32,
    /// Own moves needed before an extra turn is available again.
    pub extra_turn_recharge: u32,
    /// Moves the initial time is spread over when sizing the check bonus.
    pub check_bonus_moves: u32,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            pawn_dash_uses: 3,
            extra_turn_recharge: 5,
            check_bonus_moves: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionConfig {
    /// Players required before a competition may start.
    pub min_players: usize,
    /// Overrides the variant's default number of Swiss rounds.
    pub swiss_rounds: Option<u32>,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            swiss_rounds: None,
        }
    }
}

//! Game modes, time controls and rating buckets.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ruleset a match is played under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Orthodox chess.
    Standard,
    /// Randomized back rank with free castling.
    Chess960,
    /// A king reaching one of the four centre squares wins.
    KingOfTheHill,
    /// Giving the third check wins.
    ThreeCheck,
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Chess960 => write!(f, "chess960"),
            Self::KingOfTheHill => write!(f, "king_of_the_hill"),
            Self::ThreeCheck => write!(f, "three_check"),
        }
    }
}

/// Whether a match affects ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Rated,
    Casual,
}

/// Stackable rule modifiers a match can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Clock bonus whenever the mover gives check.
    CheckBonus,
    /// Limited two-square pawn advances from any rank.
    PawnDash,
    /// Sliders may leap over one friendly piece.
    PieceJump,
    /// A recharging immediate second move.
    ExtraTurn,
}

impl std::fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckBonus => write!(f, "check_bonus"),
            Self::PawnDash => write!(f, "pawn_dash"),
            Self::PieceJump => write!(f, "piece_jump"),
            Self::ExtraTurn => write!(f, "extra_turn"),
        }
    }
}

/// Time control settings for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeControl {
    /// Initial time in seconds.
    pub initial_seconds: u32,
    /// Increment per move in seconds.
    pub increment_seconds: u32,
}

impl TimeControl {
    pub const BULLET: Self = Self::new(60, 0);
    pub const BLITZ: Self = Self::new(300, 3);
    pub const RAPID: Self = Self::new(900, 10);

    #[must_use]
    pub const fn new(initial_seconds: u32, increment_seconds: u32) -> Self {
        Self {
            initial_seconds,
            increment_seconds,
        }
    }

    #[must_use]
    pub const fn initial_ms(&self) -> u64 {
        self.initial_seconds as u64 * 1000
    }

    #[must_use]
    pub const fn increment_ms(&self) -> u64 {
        self.increment_seconds as u64 * 1000
    }

    #[must_use]
    pub const fn initial_time(&self) -> Duration {
        Duration::from_secs(self.initial_seconds as u64)
    }

    /// Estimated duration for 40 moves, used for speed classification.
    #[must_use]
    pub const fn estimated_seconds(&self) -> u32 {
        self.initial_seconds + 40 * self.increment_seconds
    }

    #[must_use]
    pub fn speed(&self) -> Speed {
        match self.estimated_seconds() {
            0..=179 => Speed::Bullet,
            180..=479 => Speed::Blitz,
            480..=1499 => Speed::Rapid,
            _ => Speed::Classical,
        }
    }

    /// Parse "5+3" (minutes + increment seconds).
    pub fn parse(s: &str) -> Option<Self> {
        let (mins, inc) = s.trim().split_once('+')?;
        let mins: u32 = mins.trim().parse().ok()?;
        let inc: u32 = inc.trim().parse().ok()?;
        Some(Self::new(mins.checked_mul(60)?, inc))
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::BLITZ
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.initial_seconds / 60, self.increment_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

/// Ratings are tracked separately per mode and speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingBucket {
    pub mode: GameMode,
    pub speed: Speed,
}

impl RatingBucket {
    #[must_use]
    pub fn new(mode: GameMode, time_control: TimeControl) -> Self {
        Self {
            mode,
            speed: time_control.speed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_plus_increment() {
        assert_eq!(TimeControl::parse("5+3"), Some(TimeControl::BLITZ));
        assert_eq!(TimeControl::parse(" 15 + 10 "), Some(TimeControl::RAPID));
        assert_eq!(TimeControl::parse("5"), None);
        assert_eq!(TimeControl::BLITZ.to_string(), "5+3");
    }

    #[test]
    fn speed_buckets() {
        assert_eq!(TimeControl::BULLET.speed(), Speed::Bullet);
        assert_eq!(TimeControl::BLITZ.speed(), Speed::Blitz);
        assert_eq!(TimeControl::RAPID.speed(), Speed::Rapid);
        assert_eq!(TimeControl::new(1800, 30).speed(), Speed::Classical);
    }
}

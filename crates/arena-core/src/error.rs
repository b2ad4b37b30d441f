//! Error taxonomy shared by every arena component.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::UpgradeKind;

/// Failure reported by an external collaborator. Never retried by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("internal gateway failure: {reason}")]
    Internal { reason: String },
}

impl GatewayError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

/// Errors returned by arena operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArenaError {
    /// Malformed or illegal request; no state was changed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Request clashes with existing state (duplicate enqueue, enrollment...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Two upgrades claimed the same move; the upgrade set is misconfigured.
    #[error("upgrades {first} and {second} both claim move {mv}")]
    UpgradeConflict {
        first: UpgradeKind,
        second: UpgradeKind,
        mv: String,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("not your turn")]
    NotYourTurn,

    #[error("match is already over")]
    MatchOver,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ArenaError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T, E = ArenaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ArenaError::UpgradeConflict {
            first: UpgradeKind::PawnDash,
            second: UpgradeKind::PawnDash,
            mv: "e3e5".into(),
        };
        assert_eq!(err.to_string(), "upgrades pawn_dash and pawn_dash both claim move e3e5");

        let err: ArenaError = GatewayError::not_found("match", "42").into();
        assert_eq!(err.to_string(), "match 42 not found");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArenaError>();
        assert_send_sync::<GatewayError>();
    }
}

//! Session error types.

use std::time::Duration;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::game::{ErrorKind, GameError, GameId};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The state machine rejected the action
    #[error(transparent)]
    Game(#[from] GameError),

    /// No game with this ID exists in storage
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    /// Storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// Storage did not answer in time
    #[error("Storage timed out after {0:?}")]
    StorageTimeout(Duration),

    /// The game's actor stopped before answering
    #[error("Game actor unavailable")]
    ActorUnavailable,
}

impl SessionError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized to prevent information disclosure about
    /// the internal system structure, and game IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::Game(GameError::InternalStateError(_)) => {
                "Internal server error".to_string()
            }
            SessionError::Game(err) => err.to_string(),
            SessionError::GameNotFound(_) => "Game not found".to_string(),
            SessionError::Storage(_) | SessionError::StorageTimeout(_) => {
                "Storage unavailable, try again".to_string()
            }
            SessionError::ActorUnavailable => "Game unavailable, try again".to_string(),
        }
    }

    /// Category of the error for status mapping
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Game(err) => err.kind(),
            SessionError::GameNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

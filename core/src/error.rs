use crate::clock::SessionPhase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Email template '{id}' not found in catalog")]
    TemplateNotFound { id: String },

    #[error("Invalid phase: expected {expected:?}, session is {actual:?}")]
    InvalidPhase {
        expected: SessionPhase,
        actual:   SessionPhase,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GameResult<T> = Result<T, GameError>;

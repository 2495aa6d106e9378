//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown on malformed input (bad amounts, mismatched
//!   budget totals, invalid handle formats).
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`QuotaExceeded`] / [`DuplicateHandle`] thrown by session registration.
//! - [`ConsistencyConflict`] thrown when an atomic budget update is rejected.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`QuotaExceeded`]: EngineError::QuotaExceeded
//!  [`DuplicateHandle`]: EngineError::DuplicateHandle
//!  [`ConsistencyConflict`]: EngineError::ConsistencyConflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Chat handle quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Chat handle already registered: {0}")]
    DuplicateHandle(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Conflicting budget update: {0}")]
    ConsistencyConflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::QuotaExceeded(a), Self::QuotaExceeded(b)) => a == b,
            (Self::DuplicateHandle(a), Self::DuplicateHandle(b)) => a == b,
            (Self::Transport(a), Self::Transport(b)) => a == b,
            (Self::ConsistencyConflict(a), Self::ConsistencyConflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

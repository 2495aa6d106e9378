use thiserror::Error;

/// Chat-side errors.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no session for channel {0}")]
    UnknownChannel(String),
}

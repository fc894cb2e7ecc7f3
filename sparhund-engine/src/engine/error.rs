use thiserror::Error;
use tokio::task::JoinError;

use sparhund_config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Event processing error: {0}")]
    Processing(String),

    #[error("Ingest channel closed")]
    ChannelClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinError> for EngineError {
    fn from(err: JoinError) -> Self {
        EngineError::Processing(err.to_string())
    }
}

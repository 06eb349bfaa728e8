//! Error types for capture processing.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HasshError {
    #[error("failed to spawn tshark: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture source error: {0}")]
    Capture(String),

    #[error("packet error: {0}")]
    Packet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HasshError {
    /// Per-packet faults only cost the packet that raised them; everything else aborts the source.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HasshError::Packet(_))
    }
}

pub type Result<T> = std::result::Result<T, HasshError>;

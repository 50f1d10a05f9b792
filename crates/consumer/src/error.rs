//! Consumer error types.

use thiserror::Error;

/// Errors that can occur while consuming events.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The broker connection, channel or topology declaration failed.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// A message body was not a valid order-confirmed event.
    #[error("Event decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The ingestion task panicked or was aborted.
    #[error("Ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;

//! Error type definitions.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for configuration problems.
///
/// Configuration errors are fatal: they are surfaced to the operator and the
/// process does not start.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The queue host is missing or empty.
    #[error("queue host is not configured (set QUEUE_HOST or --queue-host)")]
    MissingQueueHost,
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for operations against the external task queue.
///
/// A worker never crashes on these: take failures pause and retry, and a
/// failed acknowledge/put leaves the task for the queue's own redelivery.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Network failure talking to the queue service.
    #[error("queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The queue replied with something outside the protocol.
    #[error("malformed queue reply: {0}")]
    Protocol(String),

    /// The queue replied with a well-formed but unexpected answer.
    #[error("unexpected queue reply to {command}: {reply}")]
    UnexpectedReply {
        /// Command that was sent.
        command: &'static str,
        /// Reply line received.
        reply: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_the_setting() {
        let message = ConfigError::MissingQueueHost.to_string();
        assert!(message.contains("QUEUE_HOST"));
    }

    #[test]
    fn test_queue_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = QueueError::from(io);
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_unexpected_reply_mentions_command() {
        let err = QueueError::UnexpectedReply {
            command: "delete",
            reply: "NOT_FOUND".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("delete"));
        assert!(message.contains("NOT_FOUND"));
    }
}

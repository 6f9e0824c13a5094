//! Error types and classification.
//!
//! The services distinguish four failure families:
//! - configuration errors are fatal at startup,
//! - initialization errors (logger, HTTP client) are fatal at startup,
//! - queue errors are logged and left to the queue's own redelivery,
//! - transport errors during resolution degrade to an `ERROR` hop and never
//!   cross a component boundary.

mod types;

pub use types::{ConfigError, InitializationError, QueueError};

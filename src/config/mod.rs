//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, exit-code conventions)
//! - CLI option types and parsing
//! - Per-command configuration structs derived from the CLI

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    CheckerArgs, CheckerConfig, Cli, Command, LogFormat, LogLevel, PusherArgs, PusherConfig,
    QueueArgs, WorkerArgs, WorkerConfig,
};

//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument
//! parsing and the per-command configuration derived from it. Every option
//! can also be supplied through the environment (`QUEUE_HOST`, `HTTP_TIMEOUT`,
//! `SLEEP`, ...), which is how deployments configure the services.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error_handling::ConfigError;
use crate::queue::QueueSettings;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line interface for the redirect_status services.
#[derive(Debug, Parser)]
#[command(name = "redirect_status", version, about)]
pub struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// Service to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the redirect checker: supervise a pool of worker processes.
    Check(CheckerArgs),

    /// Worker-process entry point, spawned by `check`. Not for direct use.
    #[command(name = "check-worker", hide = true)]
    CheckWorker(WorkerArgs),

    /// Run the notification pusher: deliver HTTP callbacks from a queue.
    Push(PusherArgs),
}

/// Connection options for the external task queue.
#[derive(Debug, Clone, Args)]
pub struct QueueArgs {
    /// Queue host. Required: an empty host is a fatal configuration error.
    #[arg(long, env = "QUEUE_HOST", default_value = "")]
    pub queue_host: String,

    /// Queue port
    #[arg(long, env = "QUEUE_PORT", default_value_t = 11300)]
    pub queue_port: u16,

    /// Queue namespace; tube names are qualified as `<space>.<tube>`
    #[arg(long, env = "QUEUE_SPACE", default_value = "0")]
    pub queue_space: String,

    /// Tube to take tasks from
    #[arg(long, env = "QUEUE_TUBE")]
    pub queue_tube: String,

    /// Bounded wait for a single take, in seconds
    #[arg(long, env = "QUEUE_TAKE_TIMEOUT", default_value_t = 1)]
    pub queue_take_timeout: u64,
}

impl QueueArgs {
    /// Builds validated queue settings for the given tube name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingQueueHost`] if the host is empty; this is
    /// fatal at startup, the process must not start without a queue.
    pub fn settings(&self, tube: &str) -> Result<QueueSettings, ConfigError> {
        let settings = QueueSettings {
            host: self.queue_host.clone(),
            port: self.queue_port,
            space: self.queue_space.clone(),
            tube: tube.to_string(),
            take_timeout: Duration::from_secs(self.queue_take_timeout),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// CLI options for the `check` subcommand (pool supervisor).
#[derive(Debug, Clone, Args)]
pub struct CheckerArgs {
    #[command(flatten)]
    queue: QueueArgs,

    /// Tube the workers publish finished results to
    #[arg(long, env = "QUEUE_OUTPUT_TUBE", default_value = "checked")]
    pub output_tube: String,

    /// URL requested to decide whether the network is reachable
    #[arg(long, env = "CHECK_URL", default_value = "https://ya.ru/")]
    pub check_url: String,

    /// Timeout for every HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT", default_value_t = 3)]
    pub http_timeout: u64,

    /// Pause between supervisor rounds, in seconds
    #[arg(long, env = "SLEEP", default_value_t = 10.0)]
    pub sleep: f64,

    /// Number of worker processes to keep alive
    #[arg(long, env = "WORKER_POOL_SIZE", default_value_t = 10)]
    pub pool_size: usize,
}

impl CheckerArgs {
    /// Validates the arguments and produces the supervisor configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing queue host.
    pub fn to_config(&self) -> Result<CheckerConfig, ConfigError> {
        Ok(CheckerConfig {
            queue: self.queue.settings(&self.queue.queue_tube)?,
            output_tube: self.output_tube.clone(),
            check_url: self.check_url.clone(),
            http_timeout: Duration::from_secs(self.http_timeout),
            sleep: Duration::from_secs_f64(self.sleep),
            pool_size: self.pool_size,
        })
    }
}

/// CLI options for the hidden `check-worker` subcommand.
#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    #[command(flatten)]
    queue: QueueArgs,

    /// Tube finished results are published to
    #[arg(long, env = "QUEUE_OUTPUT_TUBE", default_value = "checked")]
    pub output_tube: String,

    /// Timeout for every HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT", default_value_t = 3)]
    pub http_timeout: u64,

    /// Pid of the supervising process; the worker exits once it is gone
    #[arg(long)]
    pub parent_pid: u32,
}

impl WorkerArgs {
    /// Validates the arguments and produces the worker configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing queue host.
    pub fn to_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            input: self.queue.settings(&self.queue.queue_tube)?,
            output: self.queue.settings(&self.output_tube)?,
            http_timeout: Duration::from_secs(self.http_timeout),
            parent_pid: self.parent_pid,
        })
    }
}

/// CLI options for the `push` subcommand (notification pusher).
#[derive(Debug, Clone, Args)]
pub struct PusherArgs {
    #[command(flatten)]
    queue: QueueArgs,

    /// Timeout for every callback POST, in seconds
    #[arg(long, env = "HTTP_TIMEOUT", default_value_t = 3)]
    pub http_timeout: u64,

    /// Pause between dispatcher rounds, in seconds
    #[arg(long, env = "SLEEP", default_value_t = 0.1)]
    pub sleep: f64,

    /// Longer pause after a queue failure, in seconds
    #[arg(long, env = "SLEEP_ON_FAIL", default_value_t = 10.0)]
    pub sleep_on_fail: f64,

    /// Maximum number of in-flight callback deliveries
    #[arg(long, env = "WORKER_POOL_SIZE", default_value_t = 10)]
    pub pool_size: usize,
}

impl PusherArgs {
    /// Validates the arguments and produces the dispatcher configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing queue host.
    pub fn to_config(&self) -> Result<PusherConfig, ConfigError> {
        Ok(PusherConfig {
            queue: self.queue.settings(&self.queue.queue_tube)?,
            http_timeout: Duration::from_secs(self.http_timeout),
            sleep: Duration::from_secs_f64(self.sleep),
            sleep_on_fail: Duration::from_secs_f64(self.sleep_on_fail),
            pool_size: self.pool_size,
        })
    }
}

/// Validated configuration for the pool supervisor.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Input tube the workers take URL-check tasks from.
    pub queue: QueueSettings,
    /// Tube the workers publish finished results to.
    pub output_tube: String,
    /// URL used for the periodic network-reachability probe.
    pub check_url: String,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Pause between supervisor rounds.
    pub sleep: Duration,
    /// Target number of live worker processes.
    pub pool_size: usize,
}

/// Validated configuration for a single worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Tube URL-check tasks are taken from (and rechecks are requeued to).
    pub input: QueueSettings,
    /// Tube finished results are published to.
    pub output: QueueSettings,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Pid of the supervising process.
    pub parent_pid: u32,
}

/// Validated configuration for the notification dispatcher.
#[derive(Debug, Clone)]
pub struct PusherConfig {
    /// Tube callback tasks are taken from.
    pub queue: QueueSettings,
    /// Timeout applied to every callback POST.
    pub http_timeout: Duration,
    /// Pause between dispatcher rounds.
    pub sleep: Duration,
    /// Longer pause applied after a queue failure.
    pub sleep_on_fail: Duration,
    /// Maximum number of in-flight callback deliveries.
    pub pool_size: usize,
}

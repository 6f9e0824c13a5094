//! Configuration constants.

/// Maximum number of redirect hops followed for a single URL check.
pub const DEFAULT_MAX_REDIRECTS: usize = 30;

/// Offset added to a signal number to form the process exit code.
///
/// The convention mirrors the shell's `128 + signum`, so an operator can tell
/// from the exit code alone which signal stopped the service.
pub const SIGNAL_EXIT_CODE_OFFSET: i32 = 128;

/// Time-to-run (seconds) granted to jobs we put back onto a tube.
///
/// The queue redelivers a reserved job to another worker once this expires
/// without an acknowledge, which is the only retry mechanism workers rely on.
pub const PUT_TTR_SECS: u32 = 60;

/// Priority used for every `put` and `bury`; the services do not rank tasks.
pub const PUT_PRIORITY: u32 = 0;

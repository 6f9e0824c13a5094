//! Process-level plumbing shared by all services.

mod shutdown;

pub use shutdown::{install_signal_handlers, ShutdownController};

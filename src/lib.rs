//! redirect_status library: queue-driven redirect resolution and callback delivery
//!
//! This library provides two tightly related services driven by an external
//! durable task queue:
//!
//! - a **redirect checker**: a pool of supervised OS-process workers that pull
//!   URL-check tasks, follow the full redirect chain (HTTP redirects,
//!   meta-refresh redirects, app-store deep links), classify each hop, detect
//!   known tracking pixels, and publish the resulting trace, and
//! - a **notification pusher**: a single-process cooperative dispatcher that
//!   pulls callback tasks and delivers HTTP POST notifications with bounded
//!   concurrency, acknowledging or dead-lettering each task based on the
//!   delivery outcome.
//!
//! # Example
//!
//! ```no_run
//! use redirect_status::initialization::init_redirect_client;
//! use redirect_status::resolve::{resolve_redirect_chain, PatternRegistry};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = init_redirect_client(Duration::from_secs(3), None)?;
//! let registry = PatternRegistry::default();
//! let chain = resolve_redirect_chain(&client, "http://example.com/", 30, None, &registry).await;
//! println!("{} hops, final url {:?}", chain.hop_types.len(), chain.hop_urls.last());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod app;
pub mod checker;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod pusher;
pub mod queue;
pub mod resolve;

// Re-export public API
pub use app::ShutdownController;
pub use config::{Cli, Command, LogFormat, LogLevel};
pub use models::{RedirectChain, RedirectKind};

//! Initialization of shared resources.
//!
//! This module provides functions to initialize the HTTP clients and the
//! logger used by the services.

mod client;
mod logger;

pub use client::{init_callback_client, init_redirect_client};
pub use logger::init_logger_with;

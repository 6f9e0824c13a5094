//! HTTP client initialization.
//!
//! This module provides functions to initialize HTTP clients with proper
//! configuration for redirect tracking and callback delivery.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Initializes the HTTP client used to fetch redirect hops.
///
/// Creates a `reqwest::Client` with redirects disabled so the chain can be
/// tracked manually, hop by hop. Without this the transport would collapse
/// the whole chain into the final response and the trace would be lost.
///
/// # Arguments
///
/// * `timeout` - Per-request timeout
/// * `user_agent` - Optional User-Agent header applied to every request
///
/// # Errors
///
/// Returns an `InitializationError` if client creation fails.
pub fn init_redirect_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, InitializationError> {
    let mut builder = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua.to_string());
    }
    Ok(builder.build()?)
}

/// Initializes the HTTP client used for callback POSTs and health checks.
///
/// # Errors
///
/// Returns an `InitializationError` if client creation fails.
pub fn init_callback_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    Ok(ClientBuilder::new().timeout(timeout).build()?)
}

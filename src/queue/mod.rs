//! Task-queue boundary.
//!
//! All queue access goes through the [`Tube`] trait, so the services are
//! written against take/put/ack/bury semantics rather than a concrete broker.
//! [`BeanstalkTube`] is the production implementation speaking the beanstalkd
//! text protocol; [`MemoryTube`] is an in-process double for tests.

mod beanstalk;
mod memory;

pub use beanstalk::BeanstalkTube;
pub use memory::MemoryTube;

use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::{ConfigError, QueueError};

/// Validated connection settings for one tube.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Namespace prepended to tube names.
    pub space: String,
    /// Unqualified tube name.
    pub tube: String,
    /// Bounded wait for a single take.
    pub take_timeout: Duration,
}

impl QueueSettings {
    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingQueueHost`] when the host is empty or
    /// whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingQueueHost);
        }
        Ok(())
    }

    /// The broker-side tube name, qualified with the namespace.
    pub fn qualified_tube(&self) -> String {
        format!("{}.{}", self.space, self.tube)
    }

    /// The broker address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A reserved task.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Broker-assigned task id, used for ack and bury.
    pub id: u64,
    /// Raw task body.
    pub body: Vec<u8>,
}

/// One named queue, with reserve/publish/acknowledge semantics.
///
/// A task that is taken but never acked returns to the ready state after the
/// broker's redelivery timeout; that is the intended handling for tasks whose
/// body does not decode.
#[async_trait]
pub trait Tube: Send {
    /// Takes one task, waiting at most `timeout`.
    ///
    /// `Ok(None)` means the wait elapsed with nothing to take; that is the
    /// normal idle outcome, not an error.
    async fn take(&mut self, timeout: Duration) -> Result<Option<Job>, QueueError>;

    /// Publishes a task body to this tube.
    async fn put(&mut self, body: &[u8]) -> Result<u64, QueueError>;

    /// Acknowledges a taken task, removing it permanently.
    async fn ack(&mut self, id: u64) -> Result<(), QueueError>;

    /// Sets a taken task aside for operator inspection.
    async fn bury(&mut self, id: u64) -> Result<(), QueueError>;
}

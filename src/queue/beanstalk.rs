//! Beanstalkd text-protocol client.
//!
//! Implements the handful of commands the services need (`use`, `watch`,
//! `ignore`, `reserve-with-timeout`, `put`, `delete`, `bury`) over a plain
//! TCP connection. One connection serves one tube, for both taking and
//! publishing.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::config::{PUT_PRIORITY, PUT_TTR_SECS};
use crate::error_handling::QueueError;
use crate::queue::{Job, QueueSettings, Tube};

/// A connection to one beanstalkd tube.
pub struct BeanstalkTube {
    stream: BufStream<TcpStream>,
    tube: String,
}

impl BeanstalkTube {
    /// Connects to the broker and binds the connection to the settings' tube,
    /// for both directions: `use` for publishing, `watch` plus an `ignore` of
    /// the default tube for taking.
    ///
    /// # Errors
    ///
    /// Returns a [`QueueError`] for connection failures or unexpected broker
    /// replies.
    pub async fn connect(settings: &QueueSettings) -> Result<Self, QueueError> {
        let stream = TcpStream::connect(settings.address()).await?;
        let mut tube = BeanstalkTube {
            stream: BufStream::new(stream),
            tube: settings.qualified_tube(),
        };
        let name = tube.tube.clone();
        debug!("connected to {}, tube {name}", settings.address());

        tube.send_line(&format!("use {name}")).await?;
        tube.expect_prefix("use", "USING ").await?;

        tube.send_line(&format!("watch {name}")).await?;
        tube.expect_prefix("watch", "WATCHING ").await?;

        tube.send_line("ignore default").await?;
        let reply = tube.read_line().await?;
        // NOT_IGNORED just means default was the only watched tube earlier.
        if !reply.starts_with("WATCHING ") && reply != "NOT_IGNORED" {
            return Err(QueueError::UnexpectedReply {
                command: "ignore",
                reply,
            });
        }

        Ok(tube)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), QueueError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, QueueError> {
        let mut line = String::new();
        let n = self.stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(QueueError::Protocol(
                "connection closed by broker".to_string(),
            ));
        }
        Ok(line.trim_end().to_string())
    }

    async fn expect_prefix(
        &mut self,
        command: &'static str,
        prefix: &str,
    ) -> Result<String, QueueError> {
        let reply = self.read_line().await?;
        if !reply.starts_with(prefix) {
            return Err(QueueError::UnexpectedReply { command, reply });
        }
        Ok(reply)
    }
}

#[async_trait]
impl Tube for BeanstalkTube {
    async fn take(&mut self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        self.send_line(&format!("reserve-with-timeout {}", timeout.as_secs()))
            .await?;
        let reply = self.read_line().await?;

        if reply == "TIMED_OUT" || reply == "DEADLINE_SOON" {
            return Ok(None);
        }

        let mut parts = reply.split_whitespace();
        let (id, size) = match (parts.next(), parts.next(), parts.next()) {
            (Some("RESERVED"), Some(id), Some(size)) => {
                let id = id
                    .parse::<u64>()
                    .map_err(|_| QueueError::Protocol(format!("bad task id in {reply:?}")))?;
                let size = size
                    .parse::<usize>()
                    .map_err(|_| QueueError::Protocol(format!("bad size in {reply:?}")))?;
                (id, size)
            }
            _ => {
                return Err(QueueError::UnexpectedReply {
                    command: "reserve-with-timeout",
                    reply,
                })
            }
        };

        // The body is followed by a trailing \r\n.
        let mut body = vec![0u8; size + 2];
        self.stream.read_exact(&mut body).await?;
        body.truncate(size);

        Ok(Some(Job { id, body }))
    }

    async fn put(&mut self, body: &[u8]) -> Result<u64, QueueError> {
        self.send_line(&format!(
            "put {PUT_PRIORITY} 0 {PUT_TTR_SECS} {}",
            body.len()
        ))
        .await?;
        self.stream.write_all(body).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;

        let reply = self.expect_prefix("put", "INSERTED ").await?;
        reply
            .split_whitespace()
            .nth(1)
            .and_then(|id| id.parse::<u64>().ok())
            .ok_or_else(|| QueueError::Protocol(format!("bad task id in {reply:?}")))
    }

    async fn ack(&mut self, id: u64) -> Result<(), QueueError> {
        self.send_line(&format!("delete {id}")).await?;
        self.expect_prefix("delete", "DELETED").await?;
        Ok(())
    }

    async fn bury(&mut self, id: u64) -> Result<(), QueueError> {
        self.send_line(&format!("bury {id} {PUT_PRIORITY}")).await?;
        self.expect_prefix("bury", "BURIED").await?;
        Ok(())
    }
}

//! Notification-pusher service.
//!
//! A single dispatcher task owns the queue connection. It takes callback
//! tasks, spawns bounded concurrent deliveries, and applies every terminal
//! queue operation itself: delivery tasks only report an [`Outcome`] over a
//! channel, they never touch the queue. A semaphore caps the number of
//! reserved-but-unfinished tasks at the pool size.

mod worker;

pub use worker::{deliver_notification, Completion, Outcome};

use std::sync::Arc;

use anyhow::Context;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::app::ShutdownController;
use crate::config::PusherConfig;
use crate::error_handling::QueueError;
use crate::initialization::init_callback_client;
use crate::models::NotificationPayload;
use crate::queue::{BeanstalkTube, Tube};

/// Connects to the broker and runs the dispatch loop until shutdown.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built or the initial
/// broker connection fails.
pub async fn run_dispatcher(
    config: PusherConfig,
    shutdown: ShutdownController,
) -> anyhow::Result<()> {
    let client = init_callback_client(config.http_timeout)?;
    let mut tube = BeanstalkTube::connect(&config.queue)
        .await
        .context("connecting to the queue")?;
    info!(
        "pusher started on tube {}, pool size {}",
        config.queue.qualified_tube(),
        config.pool_size
    );
    run_dispatch_loop(&mut tube, &client, &config, &shutdown).await;
    Ok(())
}

/// The dispatch loop proper, written against any [`Tube`].
///
/// Each round applies finished deliveries, then reserves at most one new task
/// if a delivery slot is free. A take failure is not fatal: the round ends
/// with the longer failure pause and the loop goes on. On shutdown the loop
/// stops reserving, waits for in-flight deliveries, and applies their
/// outcomes before returning.
pub async fn run_dispatch_loop<T: Tube>(
    tube: &mut T,
    client: &reqwest::Client,
    config: &PusherConfig,
    shutdown: &ShutdownController,
) {
    let slots = Arc::new(Semaphore::new(config.pool_size));
    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();

    while !shutdown.is_cancelled() {
        let mut failed = !drain_completed(tube, &mut rx).await;

        if let Ok(permit) = slots.clone().try_acquire_owned() {
            match tube.take(config.queue.take_timeout).await {
                Ok(Some(job)) => {
                    spawn_delivery(client, &tx, job.id, &job.body, permit);
                }
                Ok(None) => {}
                Err(e) => {
                    error!("failed to take a task: {e}");
                    failed = true;
                }
            }
        }

        let pause = if failed { config.sleep_on_fail } else { config.sleep };
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(pause) => {}
        }
    }

    // Only delivery tasks hold senders now; the channel closes once the last
    // in-flight delivery reports in.
    drop(tx);
    while let Some(done) = rx.recv().await {
        if let Err(e) = apply_outcome(tube, done).await {
            warn!("failed to settle task {} during shutdown: {e}", done.job_id);
        }
    }
}

/// Decodes the task body and spawns its delivery, or skips an undecodable
/// task without acking so the broker redelivers it.
fn spawn_delivery(
    client: &reqwest::Client,
    tx: &UnboundedSender<Completion>,
    job_id: u64,
    body: &[u8],
    permit: tokio::sync::OwnedSemaphorePermit,
) {
    let payload: NotificationPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("task {job_id} has an undecodable body, leaving it for redelivery: {e}");
            return;
        }
    };

    debug!("task {job_id}: notifying {}", payload.callback_url);
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = deliver_notification(&client, &payload).await;
        // The dispatcher may already be gone during shutdown.
        let _ = tx.send(Completion { job_id, outcome });
        drop(permit);
    });
}

/// Applies every completion that is ready, without waiting for more.
///
/// Returns `false` when a queue operation failed; the lost completion is
/// recovered by the broker's redelivery timeout.
async fn drain_completed<T: Tube>(tube: &mut T, rx: &mut UnboundedReceiver<Completion>) -> bool {
    while let Ok(done) = rx.try_recv() {
        if let Err(e) = apply_outcome(tube, done).await {
            error!("failed to settle task {}: {e}", done.job_id);
            return false;
        }
    }
    true
}

async fn apply_outcome<T: Tube>(tube: &mut T, done: Completion) -> Result<(), QueueError> {
    match done.outcome {
        Outcome::Ack => tube.ack(done.job_id).await,
        Outcome::Bury => {
            warn!("delivery of task {} failed, burying it", done.job_id);
            tube.bury(done.job_id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::queue::{MemoryTube, QueueSettings};

    fn config() -> PusherConfig {
        PusherConfig {
            queue: QueueSettings {
                host: "unused".to_string(),
                port: 11300,
                space: "0".to_string(),
                tube: "notify".to_string(),
                take_timeout: Duration::ZERO,
            },
            http_timeout: Duration::from_secs(1),
            sleep: Duration::from_millis(10),
            sleep_on_fail: Duration::from_millis(10),
            pool_size: 4,
        }
    }

    async fn spawn_ok_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/cb", listener.local_addr().unwrap());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        )
                        .await;
                });
            }
        });
        url
    }

    fn trigger_after(shutdown: &ShutdownController, delay: Duration) {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            shutdown.trigger(15);
        });
    }

    #[tokio::test]
    async fn test_dispatch_acks_delivered_notifications() {
        let url = spawn_ok_server().await;
        let mut tube = MemoryTube::new();
        let body = serde_json::to_vec(&serde_json::json!({
            "callback_url": url,
            "id": 1,
        }))
        .unwrap();
        tube.seed(&body);

        let client = init_callback_client(Duration::from_secs(1)).unwrap();
        let shutdown = ShutdownController::new();
        trigger_after(&shutdown, Duration::from_millis(300));

        run_dispatch_loop(&mut tube, &client, &config(), &shutdown).await;

        assert!(tube.ready_bodies().is_empty());
        assert!(tube.reserved_ids().is_empty(), "the task must be acked");
        assert!(tube.buried_ids().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_buries_failed_deliveries() {
        let mut tube = MemoryTube::new();
        let body = serde_json::to_vec(&serde_json::json!({
            "callback_url": "http://127.0.0.1:1/cb",
            "id": 2,
        }))
        .unwrap();
        let id = tube.seed(&body);

        let client = init_callback_client(Duration::from_secs(1)).unwrap();
        let shutdown = ShutdownController::new();
        trigger_after(&shutdown, Duration::from_millis(300));

        run_dispatch_loop(&mut tube, &client, &config(), &shutdown).await;

        assert_eq!(tube.buried_ids(), vec![id]);
        assert!(tube.reserved_ids().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_skips_undecodable_task_without_ack() {
        let mut tube = MemoryTube::new();
        let id = tube.seed(b"not a notification");

        let client = init_callback_client(Duration::from_secs(1)).unwrap();
        let shutdown = ShutdownController::new();
        trigger_after(&shutdown, Duration::from_millis(150));

        run_dispatch_loop(&mut tube, &client, &config(), &shutdown).await;

        assert_eq!(
            tube.reserved_ids(),
            vec![id],
            "no ack and no bury: the broker redelivers"
        );
        assert!(tube.buried_ids().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_settles_in_flight_work_on_shutdown() {
        let url = spawn_ok_server().await;
        let mut tube = MemoryTube::new();
        for i in 0..3 {
            let body = serde_json::to_vec(&serde_json::json!({
                "callback_url": url,
                "id": i,
            }))
            .unwrap();
            tube.seed(&body);
        }

        let client = init_callback_client(Duration::from_secs(1)).unwrap();
        let shutdown = ShutdownController::new();
        trigger_after(&shutdown, Duration::from_millis(400));

        run_dispatch_loop(&mut tube, &client, &config(), &shutdown).await;

        assert!(tube.ready_bodies().is_empty());
        assert!(tube.reserved_ids().is_empty(), "every task must be settled");
    }
}

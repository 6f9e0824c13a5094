//! Redirect-checker service: a supervisor and its pool of worker processes.
//!
//! The supervisor owns no queue connection. Each round it probes network
//! reachability, reaps workers that exited, and spawns replacements up to the
//! pool size, passing its own pid so workers can detect its death. Workers
//! are separate OS processes running the hidden `check-worker` subcommand.

mod worker;

pub use worker::{process_job, route_history, run_worker, Routed};

use std::process;
use std::process::Stdio;

use async_trait::async_trait;
use futures::future::join_all;
use log::{error, info, warn};
use tokio::process::{Child, Command};
use tokio::time::sleep;

use crate::app::ShutdownController;
use crate::config::CheckerConfig;
use crate::initialization::init_callback_client;

/// Probes whether the network is reachable by fetching `url`.
///
/// Any response counts as reachable; only a transport failure does not.
pub async fn check_network_status(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(_) => true,
        Err(e) => {
            warn!("network check against {url} failed: {e}");
            false
        }
    }
}

/// How many workers must be spawned to restore the pool.
pub fn missing_workers(pool_size: usize, alive: usize) -> usize {
    pool_size.saturating_sub(alive)
}

/// Worker-lifecycle seam between the supervisor round and the OS processes.
#[async_trait]
trait WorkerPool {
    /// Drops exited workers and returns the live count.
    fn reap(&mut self) -> usize;

    /// Starts one worker.
    fn spawn_one(&mut self) -> std::io::Result<()>;

    /// Kills every live worker and waits for all of them.
    async fn stop_all(&mut self);
}

/// One supervisor round: restore the pool while the network is reachable,
/// tear it down while it is not.
async fn supervise_round<P: WorkerPool + Send>(pool: &mut P, pool_size: usize, reachable: bool) {
    let live = pool.reap();

    if reachable {
        let missing = missing_workers(pool_size, live);
        if missing > 0 {
            info!("pool is {missing} short, spawning");
        }
        for _ in 0..missing {
            if let Err(e) = pool.spawn_one() {
                error!("failed to spawn a worker: {e}");
            }
        }
    } else if live > 0 {
        // No point holding reserved tasks while disconnected.
        warn!("network is unreachable, stopping the pool");
        pool.stop_all().await;
    }
}

/// The real pool: child processes running the hidden worker subcommand.
struct ProcessPool {
    config: CheckerConfig,
    children: Vec<Child>,
}

impl ProcessPool {
    fn new(config: CheckerConfig) -> Self {
        ProcessPool {
            config,
            children: Vec::new(),
        }
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    fn reap(&mut self) -> usize {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                info!("worker exited with {status}");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("failed to poll a worker, dropping it: {e}");
                false
            }
        });
        self.children.len()
    }

    fn spawn_one(&mut self) -> std::io::Result<()> {
        let config = &self.config;
        let exe = std::env::current_exe()?;
        let child = Command::new(exe)
            .arg("check-worker")
            .arg("--queue-host")
            .arg(&config.queue.host)
            .arg("--queue-port")
            .arg(config.queue.port.to_string())
            .arg("--queue-space")
            .arg(&config.queue.space)
            .arg("--queue-tube")
            .arg(&config.queue.tube)
            .arg("--queue-take-timeout")
            .arg(config.queue.take_timeout.as_secs().to_string())
            .arg("--output-tube")
            .arg(&config.output_tube)
            .arg("--http-timeout")
            .arg(config.http_timeout.as_secs().to_string())
            .arg("--parent-pid")
            .arg(process::id().to_string())
            .stdin(Stdio::null())
            .spawn()?;
        self.children.push(child);
        Ok(())
    }

    async fn stop_all(&mut self) {
        for child in self.children.iter_mut() {
            if let Err(e) = child.start_kill() {
                warn!("failed to kill a worker: {e}");
            }
        }
        join_all(self.children.iter_mut().map(|child| child.wait())).await;
        self.children.clear();
    }
}

/// Runs the supervisor loop until shutdown is requested, then kills the pool.
///
/// # Errors
///
/// Returns an error only when the probe HTTP client cannot be built; spawn
/// failures are logged and retried next round.
pub async fn run_supervisor(
    config: CheckerConfig,
    shutdown: ShutdownController,
) -> anyhow::Result<()> {
    let client = init_callback_client(config.http_timeout)?;
    let pool_size = config.pool_size;
    let check_url = config.check_url.clone();
    let pause = config.sleep;
    let mut pool = ProcessPool::new(config);

    info!(
        "supervisor {} started, pool size {pool_size}",
        process::id()
    );

    while !shutdown.is_cancelled() {
        let reachable = check_network_status(&client, &check_url).await;
        supervise_round(&mut pool, pool_size, reachable).await;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(pause) => {}
        }
    }

    info!("stopping {} worker(s)", pool.reap());
    pool.stop_all().await;

    Ok(())
}

//! Worker-process task loop.
//!
//! A worker takes URL-check tasks from the input tube, resolves each redirect
//! chain, and routes the outcome: results go to the output tube, first-time
//! failures go back to the input tube as a one-shot recheck. The worker exits
//! on its own once its supervisor is gone.

use std::os::unix::process::parent_id;
use std::process;

use anyhow::Context;
use log::{error, info, warn};

use crate::app::ShutdownController;
use crate::config::{WorkerConfig, DEFAULT_MAX_REDIRECTS};
use crate::error_handling::QueueError;
use crate::initialization::init_redirect_client;
use crate::models::{
    RedirectChain, RedirectTaskPayload, ResultPayload, CHECK_TYPE_NORMAL,
};
use crate::queue::{BeanstalkTube, Job, Tube};
use crate::resolve::{resolve_redirect_chain, PatternRegistry};

/// Where a finished check goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// First failure of a task: requeue it once with the recheck marker set.
    Recheck(RedirectTaskPayload),
    /// Publish the finished result to the output tube.
    Publish(ResultPayload),
}

/// Routes a resolved chain according to the one-shot retry policy.
///
/// A chain containing an error hop earns exactly one recheck; the retried
/// task carries `recheck: true`, so its result is published even if it fails
/// again.
pub fn route_history(task: RedirectTaskPayload, chain: RedirectChain) -> Routed {
    if chain.has_error() && !task.recheck {
        Routed::Recheck(RedirectTaskPayload {
            recheck: true,
            ..task
        })
    } else {
        Routed::Publish(ResultPayload {
            url_id: task.url_id,
            result: chain,
            check_type: CHECK_TYPE_NORMAL.to_string(),
            suspicious: task.suspicious,
        })
    }
}

/// Processes one reserved task end to end.
///
/// A body that does not decode into a task payload is skipped without an ack;
/// the broker redelivers it after the reserve timeout. A decoded task is
/// always acked, after its outcome has been published or requeued.
///
/// # Errors
///
/// Returns a [`QueueError`] when the broker conversation fails; resolution
/// itself never errors.
pub async fn process_job<I, O>(
    input: &mut I,
    output: &mut O,
    job: Job,
    client: &reqwest::Client,
    user_agent: Option<&str>,
    registry: &PatternRegistry,
) -> Result<(), QueueError>
where
    I: Tube,
    O: Tube,
{
    let task: RedirectTaskPayload = match serde_json::from_slice(&job.body) {
        Ok(task) => task,
        Err(e) => {
            warn!("task {} has an undecodable body, leaving it for redelivery: {e}", job.id);
            return Ok(());
        }
    };

    info!("task {}: checking {}", job.id, task.url);
    let chain = resolve_redirect_chain(
        client,
        &task.url,
        DEFAULT_MAX_REDIRECTS,
        user_agent,
        registry,
    )
    .await;

    match route_history(task, chain) {
        Routed::Recheck(retry) => match serde_json::to_vec(&retry) {
            Ok(body) => {
                info!("task {}: got an error, requeueing for one recheck", job.id);
                input.put(&body).await?;
            }
            Err(e) => {
                error!("task {}: failed to encode recheck, burying: {e}", job.id);
                input.bury(job.id).await?;
                return Ok(());
            }
        },
        Routed::Publish(result) => match serde_json::to_vec(&result) {
            Ok(body) => {
                output.put(&body).await?;
            }
            Err(e) => {
                error!("task {}: failed to encode result, burying: {e}", job.id);
                input.bury(job.id).await?;
                return Ok(());
            }
        },
    }

    input.ack(job.id).await
}

/// Runs the worker loop until the supervisor disappears or shutdown is
/// requested.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built or the broker
/// conversation fails; the supervisor respawns the worker in both cases.
pub async fn run_worker(
    config: WorkerConfig,
    shutdown: ShutdownController,
) -> anyhow::Result<()> {
    let client = init_redirect_client(config.http_timeout, None)?;
    let registry = PatternRegistry::default();
    let mut input = BeanstalkTube::connect(&config.input)
        .await
        .context("connecting to the input tube")?;
    let mut output = BeanstalkTube::connect(&config.output)
        .await
        .context("connecting to the output tube")?;

    info!(
        "worker {} started, supervised by {}",
        process::id(),
        config.parent_pid
    );

    loop {
        if shutdown.is_cancelled() {
            info!("worker {} stopping on shutdown", process::id());
            return Ok(());
        }
        // A dead supervisor means this process has been reparented.
        if parent_id() != config.parent_pid {
            info!("supervisor {} is gone, exiting", config.parent_pid);
            return Ok(());
        }

        if let Some(job) = input.take(config.input.take_timeout).await? {
            let id = job.id;
            if let Err(e) =
                process_job(&mut input, &mut output, job, &client, None, &registry).await
            {
                // The broker's redelivery timeout recovers the task.
                error!("failed to settle task {id}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::models::RedirectKind;
    use crate::queue::MemoryTube;

    fn task(url: &str, recheck: bool) -> RedirectTaskPayload {
        RedirectTaskPayload {
            url: url.to_string(),
            url_id: json!(7),
            recheck,
            suspicious: None,
        }
    }

    fn error_chain() -> RedirectChain {
        RedirectChain {
            hop_types: vec![RedirectKind::Error],
            hop_urls: vec![
                Some("http://example.com/".to_string()),
                Some("http://example.com/".to_string()),
            ],
            counters: Vec::new(),
        }
    }

    #[test]
    fn test_route_clean_chain_publishes() {
        let chain = RedirectChain::single(Some("http://example.com/".to_string()));
        match route_history(task("http://example.com/", false), chain.clone()) {
            Routed::Publish(result) => {
                assert_eq!(result.url_id, json!(7));
                assert_eq!(result.result, chain);
                assert_eq!(result.check_type, "normal");
                assert!(result.suspicious.is_none());
            }
            routed => panic!("expected Publish, got {routed:?}"),
        }
    }

    #[test]
    fn test_route_first_error_requeues_with_recheck() {
        match route_history(task("http://example.com/", false), error_chain()) {
            Routed::Recheck(retry) => {
                assert!(retry.recheck);
                assert_eq!(retry.url, "http://example.com/");
            }
            routed => panic!("expected Recheck, got {routed:?}"),
        }
    }

    #[test]
    fn test_route_second_error_publishes() {
        match route_history(task("http://example.com/", true), error_chain()) {
            Routed::Publish(result) => assert!(result.result.has_error()),
            routed => panic!("expected Publish, got {routed:?}"),
        }
    }

    #[test]
    fn test_route_carries_suspicious_flag() {
        let mut t = task("http://example.com/", false);
        t.suspicious = Some(json!("odd redirect"));
        let chain = RedirectChain::single(Some("http://example.com/".to_string()));
        match route_history(t, chain) {
            Routed::Publish(result) => {
                assert_eq!(result.suspicious, Some(json!("odd redirect")))
            }
            routed => panic!("expected Publish, got {routed:?}"),
        }
    }

    fn test_client() -> reqwest::Client {
        init_redirect_client(Duration::from_secs(1), None).expect("client builds")
    }

    #[tokio::test]
    async fn test_process_job_publishes_result_and_acks() {
        let mut input = MemoryTube::new();
        let mut output = MemoryTube::new();
        // A terminal URL resolves without any network traffic.
        let body = serde_json::to_vec(&task("https://odnoklassniki.ru/", false)).unwrap();
        input.seed(&body);
        let job = input.take(Duration::ZERO).await.unwrap().unwrap();

        process_job(
            &mut input,
            &mut output,
            job,
            &test_client(),
            None,
            &PatternRegistry::default(),
        )
        .await
        .unwrap();

        assert!(input.reserved_ids().is_empty(), "the task must be acked");
        let published = output.ready_bodies();
        assert_eq!(published.len(), 1);
        let result: ResultPayload = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(result.check_type, "normal");
        assert!(result.result.hop_types.is_empty());
    }

    #[tokio::test]
    async fn test_process_job_requeues_first_failure() {
        let mut input = MemoryTube::new();
        let mut output = MemoryTube::new();
        // Nothing listens on port 1, so the check fails instantly.
        let body = serde_json::to_vec(&task("http://127.0.0.1:1/", false)).unwrap();
        input.seed(&body);
        let job = input.take(Duration::ZERO).await.unwrap().unwrap();

        process_job(
            &mut input,
            &mut output,
            job,
            &test_client(),
            None,
            &PatternRegistry::default(),
        )
        .await
        .unwrap();

        assert!(output.ready_bodies().is_empty());
        let requeued = input.ready_bodies();
        assert_eq!(requeued.len(), 1);
        let retry: RedirectTaskPayload = serde_json::from_slice(&requeued[0]).unwrap();
        assert!(retry.recheck);
        assert!(input.reserved_ids().is_empty(), "the original task must be acked");
    }

    #[tokio::test]
    async fn test_process_job_publishes_second_failure() {
        let mut input = MemoryTube::new();
        let mut output = MemoryTube::new();
        let body = serde_json::to_vec(&task("http://127.0.0.1:1/", true)).unwrap();
        input.seed(&body);
        let job = input.take(Duration::ZERO).await.unwrap().unwrap();

        process_job(
            &mut input,
            &mut output,
            job,
            &test_client(),
            None,
            &PatternRegistry::default(),
        )
        .await
        .unwrap();

        assert!(input.ready_bodies().is_empty());
        let published = output.ready_bodies();
        assert_eq!(published.len(), 1);
        let result: ResultPayload = serde_json::from_slice(&published[0]).unwrap();
        assert!(result.result.has_error());
    }

    #[tokio::test]
    async fn test_process_job_skips_undecodable_body_without_ack() {
        let mut input = MemoryTube::new();
        let mut output = MemoryTube::new();
        input.seed(b"not json at all");
        let job = input.take(Duration::ZERO).await.unwrap().unwrap();
        let id = job.id;

        process_job(
            &mut input,
            &mut output,
            job,
            &test_client(),
            None,
            &PatternRegistry::default(),
        )
        .await
        .unwrap();

        assert_eq!(input.reserved_ids(), vec![id], "no ack: broker redelivers");
        assert!(output.ready_bodies().is_empty());
    }
}

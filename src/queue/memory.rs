//! In-process tube for tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::QueueError;
use crate::queue::{Job, Tube};

/// An in-memory [`Tube`] with the same reserve/ack/bury life cycle as the
/// broker, minus the waiting: an empty tube answers `take` immediately.
#[derive(Debug, Default)]
pub struct MemoryTube {
    ready: VecDeque<Job>,
    reserved: HashMap<u64, Job>,
    buried: Vec<Job>,
    next_id: u64,
}

impl MemoryTube {
    /// An empty tube.
    pub fn new() -> Self {
        MemoryTube::default()
    }

    /// Adds a ready task and returns its id.
    pub fn seed(&mut self, body: &[u8]) -> u64 {
        self.next_id += 1;
        self.ready.push_back(Job {
            id: self.next_id,
            body: body.to_vec(),
        });
        self.next_id
    }

    /// Bodies of all ready tasks, oldest first.
    pub fn ready_bodies(&self) -> Vec<Vec<u8>> {
        self.ready.iter().map(|job| job.body.clone()).collect()
    }

    /// Ids of tasks that were taken but not yet acked or buried.
    pub fn reserved_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.reserved.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of buried tasks.
    pub fn buried_ids(&self) -> Vec<u64> {
        self.buried.iter().map(|job| job.id).collect()
    }

    /// Simulates the broker's redelivery timeout: every reserved task goes
    /// back to the ready state.
    pub fn release_all(&mut self) {
        let mut jobs: Vec<Job> = self.reserved.drain().map(|(_, job)| job).collect();
        jobs.sort_by_key(|job| job.id);
        self.ready.extend(jobs);
    }
}

#[async_trait]
impl Tube for MemoryTube {
    async fn take(&mut self, _timeout: Duration) -> Result<Option<Job>, QueueError> {
        let job = match self.ready.pop_front() {
            Some(job) => job,
            None => return Ok(None),
        };
        self.reserved.insert(job.id, job.clone());
        Ok(Some(job))
    }

    async fn put(&mut self, body: &[u8]) -> Result<u64, QueueError> {
        Ok(self.seed(body))
    }

    async fn ack(&mut self, id: u64) -> Result<(), QueueError> {
        self.reserved
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| QueueError::Protocol(format!("ack of unreserved task {id}")))
    }

    async fn bury(&mut self, id: u64) -> Result<(), QueueError> {
        let job = self
            .reserved
            .remove(&id)
            .ok_or_else(|| QueueError::Protocol(format!("bury of unreserved task {id}")))?;
        self.buried.push(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_reserves_in_fifo_order() {
        let mut tube = MemoryTube::new();
        let first = tube.seed(b"one");
        tube.seed(b"two");

        let job = tube.take(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(job.id, first);
        assert_eq!(job.body, b"one");
        assert_eq!(tube.reserved_ids(), vec![first]);
    }

    #[tokio::test]
    async fn test_take_on_empty_tube_returns_none() {
        let mut tube = MemoryTube::new();
        assert!(tube.take(Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ack_removes_reserved_task() {
        let mut tube = MemoryTube::new();
        tube.seed(b"one");
        let job = tube.take(Duration::ZERO).await.unwrap().unwrap();
        tube.ack(job.id).await.unwrap();
        assert!(tube.reserved_ids().is_empty());
        assert!(tube.ready_bodies().is_empty());
    }

    #[tokio::test]
    async fn test_ack_of_unreserved_task_is_an_error() {
        let mut tube = MemoryTube::new();
        assert!(tube.ack(99).await.is_err());
    }

    #[tokio::test]
    async fn test_bury_sets_task_aside() {
        let mut tube = MemoryTube::new();
        tube.seed(b"bad");
        let job = tube.take(Duration::ZERO).await.unwrap().unwrap();
        tube.bury(job.id).await.unwrap();
        assert_eq!(tube.buried_ids(), vec![job.id]);
        assert!(tube.take(Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_returns_unacked_tasks() {
        let mut tube = MemoryTube::new();
        tube.seed(b"undecodable");
        let job = tube.take(Duration::ZERO).await.unwrap().unwrap();
        tube.release_all();
        let again = tube.take(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(again.id, job.id);
    }
}

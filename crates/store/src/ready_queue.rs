// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ready queue: a FIFO list of job ids due for immediate dispatch.

use std::sync::Arc;

use crate::client::{FetchedId, StoreClient};
use crate::error::StoreError;

#[derive(Clone)]
pub struct ReadyQueue {
    client: Arc<dyn StoreClient>,
    jobs_key: String,
    ready_key: String,
}

impl ReadyQueue {
    pub fn new(client: Arc<dyn StoreClient>, jobs_key: String, ready_key: String) -> Self {
        Self { client, jobs_key, ready_key }
    }

    pub async fn submit(&self, id: &str, payload: &[u8]) -> Result<(), StoreError> {
        self.client.submit_ready(&self.jobs_key, &self.ready_key, id, payload).await
    }

    /// Blocks for up to `timeout_secs` waiting for an id, moving it onto
    /// `pending_key` atomically with the pop so a crash between the two
    /// never silently drops a job.
    pub async fn fetch_into(&self, pending_key: &str, timeout_secs: f64) -> Result<FetchedId, StoreError> {
        self.client.blocking_fetch_into(&self.ready_key, pending_key, timeout_secs).await
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        self.client.list_len(&self.ready_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStoreClient;

    #[tokio::test]
    async fn submit_then_fetch_hands_back_the_id() {
        let queue = ReadyQueue::new(Arc::new(MemoryStoreClient::new()), "jobs".into(), "ready".into());
        queue.submit("job-1", b"payload").await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);
        let fetched = queue.fetch_into("pending", 0.0).await.unwrap();
        assert_eq!(fetched.as_deref(), Some("job-1"));
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fetch_on_empty_queue_times_out() {
        let queue = ReadyQueue::new(Arc::new(MemoryStoreClient::new()), "jobs".into(), "ready".into());
        assert_eq!(queue.fetch_into("pending", 0.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = ReadyQueue::new(Arc::new(MemoryStoreClient::new()), "jobs".into(), "ready".into());
        queue.submit("job-1", b"a").await.unwrap();
        queue.submit("job-2", b"b").await.unwrap();
        assert_eq!(queue.fetch_into("pending", 0.0).await.unwrap().as_deref(), Some("job-1"));
        assert_eq!(queue.fetch_into("pending", 0.0).await.unwrap().as_deref(), Some("job-2"));
    }
}

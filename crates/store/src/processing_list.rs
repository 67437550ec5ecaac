// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processing list: a worker's own in-flight job list, plus the
//! heartbeat and recovery machinery that reclaims jobs left behind by a
//! worker that stopped heartbeating.

use std::sync::Arc;
use std::time::{Duration, Instant};

use broker_core::WorkerId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::{FetchedId, StoreClient};
use crate::error::StoreError;

const PENDING_SUFFIX: &str = ":pending";

/// The liveness key's value: a small encoded blob carrying the worker's
/// uptime. Consumers only inspect it for diagnostics.
#[derive(Serialize)]
struct Liveness {
    uptime_secs: u64,
}

/// One worker's pending list, scoped under `{processing_root}:{worker_id}`.
#[derive(Clone)]
pub struct ProcessingList {
    client: Arc<dyn StoreClient>,
    ready_key: String,
    jobs_key: String,
    processing_root: String,
    worker_id: WorkerId,
    pending_key: String,
    heartbeat_key: String,
    liveness_ttl_secs: u64,
    start_time: Instant,
}

impl ProcessingList {
    pub fn new(
        client: Arc<dyn StoreClient>,
        jobs_key: String,
        ready_key: String,
        processing_root: String,
        worker_id: WorkerId,
        liveness_ttl_secs: u64,
    ) -> Self {
        let pending_key = format!("{processing_root}:{worker_id}{PENDING_SUFFIX}");
        let heartbeat_key = format!("{processing_root}:{worker_id}");
        Self {
            client,
            jobs_key,
            ready_key,
            processing_root,
            worker_id,
            pending_key,
            heartbeat_key,
            liveness_ttl_secs,
            start_time: Instant::now(),
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    pub async fn fetch(&self, timeout_secs: f64) -> Result<FetchedId, StoreError> {
        self.client.blocking_fetch_into(&self.ready_key, &self.pending_key, timeout_secs).await
    }

    pub async fn complete(&self, id: &str) -> Result<(), StoreError> {
        self.client.complete(&self.pending_key, &self.jobs_key, id).await
    }

    pub async fn retry(&self, id: &str) -> Result<(), StoreError> {
        warn!(job_id = id, worker = %self.worker_id, "job failed, requeued for retry");
        self.client.retry(&self.pending_key, &self.ready_key, id).await
    }

    pub async fn size(&self) -> Result<u64, StoreError> {
        self.client.list_len(&self.pending_key).await
    }

    pub async fn heartbeat(&self) -> Result<(), StoreError> {
        let uptime_secs = self.start_time.elapsed().as_secs();
        let value = serde_json::to_vec(&Liveness { uptime_secs }).unwrap_or_default();
        self.client.set_with_ttl(&self.heartbeat_key, &value, self.liveness_ttl_secs).await
    }

    /// Runs until `cancel` fires: each tick refreshes this worker's liveness
    /// key, then scans for and recovers any other worker's abandoned jobs.
    pub async fn run_heartbeat(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(err) = self.heartbeat().await {
                        warn!(%err, worker = %self.worker_id, "heartbeat write failed, will retry next tick");
                        continue;
                    }
                    match self.recover_abandoned().await {
                        Ok(0) => {}
                        Ok(n) => warn!(count = n, worker = %self.worker_id, "recovered jobs from dead workers"),
                        Err(err) => warn!(%err, worker = %self.worker_id, "recovery scan failed, will retry next tick"),
                    }
                }
            }
        }
    }

    /// Scans every worker's pending list under this namespace and recovers
    /// any whose heartbeat has expired, returning how many jobs moved back
    /// onto the ready queue. Safe to call concurrently from more than one
    /// caller: a list is only drained once, by whichever caller's
    /// liveness check inside the script observes it absent first.
    pub async fn recover_abandoned(&self) -> Result<u64, StoreError> {
        let pattern = format!("{}:*{PENDING_SUFFIX}", self.processing_root);
        let pending_keys = self.client.scan_keys(&pattern).await?;
        let mut recovered = 0u64;
        for pending_key in pending_keys {
            let Some(stem) = pending_key.strip_suffix(PENDING_SUFFIX) else {
                continue;
            };
            let heartbeat_key = stem.to_string();
            match self.client.drain_pending(&pending_key, &heartbeat_key, &self.ready_key).await? {
                None => {}
                Some(0) => {}
                Some(n) => {
                    warn!(count = n, pending_key, "recovered jobs from a worker with no live heartbeat");
                    recovered += n;
                }
            }
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStoreClient;

    fn list(client: Arc<dyn StoreClient>, worker: &str) -> ProcessingList {
        ProcessingList::new(
            client,
            "jobs".into(),
            "ready".into(),
            "async-job:processing".into(),
            WorkerId(worker.to_string()),
            20,
        )
    }

    #[tokio::test]
    async fn fetch_then_complete_clears_pending_and_payload() {
        let client: Arc<dyn StoreClient> = Arc::new(MemoryStoreClient::new());
        client.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
        let worker = list(client.clone(), "w1");
        let fetched = worker.fetch(0.0).await.unwrap();
        assert_eq!(fetched.as_deref(), Some("job-1"));
        assert_eq!(worker.size().await.unwrap(), 1);
        worker.complete("job-1").await.unwrap();
        assert_eq!(worker.size().await.unwrap(), 0);
        assert_eq!(client.hash_get("jobs", "job-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn retry_moves_job_back_to_ready() {
        let client: Arc<dyn StoreClient> = Arc::new(MemoryStoreClient::new());
        client.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
        let worker = list(client.clone(), "w1");
        worker.fetch(0.0).await.unwrap();
        worker.retry("job-1").await.unwrap();
        assert_eq!(worker.size().await.unwrap(), 0);
        assert_eq!(client.list_len("ready").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recover_abandoned_requeues_jobs_with_no_heartbeat() {
        let client: Arc<dyn StoreClient> = Arc::new(MemoryStoreClient::new());
        client.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
        let dead_worker = list(client.clone(), "w1");
        dead_worker.fetch(0.0).await.unwrap();

        let live_worker = list(client.clone(), "w2");
        live_worker.heartbeat().await.unwrap();

        let recovering = list(client.clone(), "w3");
        let recovered = recovering.recover_abandoned().await.unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(client.list_len("ready").await.unwrap(), 1);
        assert_eq!(dead_worker.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recover_abandoned_leaves_a_live_worker_alone() {
        let client: Arc<dyn StoreClient> = Arc::new(MemoryStoreClient::new());
        client.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
        let live_worker = list(client.clone(), "w1");
        live_worker.fetch(0.0).await.unwrap();
        live_worker.heartbeat().await.unwrap();

        let recovered = live_worker.recover_abandoned().await.unwrap();
        assert_eq!(recovered, 0);
        assert_eq!(live_worker.size().await.unwrap(), 1);
    }
}

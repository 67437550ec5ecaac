// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The delayed set: a time-sorted set of job ids scheduled for the future,
//! plus the sweeper loop that promotes due ids onto the ready queue.

use std::sync::Arc;
use std::time::Duration;

use broker_core::Clock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::StoreClient;
use crate::error::StoreError;

#[derive(Clone)]
pub struct DelayedSet {
    client: Arc<dyn StoreClient>,
    jobs_key: String,
    delayed_key: String,
    ready_key: String,
}

impl DelayedSet {
    pub fn new(client: Arc<dyn StoreClient>, jobs_key: String, delayed_key: String, ready_key: String) -> Self {
        Self { client, jobs_key, delayed_key, ready_key }
    }

    pub async fn submit(&self, id: &str, payload: &[u8], target_ts: f64) -> Result<(), StoreError> {
        self.client
            .submit_delayed(&self.jobs_key, &self.delayed_key, id, payload, target_ts)
            .await
            .map(|_| ())
    }

    pub async fn promote_due(&self, now_ts: f64) -> Result<u64, StoreError> {
        self.client.promote_due(&self.delayed_key, &self.ready_key, now_ts).await
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        self.client.zset_len(&self.delayed_key).await
    }

    /// Runs until `cancel` fires, waking every `resolution` to promote any
    /// ids whose scheduled time has passed. `clock` supplies "now" so tests
    /// can drive promotion decisions without waiting on real wall time.
    pub async fn run_sweeper<C: Clock>(self: Arc<Self>, clock: C, resolution: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(resolution);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    let now_ts = clock.epoch_ms() as f64 / 1000.0;
                    match self.promote_due(now_ts).await {
                        Ok(0) => {}
                        Ok(n) => debug!(promoted = n, "sweeper promoted due jobs"),
                        Err(err) => debug!(%err, "sweeper cycle failed, will retry next tick"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStoreClient;

    #[tokio::test]
    async fn submit_then_promote_moves_due_ids() {
        let set = DelayedSet::new(Arc::new(MemoryStoreClient::new()), "jobs".into(), "delayed".into(), "ready".into());
        set.submit("job-1", b"payload", 10.0).await.unwrap();
        assert_eq!(set.len().await.unwrap(), 1);
        let moved = set.promote_due(20.0).await.unwrap();
        assert_eq!(moved, 1);
        assert_eq!(set.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn promote_before_due_time_moves_nothing() {
        let set = DelayedSet::new(Arc::new(MemoryStoreClient::new()), "jobs".into(), "delayed".into(), "ready".into());
        set.submit("job-1", b"payload", 100.0).await.unwrap();
        let moved = set.promote_due(20.0).await.unwrap();
        assert_eq!(moved, 0);
        assert_eq!(set.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancellation() {
        let set = Arc::new(DelayedSet::new(
            Arc::new(MemoryStoreClient::new()),
            "jobs".into(),
            "delayed".into(),
            "ready".into(),
        ));
        let clock = broker_core::SystemClock;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(set.clone().run_sweeper(clock, Duration::from_millis(5), cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server: owns a worker id, composes the four store primitives, and
//! runs the dispatcher plus the two background maintenance loops.

use std::sync::Arc;
use std::time::Duration;

use broker_core::{BrokerConfig, Clock, JobId, SystemClock, WorkerId};
use broker_store::{DelayedSet, JobStore, ProcessingList, ReadyQueue, StoreClient};
use broker_wire::{Codec, JobValue};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::delegate::Delegate;
use crate::error::BrokerError;
use crate::metrics::BrokerMetrics;
use crate::status::format_count;

/// How long `stop` waits for in-flight background tasks to notice
/// cancellation and return before giving up on joining them.
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningHandles {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct Server<C: Clock + 'static = SystemClock> {
    worker_id: WorkerId,
    config: BrokerConfig,
    delegate: Arc<dyn Delegate>,
    codec: Arc<dyn Codec>,
    clock: C,
    job_store: JobStore,
    ready_queue: ReadyQueue,
    delayed_set: Arc<DelayedSet>,
    processing: Arc<ProcessingList>,
    metrics: Arc<BrokerMetrics>,
    running: Mutex<Option<RunningHandles>>,
}

impl Server<SystemClock> {
    pub fn construct(
        delegate: Arc<dyn Delegate>,
        store_client: Arc<dyn StoreClient>,
        config: BrokerConfig,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self::construct_with_clock(delegate, store_client, config, codec, SystemClock)
    }
}

impl<C: Clock + 'static> Server<C> {
    /// Builds a server driven by an explicit clock. Production callers want
    /// [`Server::construct`]; tests that need to control the sweeper's
    /// notion of "now" pass a [`broker_core::FakeClock`] here instead.
    pub fn construct_with_clock(
        delegate: Arc<dyn Delegate>,
        store_client: Arc<dyn StoreClient>,
        config: BrokerConfig,
        codec: Arc<dyn Codec>,
        clock: C,
    ) -> Self {
        let worker_id = WorkerId::new(format!("worker-{}", nanoid::nanoid!(12)));
        let job_store = JobStore::new(store_client.clone(), config.jobs_key());
        let ready_queue = ReadyQueue::new(store_client.clone(), config.jobs_key(), config.ready_key());
        let delayed_set = Arc::new(DelayedSet::new(
            store_client.clone(),
            config.jobs_key(),
            config.delayed_key(),
            config.ready_key(),
        ));
        let processing = Arc::new(ProcessingList::new(
            store_client,
            config.jobs_key(),
            config.ready_key(),
            config.processing_root(),
            worker_id.clone(),
            config.liveness_ttl_secs(),
        ));
        Self {
            worker_id,
            config,
            delegate,
            codec,
            clock,
            job_store,
            ready_queue,
            delayed_set,
            processing,
            metrics: Arc::new(BrokerMetrics::default()),
            running: Mutex::new(None),
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    pub fn metrics(&self) -> &BrokerMetrics {
        &self.metrics
    }

    /// Submits a job, routing it to the ready queue or the delayed set
    /// depending on whether the codec reports a `scheduled_at`.
    pub async fn call(&self, job: JobValue) -> Result<String, BrokerError> {
        let id = JobId::new().to_string();
        let payload = self.codec.dump(&job)?;
        match self.codec.scheduled_at(&job) {
            Some(target_ts) => {
                self.delayed_set.submit(&id, &payload, target_ts).await?;
            }
            None => {
                self.ready_queue.submit(&id, &payload).await?;
            }
        }
        Ok(id)
    }

    /// Starts the dispatcher and the two background loops. A second call
    /// while already running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut running = self.running.lock();
        if running.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(3);

        tasks.push(tokio::spawn(self.clone().run_dispatcher(cancel.clone())));

        let delayed_set = self.delayed_set.clone();
        let clock = self.clock.clone();
        let resolution = Duration::from_secs_f64(self.config.resolution_secs.max(0.01));
        tasks.push(tokio::spawn(delayed_set.run_sweeper(clock, resolution, cancel.clone())));

        let processing = self.processing.clone();
        let interval = Duration::from_secs_f64(self.config.delay_secs.max(0.01));
        let heartbeat_cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            processing.run_heartbeat(interval, heartbeat_cancel).await;
        }));

        *running = Some(RunningHandles { cancel, tasks });
    }

    /// Cancels the dispatcher and background loops, then waits up to a
    /// bounded drain timeout for them to finish. Does not attempt to drain
    /// any worker's pending list; the next live worker's recovery loop will
    /// pick up anything left behind.
    pub async fn stop(&self) {
        let handles = self.running.lock().take();
        let Some(handles) = handles else {
            return;
        };
        handles.cancel.cancel();
        let join_all = futures_join_all(handles.tasks);
        if tokio::time::timeout(STOP_DRAIN_TIMEOUT, join_all).await.is_err() {
            warn!(worker = %self.worker_id, "background tasks did not stop within the drain timeout");
        }
    }

    pub async fn status_string(&self) -> String {
        let ready = self.ready_queue.len().await.unwrap_or(0);
        let delayed = self.delayed_set.len().await.unwrap_or(0);
        let pending = self.processing.size().await.unwrap_or(0);
        format!(
            "ready={} delayed={} pending={} completed={}",
            format_count(ready),
            format_count(delayed),
            format_count(pending),
            format_count(self.metrics.completed()),
        )
    }

    async fn run_dispatcher(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let fetched = tokio::select! {
                _ = cancel.cancelled() => None,
                result = self.processing.fetch(1.0) => Some(result),
            };
            let Some(result) = fetched else {
                return;
            };
            match result {
                Ok(Some(id)) => {
                    if cancel.is_cancelled() {
                        if let Err(err) = self.processing.retry(&id).await {
                            error!(job_id = %id, %err, "failed to retry job interrupted by shutdown");
                        }
                        return;
                    }
                    let this = self.clone();
                    tokio::spawn(async move { this.handle_job(id).await });
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, "dispatcher fetch failed, retrying");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }
    }

    async fn handle_job(self: Arc<Self>, id: String) {
        let payload = match self.job_store.get(&id).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                error!(job_id = %id, "payload missing for fetched job, dropping it");
                self.metrics.record_dropped();
                return;
            }
            Err(err) => {
                error!(job_id = %id, %err, "failed to read job payload, retrying");
                self.metrics.record_retried();
                if let Err(err) = self.processing.retry(&id).await {
                    error!(job_id = %id, %err, "failed to requeue job after a read failure");
                }
                return;
            }
        };

        let value = match self.codec.load(&payload) {
            Ok(value) => value,
            Err(err) => {
                error!(job_id = %id, %err, "failed to decode job payload, retrying");
                self.metrics.record_retried();
                if let Err(err) = self.processing.retry(&id).await {
                    error!(job_id = %id, %err, "failed to requeue job after a decode failure");
                }
                return;
            }
        };

        match self.delegate.handle(value).await {
            Ok(()) => {
                self.metrics.record_completed();
                if let Err(err) = self.processing.complete(&id).await {
                    error!(job_id = %id, %err, "failed to mark job complete");
                }
            }
            Err(err) => {
                error!(job_id = %id, %err, "delegate failed, requeuing job");
                self.metrics.record_retried();
                if let Err(err) = self.processing.retry(&id).await {
                    error!(job_id = %id, %err, "failed to requeue job after a delegate failure");
                }
            }
        }
    }
}

async fn futures_join_all(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        let _ = task.await;
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

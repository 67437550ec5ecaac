// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broker_core::{BrokerConfig, FakeClock};
use broker_store::MemoryStoreClient;
use broker_wire::{JobValue, JsonCodec};
use serde_json::json;
use tokio::sync::mpsc;

use super::*;

struct RecordingDelegate {
    tx: mpsc::UnboundedSender<JobValue>,
    fail_next: AtomicBool,
}

#[async_trait]
impl Delegate for RecordingDelegate {
    async fn handle(&self, payload: JobValue) -> Result<(), anyhow::Error> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated delegate failure"));
        }
        let _ = self.tx.send(payload);
        Ok(())
    }
}

async fn recv_timeout(rx: &mut mpsc::UnboundedReceiver<JobValue>) -> JobValue {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delegate was not invoked in time")
        .expect("channel closed unexpectedly")
}

#[tokio::test]
async fn immediate_job_is_dispatched_and_completed() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let delegate = Arc::new(RecordingDelegate { tx, fail_next: AtomicBool::new(false) });
    let store = Arc::new(MemoryStoreClient::new());
    let config = BrokerConfig::default();
    let server = Arc::new(Server::construct(delegate, store, config, Arc::new(JsonCodec)));

    server.start();
    server.call(json!({"task": "send-email"})).await.unwrap();

    let received = recv_timeout(&mut rx).await;
    assert_eq!(received, json!({"task": "send-email"}));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.metrics().completed(), 1);

    server.stop().await;
}

#[tokio::test]
async fn delayed_job_is_promoted_by_the_sweeper() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let delegate = Arc::new(RecordingDelegate { tx, fail_next: AtomicBool::new(false) });
    let store = Arc::new(MemoryStoreClient::new());
    let config = BrokerConfig::builder().resolution_secs(0.02).build().unwrap();
    let clock = FakeClock::new();
    let server = Arc::new(Server::construct_with_clock(delegate, store, config, Arc::new(JsonCodec), clock));

    server.start();
    // FakeClock starts at epoch_ms = 1_000_000 (1000s); this job is already due.
    server.call(json!({"task": "send-email", "scheduled_at": 10.0})).await.unwrap();

    let received = recv_timeout(&mut rx).await;
    assert_eq!(received["task"], "send-email");

    server.stop().await;
}

#[tokio::test]
async fn delegate_failure_causes_a_retry_that_eventually_succeeds() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let delegate = Arc::new(RecordingDelegate { tx, fail_next: AtomicBool::new(true) });
    let store = Arc::new(MemoryStoreClient::new());
    let config = BrokerConfig::default();
    let server = Arc::new(Server::construct(delegate, store, config, Arc::new(JsonCodec)));

    server.start();
    server.call(json!({"task": "flaky"})).await.unwrap();

    let received = recv_timeout(&mut rx).await;
    assert_eq!(received["task"], "flaky");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.metrics().retried(), 1);
    assert_eq!(server.metrics().completed(), 1);

    server.stop().await;
}

#[tokio::test]
async fn start_is_idempotent() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let delegate = Arc::new(RecordingDelegate { tx, fail_next: AtomicBool::new(false) });
    let store = Arc::new(MemoryStoreClient::new());
    let server = Arc::new(Server::construct(delegate, store, BrokerConfig::default(), Arc::new(JsonCodec)));

    server.start();
    server.start();
    server.stop().await;
}

#[tokio::test]
async fn status_string_reports_empty_queues_as_zero() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let delegate = Arc::new(RecordingDelegate { tx, fail_next: AtomicBool::new(false) });
    let store = Arc::new(MemoryStoreClient::new());
    let server = Server::construct(delegate, store, BrokerConfig::default(), Arc::new(JsonCodec));

    assert_eq!(server.status_string().await, "ready=0 delayed=0 pending=0 completed=0");
}

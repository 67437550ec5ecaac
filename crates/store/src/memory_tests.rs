// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn submit_ready_makes_payload_and_id_visible() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
    assert_eq!(store.list_len("ready").await.unwrap(), 1);
    assert_eq!(store.hash_get("jobs", "job-1").await.unwrap(), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn fetch_pops_oldest_first() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"a").await.unwrap();
    store.submit_ready("jobs", "ready", "job-2", b"b").await.unwrap();
    let fetched = store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    assert_eq!(fetched.as_deref(), Some("job-1"));
    assert_eq!(store.list_len("pending").await.unwrap(), 1);
}

#[tokio::test]
async fn fetch_times_out_when_empty() {
    let store = MemoryStoreClient::new();
    let fetched = store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    assert_eq!(fetched, None);
}

#[tokio::test]
async fn complete_removes_from_pending_and_jobs() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
    store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    store.complete("pending", "jobs", "job-1").await.unwrap();
    assert_eq!(store.list_len("pending").await.unwrap(), 0);
    assert_eq!(store.hash_get("jobs", "job-1").await.unwrap(), None);
}

#[tokio::test]
async fn complete_on_absent_id_is_a_no_op() {
    let store = MemoryStoreClient::new();
    store.complete("pending", "jobs", "job-missing").await.unwrap();
}

#[tokio::test]
async fn retry_moves_back_to_ready() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
    store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    store.retry("pending", "ready", "job-1").await.unwrap();
    assert_eq!(store.list_len("pending").await.unwrap(), 0);
    assert_eq!(store.list_len("ready").await.unwrap(), 1);
}

#[tokio::test]
async fn promote_due_moves_in_ascending_target_order() {
    let store = MemoryStoreClient::new();
    store.submit_delayed("jobs", "delayed", "late", b"c", 30.0).await.unwrap();
    store.submit_delayed("jobs", "delayed", "early", b"a", 10.0).await.unwrap();
    store.submit_delayed("jobs", "delayed", "mid", b"b", 20.0).await.unwrap();
    let moved = store.promote_due("delayed", "ready", 25.0).await.unwrap();
    assert_eq!(moved, 2);
    assert_eq!(store.zset_len("delayed").await.unwrap(), 1);
    let first = store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    let second = store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    assert_eq!(first.as_deref(), Some("early"));
    assert_eq!(second.as_deref(), Some("mid"));
}

#[tokio::test]
async fn drain_pending_skips_a_live_owner() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
    store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    store.set_with_ttl("heartbeat", b"1", 60).await.unwrap();
    let result = store.drain_pending("pending", "heartbeat", "ready").await.unwrap();
    assert_eq!(result, None);
    assert_eq!(store.list_len("pending").await.unwrap(), 1);
}

#[tokio::test]
async fn drain_pending_recovers_an_abandoned_owner() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "ready", "job-1", b"payload").await.unwrap();
    store.blocking_fetch_into("ready", "pending", 0.0).await.unwrap();
    let result = store.drain_pending("pending", "heartbeat", "ready").await.unwrap();
    assert_eq!(result, Some(1));
    assert_eq!(store.list_len("pending").await.unwrap(), 0);
    assert_eq!(store.list_len("ready").await.unwrap(), 1);
}

#[tokio::test]
async fn scan_keys_matches_prefix_glob() {
    let store = MemoryStoreClient::new();
    store.submit_ready("jobs", "async-job:processing:w1:pending", "job-1", b"a").await.unwrap();
    store.submit_ready("jobs", "async-job:processing:w2:pending", "job-2", b"b").await.unwrap();
    let mut keys = store.scan_keys("async-job:processing:*").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["async-job:processing:w1:pending", "async-job:processing:w2:pending"]);
}

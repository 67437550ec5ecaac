// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store driver contract: a narrow set of primitive accessors plus the
//! atomic, scripted multi-key operations every queue mutation needs.
//!
//! Primitive accessors (`hash_get`, `list_len`, `zset_len`, `key_exists`, ...)
//! are plain single-key commands used for status reporting and tests; they
//! carry no atomicity guarantee beyond Redis's own single-command semantics.
//! Everything that touches more than one key in a way that must be
//! all-or-nothing is instead a named method backed by a Lua script, so two
//! racing callers can never observe a half-applied mutation.

use async_trait::async_trait;

use crate::error::StoreError;

/// Outcome of a blocking fetch from the ready list into a worker's pending
/// list. `None` means the fetch timed out with nothing ready.
pub type FetchedId = Option<String>;

#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    // -- primitive accessors --

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn hash_set(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StoreError>;

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError>;

    async fn list_len(&self, key: &str) -> Result<u64, StoreError>;

    async fn zset_len(&self, key: &str) -> Result<u64, StoreError>;

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Sets a liveness key with a TTL; used by a worker's heartbeat loop.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError>;

    /// Lists keys matching a glob pattern via a cursored `SCAN`, never
    /// blocking the store with a single large `KEYS` call.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    // -- atomic scripted operations --

    /// Writes the payload and pushes the id onto the ready list in one step.
    async fn submit_ready(&self, jobs_key: &str, ready_key: &str, id: &str, payload: &[u8]) -> Result<(), StoreError>;

    /// Writes the payload and schedules the id in the delayed set in one step.
    async fn submit_delayed(
        &self,
        jobs_key: &str,
        delayed_key: &str,
        id: &str,
        payload: &[u8],
        target_ts: f64,
    ) -> Result<u64, StoreError>;

    /// Moves every due id from the delayed set onto the ready list, returning
    /// how many were moved.
    async fn promote_due(&self, delayed_key: &str, ready_key: &str, now_ts: f64) -> Result<u64, StoreError>;

    /// Blocking pop of the oldest ready id onto a worker's pending list.
    /// Returns `None` if nothing arrived within `timeout_secs`.
    async fn blocking_fetch_into(
        &self,
        ready_key: &str,
        pending_key: &str,
        timeout_secs: f64,
    ) -> Result<FetchedId, StoreError>;

    /// Removes the id from pending and its payload from the jobs hash.
    async fn complete(&self, pending_key: &str, jobs_key: &str, id: &str) -> Result<(), StoreError>;

    /// Removes the id from pending and pushes it back onto the ready list.
    async fn retry(&self, pending_key: &str, ready_key: &str, id: &str) -> Result<(), StoreError>;

    /// Atomically re-checks that `liveness_key` is absent, then drains every
    /// id left in `pending_key` onto `ready_key`. Returns `None` if the
    /// liveness key was present (the owner is alive; nothing was touched),
    /// or `Some(count)` with the number of ids recovered.
    async fn drain_pending(
        &self,
        pending_key: &str,
        liveness_key: &str,
        ready_key: &str,
    ) -> Result<Option<u64>, StoreError>;
}

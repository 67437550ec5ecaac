// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-process [`StoreClient`] used by broker tests and by any consumer
//! that wants to exercise dispatch logic without a live Redis server.
//!
//! State is partitioned by key exactly like the real store (hashes, lists,
//! sorted sets, TTL'd strings) and guarded by a single mutex; there is no
//! concurrency inside a call, which is fine for tests but is not a substitute
//! for the real atomicity guarantees [`crate::RedisStoreClient`] gets from
//! Lua scripting.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{FetchedId, StoreClient};
use crate::error::StoreError;

#[derive(Default)]
struct State {
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    lists: HashMap<String, VecDeque<String>>,
    zsets: HashMap<String, BTreeMap<String, f64>>,
    ttl_strings: HashMap<String, (Vec<u8>, Instant)>,
}

impl State {
    fn list_push_newest(&mut self, key: &str, id: &str) {
        self.lists.entry(key.to_string()).or_default().push_front(id.to_string());
    }

    fn list_pop_oldest(&mut self, key: &str) -> Option<String> {
        self.lists.get_mut(key).and_then(VecDeque::pop_back)
    }

    fn list_remove_one(&mut self, key: &str, id: &str) {
        if let Some(list) = self.lists.get_mut(key) {
            if let Some(pos) = list.iter().position(|x| x == id) {
                list.remove(pos);
            }
        }
    }

    fn is_ttl_key_live(&mut self, key: &str) -> bool {
        match self.ttl_strings.get(key) {
            Some((_, expires_at)) if *expires_at > Instant::now() => true,
            Some(_) => {
                self.ttl_strings.remove(key);
                false
            }
            None => false,
        }
    }
}

/// An in-memory reference store, gated behind the `test-support` feature.
pub struct MemoryStoreClient {
    state: Mutex<State>,
}

impl Default for MemoryStoreClient {
    fn default() -> Self {
        Self { state: Mutex::new(State::default()) }
    }
}

impl MemoryStoreClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreClient for MemoryStoreClient {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let state = self.state.lock();
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_vec());
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(h) = state.hashes.get_mut(key) {
            h.remove(field);
        }
        Ok(())
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        let state = self.state.lock();
        Ok(state.lists.get(key).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn zset_len(&self, key: &str) -> Result<u64, StoreError> {
        let state = self.state.lock();
        Ok(state.zsets.get(key).map(|z| z.len() as u64).unwrap_or(0))
    }

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(state.hashes.contains_key(key)
            || state.lists.contains_key(key)
            || state.zsets.contains_key(key)
            || state.is_ttl_key_live(key))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .ttl_strings
            .insert(key.to_string(), (value.to_vec(), Instant::now() + Duration::from_secs(ttl_secs)));
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        // Recovery scans issue patterns like `{root}:*:pending`, with the
        // wildcard in the middle, so matching needs real glob semantics
        // rather than a prefix check.
        let glob = glob::Pattern::new(pattern).map_err(|e| StoreError::Decode(e.to_string()))?;
        let state = self.state.lock();
        let mut out: Vec<String> = state.lists.keys().filter(|k| glob.matches(k)).cloned().collect();
        let live_ttl: Vec<String> = state.ttl_strings.keys().filter(|k| glob.matches(k)).cloned().collect();
        out.extend(live_ttl);
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn submit_ready(&self, jobs_key: &str, ready_key: &str, id: &str, payload: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .hashes
            .entry(jobs_key.to_string())
            .or_default()
            .insert(id.to_string(), payload.to_vec());
        state.list_push_newest(ready_key, id);
        Ok(())
    }

    async fn submit_delayed(
        &self,
        jobs_key: &str,
        delayed_key: &str,
        id: &str,
        payload: &[u8],
        target_ts: f64,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        state
            .hashes
            .entry(jobs_key.to_string())
            .or_default()
            .insert(id.to_string(), payload.to_vec());
        state.zsets.entry(delayed_key.to_string()).or_default().insert(id.to_string(), target_ts);
        Ok(1)
    }

    async fn promote_due(&self, delayed_key: &str, ready_key: &str, now_ts: f64) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let due: Vec<(String, f64)> = state
            .zsets
            .get(delayed_key)
            .map(|z| z.iter().filter(|(_, ts)| **ts <= now_ts).map(|(id, ts)| (id.clone(), *ts)).collect())
            .unwrap_or_default();
        if due.is_empty() {
            return Ok(0);
        }
        if let Some(z) = state.zsets.get_mut(delayed_key) {
            for (id, _) in &due {
                z.remove(id);
            }
        }
        // `due` iterated the BTreeMap in ascending (id, then insertion) order
        // keyed by score via the filter above; push in that same ascending
        // order so the earliest-due id ends up at the ready list's tail.
        let mut ordered = due;
        ordered.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let count = ordered.len() as u64;
        for (id, _) in ordered {
            state.list_push_newest(ready_key, &id);
        }
        Ok(count)
    }

    async fn blocking_fetch_into(
        &self,
        ready_key: &str,
        pending_key: &str,
        timeout_secs: f64,
    ) -> Result<FetchedId, StoreError> {
        let deadline = Instant::now() + Duration::from_secs_f64(timeout_secs.max(0.0));
        loop {
            {
                let mut state = self.state.lock();
                if let Some(id) = state.list_pop_oldest(ready_key) {
                    state.list_push_newest(pending_key, &id);
                    return Ok(Some(id));
                }
            }
            if timeout_secs <= 0.0 || Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn complete(&self, pending_key: &str, jobs_key: &str, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.list_remove_one(pending_key, id);
        if let Some(h) = state.hashes.get_mut(jobs_key) {
            h.remove(id);
        }
        Ok(())
    }

    async fn retry(&self, pending_key: &str, ready_key: &str, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.list_remove_one(pending_key, id);
        state.list_push_newest(ready_key, id);
        Ok(())
    }

    async fn drain_pending(
        &self,
        pending_key: &str,
        liveness_key: &str,
        ready_key: &str,
    ) -> Result<Option<u64>, StoreError> {
        let mut state = self.state.lock();
        if state.is_ttl_key_live(liveness_key) {
            return Ok(None);
        }
        let ids: Vec<String> = state.lists.remove(pending_key).map(|l| l.into_iter().collect()).unwrap_or_default();
        let count = ids.len() as u64;
        for id in ids.into_iter().rev() {
            state.list_push_newest(ready_key, &id);
        }
        Ok(Some(count))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

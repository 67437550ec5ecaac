// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real store backend: a pooled connection to a Redis-compatible server,
//! with every multi-key mutation going through a preloaded [`redis::Script`].

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use redis::Script;

use crate::client::{FetchedId, StoreClient};
use crate::error::StoreError;

const SUBMIT_READY: &str = include_str!("scripts/submit_ready.lua");
const SUBMIT_DELAYED: &str = include_str!("scripts/submit_delayed.lua");
const PROMOTE_DUE: &str = include_str!("scripts/promote_due.lua");
const COMPLETE: &str = include_str!("scripts/complete.lua");
const RETRY: &str = include_str!("scripts/retry.lua");
const DRAIN_PENDING: &str = include_str!("scripts/drain_pending.lua");

/// A `StoreClient` backed by a live Redis connection pool.
///
/// Scripts are loaded lazily by `redis::Script::invoke_async`, which caches
/// them server-side by SHA and transparently resends the source on a
/// `NOSCRIPT` reply, so no explicit `SCRIPT LOAD` bookkeeping is needed here.
pub struct RedisStoreClient {
    pool: Pool,
    submit_ready: Script,
    submit_delayed: Script,
    promote_due: Script,
    complete: Script,
    retry: Script,
    drain_pending: Script,
}

impl RedisStoreClient {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let cfg = PoolConfig::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Decode(format!("invalid pool config: {e}")))?;
        Ok(Self {
            pool,
            submit_ready: Script::new(SUBMIT_READY),
            submit_delayed: Script::new(SUBMIT_DELAYED),
            promote_due: Script::new(PROMOTE_DUE),
            complete: Script::new(COMPLETE),
            retry: Script::new(RETRY),
            drain_pending: Script::new(DRAIN_PENDING),
        })
    }
}

#[async_trait]
impl StoreClient for RedisStoreClient {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.pool.get().await?;
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn zset_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.pool.get().await?;
        let len: u64 = conn.zcard(key).await?;
        Ok(len)
    }

    async fn key_exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.get().await?;
        let mut cursor: u64 = 0;
        let mut out = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            out.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(out)
    }

    async fn submit_ready(&self, jobs_key: &str, ready_key: &str, id: &str, payload: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        self.submit_ready
            .key(jobs_key)
            .key(ready_key)
            .arg(id)
            .arg(payload)
            .invoke_async::<()>(&mut conn)
            .await?;
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
        let mut conn = self.pool.get().await?;
        let result: u64 = self
            .submit_delayed
            .key(jobs_key)
            .key(delayed_key)
            .arg(id)
            .arg(payload)
            .arg(target_ts)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn promote_due(&self, delayed_key: &str, ready_key: &str, now_ts: f64) -> Result<u64, StoreError> {
        let mut conn = self.pool.get().await?;
        let moved: u64 = self
            .promote_due
            .key(delayed_key)
            .key(ready_key)
            .arg(now_ts)
            .invoke_async(&mut conn)
            .await?;
        Ok(moved)
    }

    async fn blocking_fetch_into(
        &self,
        ready_key: &str,
        pending_key: &str,
        timeout_secs: f64,
    ) -> Result<FetchedId, StoreError> {
        let mut conn = self.pool.get().await?;
        let fetched: Option<String> = conn.brpoplpush(ready_key, pending_key, timeout_secs).await?;
        Ok(fetched)
    }

    async fn complete(&self, pending_key: &str, jobs_key: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        self.complete
            .key(pending_key)
            .key(jobs_key)
            .arg(id)
            .invoke_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn retry(&self, pending_key: &str, ready_key: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        self.retry
            .key(pending_key)
            .key(ready_key)
            .arg(id)
            .invoke_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn drain_pending(
        &self,
        pending_key: &str,
        liveness_key: &str,
        ready_key: &str,
    ) -> Result<Option<u64>, StoreError> {
        let mut conn = self.pool.get().await?;
        let result: i64 = self
            .drain_pending
            .key(pending_key)
            .key(liveness_key)
            .key(ready_key)
            .invoke_async(&mut conn)
            .await?;
        if result < 0 {
            Ok(None)
        } else {
            Ok(Some(result as u64))
        }
    }
}

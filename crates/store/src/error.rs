// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the store driver.
///
/// `Transport` propagates to whichever loop is mid-cycle (dispatcher,
/// sweeper, heartbeat); each of those loops treats the current cycle as
/// failed and simply tries again next time around.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[source] redis::RedisError),

    #[error("store connection pool exhausted or misconfigured: {0}")]
    Pool(#[source] deadpool_redis::PoolError),

    #[error("preloaded script missing after reload attempt")]
    ScriptMissing,

    #[error("could not decode store reply: {0}")]
    Decode(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Transport(e)
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        StoreError::Pool(e)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The delegate contract: the one trait a caller implements to describe
//! what a job actually does. The broker never inspects a payload beyond
//! what the codec needs; everything else is the delegate's business.

use async_trait::async_trait;
use broker_wire::JobValue;

#[async_trait]
pub trait Delegate: Send + Sync + 'static {
    /// Runs one job to completion. Returning `Err` marks the job for retry;
    /// the error is logged but never inspected by the broker itself.
    async fn handle(&self, payload: JobValue) -> Result<(), anyhow::Error>;
}

#[async_trait]
impl<F, Fut> Delegate for F
where
    F: Fn(JobValue) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    async fn handle(&self, payload: JobValue) -> Result<(), anyhow::Error> {
        (self)(payload).await
    }
}

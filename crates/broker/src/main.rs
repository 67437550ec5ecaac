// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process entry point: wires a broker server to a live Redis connection
//! and keeps it running until interrupted. The delegate itself is outside
//! this crate's concerns; the one below just logs so operators can confirm
//! jobs are flowing before pointing a real delegate at the broker.

use std::sync::Arc;
use std::time::Duration;

use broker_core::BrokerConfig;
use broker_server::{Delegate, Server};
use broker_store::RedisStoreClient;
use broker_wire::{JobValue, JsonCodec};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct LoggingDelegate;

#[async_trait::async_trait]
impl Delegate for LoggingDelegate {
    async fn handle(&self, payload: JobValue) -> Result<(), anyhow::Error> {
        info!(?payload, "handled job");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BrokerConfig::from_env()?;
    let store = Arc::new(RedisStoreClient::new(&config.redis_url)?);
    let server = Arc::new(Server::construct(Arc::new(LoggingDelegate), store, config, Arc::new(JsonCodec)));

    server.start();
    info!(worker_id = %server.worker_id(), "broker started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping");
    server.stop().await;

    // give spawned handler tasks a moment to log their own completion
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

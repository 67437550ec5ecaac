// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use broker_core::ConfigError;
use broker_store::StoreError;
use broker_wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("the broker was stopped before this job could be dispatched")]
    Cancelled,
}

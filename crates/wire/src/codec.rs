// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::Value;
use thiserror::Error;

/// A caller-supplied job value plus the optional scheduled start time the
/// broker extracts from it before encoding.
pub type JobValue = Value;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode job payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode job payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialization contract for job payloads.
///
/// Implementors must make `scheduled_at` cheap to call on the *value* before
/// it is encoded — the server calls it once per submission to decide whether
/// a job is immediate or scheduled.
pub trait Codec: Send + Sync + 'static {
    fn dump(&self, value: &JobValue) -> Result<Vec<u8>, WireError>;
    fn load(&self, bytes: &[u8]) -> Result<JobValue, WireError>;

    /// Returns the job's scheduled start time (Unix seconds, fractional), or
    /// `None` if the job should run immediately.
    fn scheduled_at(&self, value: &JobValue) -> Option<f64>;
}

/// The default codec: JSON payloads with `scheduled_at` read from a
/// top-level numeric field by convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const SCHEDULED_AT_FIELD: &'static str = "scheduled_at";
}

impl Codec for JsonCodec {
    fn dump(&self, value: &JobValue) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(value).map_err(WireError::Encode)
    }

    fn load(&self, bytes: &[u8]) -> Result<JobValue, WireError> {
        serde_json::from_slice(bytes).map_err(WireError::Decode)
    }

    fn scheduled_at(&self, value: &JobValue) -> Option<f64> {
        value.get(Self::SCHEDULED_AT_FIELD)?.as_f64()
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec contract for job payloads.
//!
//! The broker never inspects a job payload except to read its
//! `scheduled_at` timestamp before encoding. Everything else about the
//! payload's shape is the delegate's business.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;

pub use codec::{Codec, JobValue, JsonCodec, WireError};

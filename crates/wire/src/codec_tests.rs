// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn dump_then_load_roundtrips() {
    let codec = JsonCodec;
    let value = json!({"data": "x"});
    let bytes = codec.dump(&value).unwrap();
    let loaded = codec.load(&bytes).unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn scheduled_at_absent_for_immediate_job() {
    let codec = JsonCodec;
    let value = json!({"data": "x"});
    assert_eq!(codec.scheduled_at(&value), None);
}

#[test]
fn scheduled_at_present_for_scheduled_job() {
    let codec = JsonCodec;
    let value = json!({"data": "y", "scheduled_at": 1_700_000_000.5});
    assert_eq!(codec.scheduled_at(&value), Some(1_700_000_000.5));
}

#[test]
fn scheduled_at_ignores_non_numeric_field() {
    let codec = JsonCodec;
    let value = json!({"data": "y", "scheduled_at": "soon"});
    assert_eq!(codec.scheduled_at(&value), None);
}

#[test]
fn load_rejects_malformed_json() {
    let codec = JsonCodec;
    let err = codec.load(b"not json").unwrap_err();
    assert!(matches!(err, WireError::Decode(_)));
}

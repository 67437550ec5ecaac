// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job store: the single hash mapping every submitted job id to its
//! encoded payload, independent of which queue currently references the id.

use std::sync::Arc;

use crate::client::StoreClient;
use crate::error::StoreError;

#[derive(Clone)]
pub struct JobStore {
    client: Arc<dyn StoreClient>,
    jobs_key: String,
}

impl JobStore {
    pub fn new(client: Arc<dyn StoreClient>, jobs_key: String) -> Self {
        Self { client, jobs_key }
    }

    pub async fn put(&self, id: &str, payload: &[u8]) -> Result<(), StoreError> {
        self.client.hash_set(&self.jobs_key, id, payload).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.client.hash_get(&self.jobs_key, id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.client.hash_delete(&self.jobs_key, id).await
    }
}

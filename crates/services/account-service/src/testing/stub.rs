//! Collection wrapper answering from canned results.

use std::sync::Arc;

use async_trait::async_trait;

use common::AppResult;
use domain::Record;

use super::CannedOperations;
use crate::repository::{Filter, ResourceCollection, UniqueKey};

/// Returns the canned value of a stubbed operation without looking at its
/// arguments; every other operation goes to the wrapped collection.
pub struct StubCollection {
    inner: Arc<dyn ResourceCollection>,
    canned: CannedOperations,
}

impl StubCollection {
    pub fn new(inner: Arc<dyn ResourceCollection>, canned: CannedOperations) -> Self {
        Self { inner, canned }
    }
}

#[async_trait]
impl ResourceCollection for StubCollection {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn find_many(&self, filter: &Filter) -> AppResult<Vec<Record>> {
        match &self.canned.find_many {
            Some(records) => Ok(records.clone()),
            None => self.inner.find_many(filter).await,
        }
    }

    async fn find_unique(&self, key: &UniqueKey) -> AppResult<Option<Record>> {
        match &self.canned.find_unique {
            Some(record) => Ok(record.clone()),
            None => self.inner.find_unique(key).await,
        }
    }

    async fn create(&self, payload: Record) -> AppResult<Record> {
        match &self.canned.create {
            Some(record) => Ok(record.clone()),
            None => self.inner.create(payload).await,
        }
    }

    async fn create_many(&self, payloads: Vec<Record>) -> AppResult<u64> {
        match self.canned.create_many {
            Some(count) => Ok(count),
            None => self.inner.create_many(payloads).await,
        }
    }

    async fn update(&self, key: &UniqueKey, patch: Record) -> AppResult<Record> {
        match &self.canned.update {
            Some(record) => Ok(record.clone()),
            None => self.inner.update(key, patch).await,
        }
    }

    async fn update_many(&self, filter: &Filter, patch: Record) -> AppResult<u64> {
        match self.canned.update_many {
            Some(count) => Ok(count),
            None => self.inner.update_many(filter, patch).await,
        }
    }

    async fn delete(&self, key: &UniqueKey) -> AppResult<Record> {
        match &self.canned.delete {
            Some(record) => Ok(record.clone()),
            None => self.inner.delete(key).await,
        }
    }

    async fn delete_many(&self, filter: &Filter) -> AppResult<u64> {
        match self.canned.delete_many {
            Some(count) => Ok(count),
            None => self.inner.delete_many(filter).await,
        }
    }
}

//! Gateway: the single entry point to every resource collection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use common::{AppError, AppResult, OptionExt};
use domain::Record;

use super::collection::{Filter, ResourceCollection, UniqueKey};
use super::memory::MemoryCollection;

type Collections = BTreeMap<&'static str, Arc<dyn ResourceCollection>>;

/// Named resource collections behind one handle.
///
/// The set of resources is fixed when the gateway is built. Cloning is cheap
/// and clones share the same collections.
#[derive(Clone)]
pub struct Gateway {
    collections: Arc<Collections>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Gateway backed by empty in-memory collections for every known resource
    pub fn in_memory() -> Self {
        domain::schemas()
            .into_iter()
            .fold(Self::builder(), |builder, schema| {
                builder.register(Arc::new(MemoryCollection::new(schema)))
            })
            .build()
    }

    /// Whether a resource is registered
    pub fn owns(&self, resource: &str) -> bool {
        self.collections.contains_key(resource)
    }

    /// Registered resource names, sorted
    pub fn resources(&self) -> Vec<&'static str> {
        self.collections.keys().copied().collect()
    }

    /// Collection registered under `resource`
    pub fn collection(&self, resource: &str) -> AppResult<Arc<dyn ResourceCollection>> {
        self.collections.get(resource).cloned().ok_or_else(|| {
            AppError::configuration(format!("Unknown resource '{}'", resource))
        })
    }

    pub(crate) fn collections(&self) -> &Collections {
        &self.collections
    }

    pub async fn find_many(&self, resource: &str, filter: &Filter) -> AppResult<Vec<Record>> {
        tracing::debug!(resource, ?filter, "find_many");
        self.collection(resource)?.find_many(filter).await
    }

    pub async fn find_unique(&self, resource: &str, key: &UniqueKey) -> AppResult<Option<Record>> {
        tracing::debug!(resource, %key, "find_unique");
        self.collection(resource)?.find_unique(key).await
    }

    /// Like `find_unique`, but a missing record is `NotFound`
    pub async fn find_unique_or_fail(&self, resource: &str, key: &UniqueKey) -> AppResult<Record> {
        self.find_unique(resource, key).await?.ok_or_not_found()
    }

    pub async fn create(&self, resource: &str, payload: Record) -> AppResult<Record> {
        tracing::debug!(resource, "create");
        self.collection(resource)?.create(payload).await
    }

    pub async fn create_many(&self, resource: &str, payloads: Vec<Record>) -> AppResult<u64> {
        tracing::debug!(resource, count = payloads.len(), "create_many");
        self.collection(resource)?.create_many(payloads).await
    }

    pub async fn update(&self, resource: &str, key: &UniqueKey, patch: Record) -> AppResult<Record> {
        tracing::debug!(resource, %key, "update");
        self.collection(resource)?.update(key, patch).await
    }

    pub async fn update_many(&self, resource: &str, filter: &Filter, patch: Record) -> AppResult<u64> {
        tracing::debug!(resource, ?filter, "update_many");
        self.collection(resource)?.update_many(filter, patch).await
    }

    pub async fn delete(&self, resource: &str, key: &UniqueKey) -> AppResult<Record> {
        tracing::debug!(resource, %key, "delete");
        self.collection(resource)?.delete(key).await
    }

    pub async fn delete_many(&self, resource: &str, filter: &Filter) -> AppResult<u64> {
        tracing::debug!(resource, ?filter, "delete_many");
        self.collection(resource)?.delete_many(filter).await
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("resources", &self.resources())
            .finish()
    }
}

/// Collects collections before the gateway is frozen.
#[derive(Default)]
pub struct GatewayBuilder {
    collections: Collections,
}

impl GatewayBuilder {
    /// Register a collection under its own name, replacing any earlier one
    pub fn register(mut self, collection: Arc<dyn ResourceCollection>) -> Self {
        let name = collection.name();
        if self.collections.insert(name, collection).is_some() {
            tracing::warn!(resource = name, "Replacing registered collection");
        }
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            collections: Arc::new(self.collections),
        }
    }
}

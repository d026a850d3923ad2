//! Test doubles for the gateway.
//!
//! `install_doubles` swaps selected collection operations for canned results.
//! The source gateway is never mutated: installation builds a new gateway, and
//! dropping it ends the substitution.
//!
//! ```ignore
//! let canned = CannedResults::from_json(r#"{ "user": { "findMany": [{ "id": 1 }] } }"#)?;
//! let stubbed = install_doubles(&gateway, canned)?;
//! ```

mod stub;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use common::{AppError, AppResult};
use domain::Record;

use crate::repository::{Gateway, ResourceCollection};

pub use stub::StubCollection;

/// Canned value per operation of one resource.
///
/// `None` leaves the operation untouched. For `find_unique`, `Some(None)`
/// stubs an absent record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CannedOperations {
    pub find_many: Option<Vec<Record>>,
    #[serde(default, deserialize_with = "present")]
    pub find_unique: Option<Option<Record>>,
    pub create: Option<Record>,
    #[serde(default, deserialize_with = "count")]
    pub create_many: Option<u64>,
    pub update: Option<Record>,
    #[serde(default, deserialize_with = "count")]
    pub update_many: Option<u64>,
    pub delete: Option<Record>,
    #[serde(default, deserialize_with = "count")]
    pub delete_many: Option<u64>,
}

impl CannedOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_find_many(mut self, records: Vec<Record>) -> Self {
        self.find_many = Some(records);
        self
    }

    pub fn with_find_unique(mut self, record: Option<Record>) -> Self {
        self.find_unique = Some(record);
        self
    }

    pub fn with_create(mut self, record: Record) -> Self {
        self.create = Some(record);
        self
    }

    pub fn with_create_many(mut self, count: u64) -> Self {
        self.create_many = Some(count);
        self
    }

    pub fn with_update(mut self, record: Record) -> Self {
        self.update = Some(record);
        self
    }

    pub fn with_update_many(mut self, count: u64) -> Self {
        self.update_many = Some(count);
        self
    }

    pub fn with_delete(mut self, record: Record) -> Self {
        self.delete = Some(record);
        self
    }

    pub fn with_delete_many(mut self, count: u64) -> Self {
        self.delete_many = Some(count);
        self
    }

    /// Names of the operations that carry a canned value
    pub fn stubbed_operations(&self) -> Vec<&'static str> {
        [
            ("findMany", self.find_many.is_some()),
            ("findUnique", self.find_unique.is_some()),
            ("create", self.create.is_some()),
            ("createMany", self.create_many.is_some()),
            ("update", self.update.is_some()),
            ("updateMany", self.update_many.is_some()),
            ("delete", self.delete.is_some()),
            ("deleteMany", self.delete_many.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, stubbed)| stubbed.then_some(name))
        .collect()
    }
}

/// Distinguishes an explicit `null` from a missing key
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Accepts a bare count or a `{ "count": n }` batch payload
fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Bare(u64),
        Batch { count: u64 },
    }

    Ok(Option::<Count>::deserialize(deserializer)?.map(|count| match count {
        Count::Bare(n) | Count::Batch { count: n } => n,
    }))
}

/// Resource name → canned operations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CannedResults {
    resources: BTreeMap<String, CannedOperations>,
}

impl CannedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the canned operations of a resource
    pub fn resource(mut self, name: impl Into<String>, operations: CannedOperations) -> Self {
        self.resources.insert(name.into(), operations);
        self
    }

    /// Parse a map shaped like `{ "user": { "findMany": [...] } }`
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| AppError::configuration(format!("Invalid canned results: {}", e)))
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Build a gateway whose named resources answer with canned results.
///
/// Every resource in `canned` must be owned by `gateway`; otherwise nothing is
/// installed and a `Configuration` error is returned. Operations without a
/// canned value delegate to the wrapped collection.
pub fn install_doubles(gateway: &Gateway, canned: CannedResults) -> AppResult<Gateway> {
    if let Some(unknown) = canned.resources().find(|name| !gateway.owns(name)) {
        return Err(AppError::configuration(format!(
            "Cannot stub unknown resource '{}'",
            unknown
        )));
    }

    let mut builder = Gateway::builder();
    for (name, collection) in gateway.collections() {
        let collection: Arc<dyn ResourceCollection> = match canned.resources.get(*name) {
            Some(operations) => {
                tracing::debug!(
                    resource = *name,
                    operations = ?operations.stubbed_operations(),
                    "Installing test double"
                );
                Arc::new(StubCollection::new(collection.clone(), operations.clone()))
            }
            None => collection.clone(),
        };
        builder = builder.register(collection);
    }

    Ok(builder.build())
}

impl Gateway {
    /// Shorthand for [`install_doubles`]
    pub fn with_doubles(&self, canned: CannedResults) -> AppResult<Gateway> {
        install_doubles(self, canned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_reads_camel_case_operations() {
        let canned = CannedResults::from_json(
            r#"{ "user": { "findMany": [{ "id": 1, "name": "A" }], "deleteMany": { "count": 2 } } }"#,
        )
        .unwrap();

        let user = &canned.resources["user"];
        assert_eq!(
            user.find_many,
            Some(vec![json!({ "id": 1, "name": "A" }).as_object().cloned().unwrap()])
        );
        assert_eq!(user.delete_many, Some(2));
        assert_eq!(user.stubbed_operations(), vec!["findMany", "deleteMany"]);
    }

    #[test]
    fn test_find_unique_null_is_a_canned_absence() {
        let canned = CannedResults::from_json(r#"{ "user": { "findUnique": null } }"#).unwrap();
        assert_eq!(canned.resources["user"].find_unique, Some(None));

        let canned = CannedResults::from_json(r#"{ "user": {} }"#).unwrap();
        assert_eq!(canned.resources["user"].find_unique, None);
    }

    #[test]
    fn test_bare_counts() {
        let canned = CannedResults::from_json(r#"{ "user": { "createMany": 3 } }"#).unwrap();
        assert_eq!(canned.resources["user"].create_many, Some(3));
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let result = CannedResults::from_json(r#"{ "user": { "upsert": {} } }"#);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_unknown_resource_fails_install() {
        let gateway = Gateway::in_memory();
        let canned = CannedResults::new().resource("invoice", CannedOperations::new());

        let result = install_doubles(&gateway, canned);

        assert!(matches!(result, Err(AppError::Configuration(msg)) if msg.contains("invoice")));
    }

    #[test]
    fn test_install_keeps_resource_set() {
        let gateway = Gateway::in_memory();
        let stubbed = gateway
            .with_doubles(CannedResults::new().resource("user", CannedOperations::new()))
            .unwrap();
        assert_eq!(stubbed.resources(), gateway.resources());
    }
}

//! Resource collection contract.
//!
//! Every stored resource (`user`, `business`, `attribute`) is exposed as a
//! `ResourceCollection`. Storage engines implement it; the gateway and the
//! test doubles only ever talk to this trait.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::AppResult;
use domain::{Record, ResourceSchema, FIELD_ID};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Conjunction of field equality tests.
///
/// A `null` value matches records where the field is null or missing.
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    /// Filter matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality test
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check every condition against a record
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }

    /// Same filter with every value in its stored form
    pub fn canonical(&self, schema: &ResourceSchema) -> Self {
        let conditions = self
            .conditions
            .iter()
            .map(|(field, value)| (field.clone(), schema.canonical_value(field, value)))
            .collect();
        Self { conditions }
    }

    /// Reject undeclared fields and values of the wrong kind
    pub fn validate(&self, schema: &ResourceSchema) -> AppResult<()> {
        for (field, value) in &self.conditions {
            let spec = schema.check_field(field)?;
            if !value.is_null() {
                schema.check_value(spec, value)?;
            }
        }
        Ok(())
    }
}

/// Address of a single record: the primary key or a unique field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueKey {
    pub field: String,
    pub value: Value,
}

impl UniqueKey {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Primary key lookup
    pub fn id(id: i64) -> Self {
        Self::new(FIELD_ID, id)
    }

    /// Reject non-unique fields and null or mistyped values
    pub fn validate(&self, schema: &ResourceSchema) -> AppResult<()> {
        let spec = schema.check_unique_key(&self.field)?;
        if self.value.is_null() {
            return Err(common::AppError::validation(format!(
                "{}.{} cannot be used as a null key",
                schema.name, self.field
            )));
        }
        schema.check_value(spec, &self.value)?;
        Ok(())
    }

    /// Same key with its value in stored form
    pub fn canonical(&self, schema: &ResourceSchema) -> Self {
        Self::new(self.field.clone(), schema.canonical_value(&self.field, &self.value))
    }

    /// Whether a record is the one this key addresses
    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field) == Some(&self.value)
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// Operation set every resource exposes.
///
/// `find_many`, `update_many` and `delete_many` never fail because nothing
/// matched. Keyed mutations (`update`, `delete`) fail with `NotFound` when the
/// key addresses nothing. `create_many` persists all payloads or none.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ResourceCollection: Send + Sync {
    /// Resource name this collection is registered under
    fn name(&self) -> &'static str;

    /// Records matching the filter, ordered by primary key
    async fn find_many(&self, filter: &Filter) -> AppResult<Vec<Record>>;

    /// Record addressed by the key, if any
    async fn find_unique(&self, key: &UniqueKey) -> AppResult<Option<Record>>;

    /// Insert one record; the primary key and timestamps are assigned here
    async fn create(&self, payload: Record) -> AppResult<Record>;

    /// Insert a batch atomically, returning how many records were created
    async fn create_many(&self, payloads: Vec<Record>) -> AppResult<u64>;

    /// Apply a patch to the addressed record
    async fn update(&self, key: &UniqueKey, patch: Record) -> AppResult<Record>;

    /// Apply a patch to every matching record, returning the count
    async fn update_many(&self, filter: &Filter, patch: Record) -> AppResult<u64>;

    /// Remove the addressed record and return it
    async fn delete(&self, key: &UniqueKey) -> AppResult<Record>;

    /// Remove every matching record, returning the count
    async fn delete_many(&self, filter: &Filter) -> AppResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::USER_SCHEMA;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::all().matches(&record(json!({ "id": 1 }))));
        assert!(Filter::all().is_empty());
    }

    #[test]
    fn test_filter_is_a_conjunction() {
        let rec = record(json!({ "id": 1, "email": "a@example.com" }));

        assert!(Filter::all().eq("id", 1).matches(&rec));
        assert!(Filter::all()
            .eq("id", 1)
            .eq("email", "a@example.com")
            .matches(&rec));
        assert!(!Filter::all()
            .eq("id", 1)
            .eq("email", "b@example.com")
            .matches(&rec));
    }

    #[test]
    fn test_null_filter_matches_missing_field() {
        let rec = record(json!({ "id": 1 }));
        assert!(Filter::all().eq("value", Value::Null).matches(&rec));
    }

    #[test]
    fn test_filter_validation() {
        assert!(Filter::all().eq("email", "a@example.com").validate(&USER_SCHEMA).is_ok());
        assert!(Filter::all().eq("nickname", "a").validate(&USER_SCHEMA).is_err());
        assert!(Filter::all().eq("id", "one").validate(&USER_SCHEMA).is_err());
    }

    #[test]
    fn test_canonical_filter_rewrites_timestamps_only() {
        let filter = Filter::all()
            .eq("created_at", "2024-01-01T02:00:00+02:00")
            .eq("email", "a@example.com")
            .canonical(&USER_SCHEMA);

        let stored = record(json!({
            "email": "a@example.com",
            "created_at": "2024-01-01T00:00:00.000000Z"
        }));
        assert!(filter.matches(&stored));
    }

    #[test]
    fn test_filter_from_json() {
        let filter: Filter = serde_json::from_value(json!({ "email": "a@example.com" })).unwrap();
        assert_eq!(filter, Filter::all().eq("email", "a@example.com"));
    }

    #[test]
    fn test_unique_key_validation() {
        assert!(UniqueKey::id(1).validate(&USER_SCHEMA).is_ok());
        assert!(UniqueKey::new("email", "a@example.com")
            .validate(&USER_SCHEMA)
            .is_ok());
        assert!(UniqueKey::new("password_hash", "x")
            .validate(&USER_SCHEMA)
            .is_err());
        assert!(UniqueKey::new("email", Value::Null)
            .validate(&USER_SCHEMA)
            .is_err());
    }

    #[test]
    fn test_unique_key_display() {
        assert_eq!(UniqueKey::id(7).to_string(), "id=7");
    }
}

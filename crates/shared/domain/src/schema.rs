//! Resource schemas - the storage constraints every collection enforces.
//!
//! A schema lists the fields a resource declares, which of them are required
//! or unique, and whether the collection stamps creation/update timestamps.
//! Both storage engines validate payloads and patches against the same schema
//! so they agree on what a `ValidationError` is.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::constants::{FIELD_CREATED_AT, FIELD_UPDATED_AT};
use crate::error::{DomainError, DomainResult};

/// A stored record: one JSON object per entity instance.
pub type Record = Map<String, Value>;

/// Value kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Timestamp,
}

impl FieldKind {
    /// Check whether a non-null JSON value is of this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Integer => value.is_i64(),
            FieldKind::Text => value.is_string(),
            FieldKind::Timestamp => value
                .as_str()
                .is_some_and(|s| s.parse::<DateTime<Utc>>().is_ok()),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Integer => write!(f, "an integer"),
            FieldKind::Text => write!(f, "a string"),
            FieldKind::Timestamp => write!(f, "an RFC 3339 timestamp"),
        }
    }
}

/// Declaration of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Must be present and non-null on creation
    pub required: bool,
    /// Usable as a unique key; duplicates are a conflict
    pub unique: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            unique: false,
        }
    }

    /// Optional fields, and fields the collection assigns itself (ids, timestamps)
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }
}

/// Storage constraints of one resource
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub fields: &'static [FieldSpec],
    /// Stamp `created_at` / `updated_at` on writes
    pub timestamps: bool,
}

impl ResourceSchema {
    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a declared field, failing on undeclared names
    pub fn check_field(&self, name: &str) -> DomainResult<&FieldSpec> {
        self.field(name).ok_or_else(|| {
            DomainError::validation(format!("{} has no field '{}'", self.name, name))
        })
    }

    /// Fields other than the primary key that must hold distinct values
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(move |f| f.unique && f.name != self.primary_key)
    }

    /// Check that a field can address a single record
    pub fn check_unique_key(&self, name: &str) -> DomainResult<&FieldSpec> {
        let spec = self.check_field(name)?;
        if name == self.primary_key || spec.unique {
            Ok(spec)
        } else {
            Err(DomainError::validation(format!(
                "{}.{} is not a unique field",
                self.name, name
            )))
        }
    }

    /// Validate a single value against its field declaration
    pub fn check_value(&self, spec: &FieldSpec, value: &Value) -> DomainResult<()> {
        if value.is_null() {
            if spec.required {
                return Err(DomainError::validation(format!(
                    "{}.{} cannot be null",
                    self.name, spec.name
                )));
            }
            return Ok(());
        }

        if !spec.kind.accepts(value) {
            return Err(DomainError::validation(format!(
                "{}.{} must be {}",
                self.name, spec.name, spec.kind
            )));
        }

        Ok(())
    }

    /// Validate a creation payload: declared fields only, well-typed values,
    /// every required field present.
    pub fn check_payload(&self, payload: &Record) -> DomainResult<()> {
        for (name, value) in payload {
            let spec = self.check_field(name)?;
            self.check_value(spec, value)?;
        }

        for spec in self.fields.iter().filter(|f| f.required) {
            match payload.get(spec.name) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(DomainError::validation(format!(
                        "{}.{} is required",
                        self.name, spec.name
                    )))
                }
            }
        }

        Ok(())
    }

    /// Validate an update patch: declared fields only, primary key untouched,
    /// required fields not cleared.
    pub fn check_patch(&self, patch: &Record) -> DomainResult<()> {
        for (name, value) in patch {
            let spec = self.check_field(name)?;
            if name == self.primary_key {
                return Err(DomainError::validation(format!(
                    "{}.{} is immutable",
                    self.name, name
                )));
            }
            self.check_value(spec, value)?;
        }
        Ok(())
    }

    /// Fill in creation timestamps; caller-supplied values are kept.
    pub fn stamp_created(&self, record: &mut Record, now: DateTime<Utc>) {
        if !self.timestamps {
            return;
        }
        let stamp = timestamp_value(now);
        record
            .entry(FIELD_CREATED_AT)
            .or_insert_with(|| stamp.clone());
        record.entry(FIELD_UPDATED_AT).or_insert(stamp);
    }

    /// Refresh the update timestamp
    pub fn stamp_updated(&self, record: &mut Record, now: DateTime<Utc>) {
        if self.timestamps {
            record.insert(FIELD_UPDATED_AT.to_string(), timestamp_value(now));
        }
    }

    /// Stored form of a field value. Timestamps written with any offset or
    /// precision become UTC with microseconds, so equal instants compare equal.
    pub fn canonical_value(&self, field: &str, value: &Value) -> Value {
        let instant = match self.field(field) {
            Some(spec) if spec.kind == FieldKind::Timestamp => value
                .as_str()
                .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
            _ => None,
        };
        match instant {
            Some(at) => timestamp_value(at),
            None => value.clone(),
        }
    }

    /// Rewrite every field of a record into its stored form
    pub fn canonicalize(&self, record: &mut Record) {
        for (field, value) in record.iter_mut() {
            *value = self.canonical_value(field, value);
        }
    }
}

/// Timestamps are stored as RFC 3339 strings with microsecond precision.
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Decode a stored record into a typed domain entity.
///
/// A record that does not match the entity shape is an internal error: the
/// collection accepted something its schema should have rejected.
pub fn decode_record<T: DeserializeOwned>(resource: &str, record: Record) -> DomainResult<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DomainError::internal(format!("Malformed {} record: {}", resource, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static WIDGET: ResourceSchema = ResourceSchema {
        name: "widget",
        primary_key: "id",
        fields: &[
            FieldSpec::optional("id", FieldKind::Integer).unique(),
            FieldSpec::required("code", FieldKind::Text).unique(),
            FieldSpec::required("label", FieldKind::Text),
            FieldSpec::optional("note", FieldKind::Text),
            FieldSpec::optional("created_at", FieldKind::Timestamp),
            FieldSpec::optional("updated_at", FieldKind::Timestamp),
        ],
        timestamps: true,
    };

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_payload_with_required_fields_is_valid() {
        let payload = record(json!({ "code": "w-1", "label": "Widget" }));
        assert!(WIDGET.check_payload(&payload).is_ok());
    }

    #[test]
    fn test_payload_missing_required_field() {
        let payload = record(json!({ "code": "w-1" }));
        let err = WIDGET.check_payload(&payload).unwrap_err();
        assert_eq!(err, DomainError::validation("widget.label is required"));
    }

    #[test]
    fn test_payload_with_null_required_field() {
        let payload = record(json!({ "code": "w-1", "label": null }));
        assert!(WIDGET.check_payload(&payload).is_err());
    }

    #[test]
    fn test_payload_with_undeclared_field() {
        let payload = record(json!({ "code": "w-1", "label": "Widget", "colour": "red" }));
        let err = WIDGET.check_payload(&payload).unwrap_err();
        assert_eq!(err, DomainError::validation("widget has no field 'colour'"));
    }

    #[test]
    fn test_payload_with_wrong_kind() {
        let payload = record(json!({ "code": 7, "label": "Widget" }));
        let err = WIDGET.check_payload(&payload).unwrap_err();
        assert_eq!(err, DomainError::validation("widget.code must be a string"));
    }

    #[test]
    fn test_optional_field_may_be_null() {
        let payload = record(json!({ "code": "w-1", "label": "Widget", "note": null }));
        assert!(WIDGET.check_payload(&payload).is_ok());
    }

    #[test]
    fn test_patch_cannot_touch_primary_key() {
        let patch = record(json!({ "id": 9 }));
        assert!(WIDGET.check_patch(&patch).is_err());
    }

    #[test]
    fn test_patch_cannot_clear_required_field() {
        let patch = record(json!({ "label": null }));
        assert!(WIDGET.check_patch(&patch).is_err());

        let patch = record(json!({ "note": null }));
        assert!(WIDGET.check_patch(&patch).is_ok());
    }

    #[test]
    fn test_unique_key_fields() {
        assert!(WIDGET.check_unique_key("id").is_ok());
        assert!(WIDGET.check_unique_key("code").is_ok());
        assert!(WIDGET.check_unique_key("label").is_err());
        assert!(WIDGET.check_unique_key("missing").is_err());

        let names: Vec<_> = WIDGET.unique_fields().map(|f| f.name).collect();
        assert_eq!(names, vec!["code"]);
    }

    #[test]
    fn test_stamp_created_keeps_supplied_values() {
        let now = Utc::now();
        let mut rec = record(json!({ "created_at": "2024-01-01T00:00:00Z" }));
        WIDGET.stamp_created(&mut rec, now);

        assert_eq!(rec["created_at"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(rec["updated_at"], timestamp_value(now));
        assert!(FieldKind::Timestamp.accepts(&rec["updated_at"]));
    }

    #[test]
    fn test_canonical_timestamps_compare_by_instant() {
        let utc = WIDGET.canonical_value("created_at", &json!("2024-01-01T00:00:00Z"));
        let offset = WIDGET.canonical_value("created_at", &json!("2024-01-01T02:00:00+02:00"));
        let micros = WIDGET.canonical_value("created_at", &json!("2024-01-01T00:00:00.000000Z"));

        assert_eq!(utc, json!("2024-01-01T00:00:00.000000Z"));
        assert_eq!(utc, offset);
        assert_eq!(utc, micros);
    }

    #[test]
    fn test_canonicalize_leaves_other_fields_alone() {
        let mut rec = record(json!({
            "code": "2024-01-01T00:00:00Z",
            "updated_at": "2024-06-01T12:00:00+01:00",
            "note": null
        }));
        WIDGET.canonicalize(&mut rec);

        assert_eq!(rec["code"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(rec["updated_at"], json!("2024-06-01T11:00:00.000000Z"));
        assert_eq!(rec["note"], Value::Null);
    }
}

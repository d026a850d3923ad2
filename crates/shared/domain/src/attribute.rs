//! Attribute domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::constants::{FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT, RESOURCE_ATTRIBUTE};
use crate::schema::{FieldKind, FieldSpec, Record, ResourceSchema};

/// Storage constraints of the `attribute` resource
pub static ATTRIBUTE_SCHEMA: ResourceSchema = ResourceSchema {
    name: RESOURCE_ATTRIBUTE,
    primary_key: FIELD_ID,
    fields: &[
        FieldSpec::optional(FIELD_ID, FieldKind::Integer).unique(),
        FieldSpec::required("business_id", FieldKind::Integer),
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::optional("value", FieldKind::Text),
        FieldSpec::optional(FIELD_CREATED_AT, FieldKind::Timestamp),
        FieldSpec::optional(FIELD_UPDATED_AT, FieldKind::Timestamp),
    ],
    timestamps: true,
};

/// Named value attached to a business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attribute creation data transfer object
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAttribute {
    /// Owning business
    #[validate(range(min = 1, message = "business_id must be a positive id"))]
    pub business_id: i64,
    #[validate(length(min = 1, message = "name should not be empty"))]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl CreateAttribute {
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("business_id".to_string(), Value::from(self.business_id));
        record.insert("name".to_string(), Value::String(self.name));
        if let Some(value) = self.value {
            record.insert("value".to_string(), Value::String(value));
        }
        record
    }
}

/// Attribute update data transfer object
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAttribute {
    #[validate(length(min = 1, message = "name should not be empty"))]
    pub name: Option<String>,
    pub value: Option<String>,
}

impl UpdateAttribute {
    /// Patch holding only the fields that were provided
    pub fn into_patch(self) -> Record {
        let mut patch = Record::new();
        if let Some(name) = self.name {
            patch.insert("name".to_string(), Value::String(name));
        }
        if let Some(value) = self.value {
            patch.insert("value".to_string(), Value::String(value));
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_attribute_validation() {
        let valid = CreateAttribute {
            business_id: 1,
            name: "colour".to_string(),
            value: Some("green".to_string()),
        };
        assert!(valid.validate().is_ok());

        let orphan = CreateAttribute {
            business_id: 0,
            ..valid.clone()
        };
        assert!(orphan.validate().is_err());

        let unnamed = CreateAttribute {
            name: String::new(),
            ..valid
        };
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_into_record_skips_missing_value() {
        let record = CreateAttribute {
            business_id: 3,
            name: "colour".to_string(),
            value: None,
        }
        .into_record();

        assert!(ATTRIBUTE_SCHEMA.check_payload(&record).is_ok());
        assert_eq!(record["business_id"], json!(3));
        assert!(!record.contains_key("value"));
    }

    #[test]
    fn test_update_patch() {
        let patch = UpdateAttribute {
            name: None,
            value: Some("blue".to_string()),
        }
        .into_patch();

        assert_eq!(patch.len(), 1);
        assert!(ATTRIBUTE_SCHEMA.check_patch(&patch).is_ok());
    }
}

//! Business domain entity and related types.
//!
//! A business is an account: it carries everything a user registers with plus
//! a display name. `CreateBusiness` therefore embeds `CreateUser` instead of
//! repeating its fields, and validating a business validates the embedded
//! user rules as well as its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::constants::{FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT, RESOURCE_BUSINESS};
use crate::password::Password;
use crate::schema::{FieldKind, FieldSpec, Record, ResourceSchema};
use crate::user::CreateUser;

/// Storage constraints of the `business` resource
pub static BUSINESS_SCHEMA: ResourceSchema = ResourceSchema {
    name: RESOURCE_BUSINESS,
    primary_key: FIELD_ID,
    fields: &[
        FieldSpec::optional(FIELD_ID, FieldKind::Integer).unique(),
        FieldSpec::required("email", FieldKind::Text).unique(),
        FieldSpec::required("password_hash", FieldKind::Text),
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::optional(FIELD_CREATED_AT, FieldKind::Timestamp),
        FieldSpec::optional(FIELD_UPDATED_AT, FieldKind::Timestamp),
    ],
    timestamps: true,
};

/// Business domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Business creation data transfer object.
///
/// On the wire the user fields sit next to `name`:
/// `{ "email": ..., "password": ..., "name": ... }`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBusiness {
    #[serde(flatten)]
    #[validate(nested)]
    pub user: CreateUser,
    /// Business display name
    #[validate(length(min = 1, message = "name should not be empty"))]
    pub name: String,
}

impl CreateBusiness {
    /// Build the storage payload; the password must already be hashed.
    pub fn into_record(self, password: Password) -> Record {
        let mut record = self.user.into_record(password);
        record.insert("name".to_string(), Value::String(self.name));
        record
    }
}

/// Business update data transfer object
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBusiness {
    /// New display name
    #[validate(length(min = 1, message = "name should not be empty"))]
    pub name: Option<String>,
}

impl UpdateBusiness {
    /// Patch holding only the fields that were provided
    pub fn into_patch(self) -> Record {
        let mut patch = Record::new();
        if let Some(name) = self.name {
            patch.insert("name".to_string(), Value::String(name));
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_business(email: &str, password: &str, name: &str) -> CreateBusiness {
        serde_json::from_value(json!({
            "email": email,
            "password": password,
            "name": name,
        }))
        .unwrap()
    }

    #[test]
    fn test_flattened_wire_shape() {
        let dto = create_business("shop@example.com", "correct horse", "Corner Shop");
        assert_eq!(dto.user.email, "shop@example.com");
        assert_eq!(dto.name, "Corner Shop");
    }

    #[test]
    fn test_valid_create_business() {
        let dto = create_business("shop@example.com", "correct horse", "Corner Shop");
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let dto = create_business("shop@example.com", "correct horse", "");
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_base_rules_still_apply() {
        let dto = create_business("not-an-email", "correct horse", "Corner Shop");
        let errors = dto.validate().unwrap_err();
        assert!(errors.errors().contains_key("user"));
        assert!(!errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_base_and_derived_failures_are_both_reported() {
        let dto = create_business("not-an-email", "short", "");
        let errors = dto.validate().unwrap_err();
        assert!(errors.errors().contains_key("user"));
        assert!(errors.errors().contains_key("name"));
    }

    #[test]
    fn test_missing_name_fails_to_decode() {
        let result: Result<CreateBusiness, _> = serde_json::from_value(json!({
            "email": "shop@example.com",
            "password": "correct horse",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_into_record_satisfies_schema() {
        let dto = create_business("shop@example.com", "correct horse", "Corner Shop");
        let record = dto.into_record(Password::from_hash("hashed".to_string()));

        assert!(BUSINESS_SCHEMA.check_payload(&record).is_ok());
        assert_eq!(record["name"], json!("Corner Shop"));
    }

    #[test]
    fn test_update_patch_only_carries_provided_fields() {
        assert!(UpdateBusiness::default().into_patch().is_empty());

        let patch = UpdateBusiness {
            name: Some("Renamed".to_string()),
        }
        .into_patch();
        assert_eq!(patch["name"], json!("Renamed"));
    }

    #[test]
    fn test_update_rejects_empty_name() {
        let dto = UpdateBusiness {
            name: Some(String::new()),
        };
        assert!(dto.validate().is_err());
    }
}

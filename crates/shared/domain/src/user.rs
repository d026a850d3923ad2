//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::constants::{FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT, RESOURCE_USER};
use crate::password::Password;
use crate::schema::{FieldKind, FieldSpec, Record, ResourceSchema};

/// Storage constraints of the `user` resource
pub static USER_SCHEMA: ResourceSchema = ResourceSchema {
    name: RESOURCE_USER,
    primary_key: FIELD_ID,
    fields: &[
        FieldSpec::optional(FIELD_ID, FieldKind::Integer).unique(),
        FieldSpec::required("email", FieldKind::Text).unique(),
        FieldSpec::required("password_hash", FieldKind::Text),
        FieldSpec::optional(FIELD_CREATED_AT, FieldKind::Timestamp),
        FieldSpec::optional(FIELD_UPDATED_AT, FieldKind::Timestamp),
    ],
    timestamps: true,
};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check a plain-text password against the stored hash
    pub fn verify_password(&self, plain_text: &str) -> bool {
        Password::from_hash(self.password_hash.clone()).verify(plain_text)
    }
}

/// User creation data transfer object
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    /// User email address
    #[validate(email(message = "email must be an email"))]
    pub email: String,
    /// User password (minimum 8 characters)
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

impl CreateUser {
    /// Build the storage payload; the password must already be hashed.
    pub fn into_record(self, password: Password) -> Record {
        let mut record = Record::new();
        record.insert("email".to_string(), Value::String(self.email));
        record.insert(
            "password_hash".to_string(),
            Value::String(password.into_string()),
        );
        record
    }
}

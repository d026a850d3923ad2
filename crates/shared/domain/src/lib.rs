//! Domain layer - Core entities, boundary DTOs and storage schemas.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Storage engines and services in the account service build on these types.

pub mod attribute;
pub mod business;
pub mod constants;
pub mod error;
pub mod password;
pub mod schema;
pub mod user;

pub use attribute::{Attribute, CreateAttribute, UpdateAttribute, ATTRIBUTE_SCHEMA};
pub use business::{Business, CreateBusiness, UpdateBusiness, BUSINESS_SCHEMA};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use schema::{decode_record, FieldKind, FieldSpec, Record, ResourceSchema};
pub use user::{CreateUser, User, USER_SCHEMA};

/// Schemas of every resource the system stores
pub fn schemas() -> [&'static ResourceSchema; 3] {
    [&USER_SCHEMA, &BUSINESS_SCHEMA, &ATTRIBUTE_SCHEMA]
}

/// Look up the schema of a resource by name
pub fn schema_for(name: &str) -> Option<&'static ResourceSchema> {
    schemas().into_iter().find(|schema| schema.name == name)
}

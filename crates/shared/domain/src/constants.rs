//! Domain-level constants.
//!
//! These constants define resource names and validation requirements.

// =============================================================================
// Resources
// =============================================================================

/// Resource name of the user collection
pub const RESOURCE_USER: &str = "user";

/// Resource name of the business collection
pub const RESOURCE_BUSINESS: &str = "business";

/// Resource name of the attribute collection
pub const RESOURCE_ATTRIBUTE: &str = "attribute";

/// All resource names known to the system
pub const RESOURCES: &[&str] = &[RESOURCE_USER, RESOURCE_BUSINESS, RESOURCE_ATTRIBUTE];

/// Check if a resource name is known
pub fn is_known_resource(name: &str) -> bool {
    RESOURCES.contains(&name)
}

// =============================================================================
// Fields
// =============================================================================

/// Primary key field shared by every resource
pub const FIELD_ID: &str = "id";

/// Creation timestamp stamped by the collections
pub const FIELD_CREATED_AT: &str = "created_at";

/// Last modification timestamp stamped by the collections
pub const FIELD_UPDATED_AT: &str = "updated_at";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum name length requirement
pub const MIN_NAME_LENGTH: usize = 1;

//! Role id namespacing
//!
//! Callers see "external" role ids (`ADMIN`, `sales`), the store keeps
//! "internal" ids carrying the `role_` prefix (`role_ADMIN`, `role_sales`).
//! Legacy custom roles were created with random ids and are exposed with the
//! prefix intact.

use super::builtin::BuiltinRoleId;
use super::types::RoleIdVersion;
use crate::error::{AuthzError, Result};

/// Document type prefix for role documents
pub const ROLE_PREFIX: &str = "role_";

/// Map any role id to its internal storage id
pub fn db_role_id(role_id: &str) -> String {
    if role_id.starts_with(ROLE_PREFIX) {
        role_id.to_string()
    } else {
        format!("{}{}", ROLE_PREFIX, role_id)
    }
}

/// Map an internal role id to the id exposed to callers
pub fn external_role_id(role_id: &str, version: Option<RoleIdVersion>) -> String {
    match role_id.strip_prefix(ROLE_PREFIX) {
        Some(stripped)
            if version == Some(RoleIdVersion::Name) || BuiltinRoleId::parse(stripped).is_some() =>
        {
            stripped.to_string()
        }
        _ => role_id.to_string(),
    }
}

/// Whether the id (internal or external) names a built-in role
pub fn is_builtin(role_id: &str) -> bool {
    BuiltinRoleId::parse(role_id.strip_prefix(ROLE_PREFIX).unwrap_or(role_id)).is_some()
}

/// Id for a newly created role
///
/// Names that already carry the `role_` prefix or that equal a built-in id
/// are rejected; either would alias an existing id space.
pub fn generate_role_id(name: &str) -> Result<String> {
    let name = name.trim();
    if name.starts_with(ROLE_PREFIX) {
        return Err(AuthzError::Validation(format!(
            "Role name '{}' must not start with '{}'",
            name, ROLE_PREFIX
        )));
    }
    if is_builtin(name) {
        return Err(AuthzError::Validation(format!(
            "Role name '{}' is reserved for a built-in role",
            name
        )));
    }
    Ok(db_role_id(name))
}

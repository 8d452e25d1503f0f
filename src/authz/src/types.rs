//! Core permission types

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a permissionable resource (table, query, automation, ...)
pub type ResourceId = String;

/// Role identifier, either external (`ADMIN`, `sales`) or internal (`role_ADMIN`)
pub type RoleId = String;

/// Permission level
///
/// `Read`, `Write` and `Execute` are independent grants. `Admin` only appears
/// inside built-in permission presets and can never be granted on a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    Execute,
    Admin,
}

/// Levels that can be granted on a role, in the order they are reported
pub const SUPPORTED_LEVELS: [PermissionLevel; 3] = [
    PermissionLevel::Write,
    PermissionLevel::Read,
    PermissionLevel::Execute,
];

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
            Self::Admin => "admin",
        }
    }

    /// Whether this level can be granted explicitly on a role
    pub fn is_supported(&self) -> bool {
        SUPPORTED_LEVELS.contains(self)
    }

    /// Reject levels that cannot be granted explicitly
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(AuthzError::Validation(format!(
                "Permission level '{}' cannot be granted on a role",
                self
            )))
        }
    }

    /// Levels implied by a preset entry at this level
    pub fn allowed_levels(&self) -> &'static [PermissionLevel] {
        match self {
            Self::Read => &[Self::Read],
            Self::Write => &[Self::Read, Self::Write],
            Self::Execute => &[Self::Execute],
            Self::Admin => &[Self::Read, Self::Write, Self::Execute],
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "execute" => Ok(Self::Execute),
            "admin" => Ok(Self::Admin),
            other => Err(AuthzError::Validation(format!(
                "Unknown permission level: {}",
                other
            ))),
        }
    }
}

/// Where a resource permission came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionSource {
    /// Granted on a role's permission map
    Explicit,
    /// Fallback derived from the built-in presets
    Base,
}

/// Effective holder of one level on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermission {
    /// External role id
    pub role: RoleId,

    #[serde(rename = "permissionType")]
    pub source: PermissionSource,
}

impl ResourcePermission {
    pub fn explicit(role: impl Into<RoleId>) -> Self {
        Self {
            role: role.into(),
            source: PermissionSource::Explicit,
        }
    }

    pub fn base(role: impl Into<RoleId>) -> Self {
        Self {
            role: role.into(),
            source: PermissionSource::Base,
        }
    }
}

/// Direction of a permission mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionUpdateType {
    Add,
    Remove,
}

/// A (role, resource, level) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    pub level: PermissionLevel,
}

impl PermissionGrant {
    pub fn new(
        role_id: impl Into<RoleId>,
        resource_id: impl Into<ResourceId>,
        level: PermissionLevel,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            resource_id: resource_id.into(),
            level,
        }
    }
}

/// Outcome of writing one role document during a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdateResult {
    /// External role id
    #[serde(rename = "_id")]
    pub id: RoleId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RoleUpdateResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("read".parse::<PermissionLevel>().unwrap(), PermissionLevel::Read);
        assert_eq!("WRITE".parse::<PermissionLevel>().unwrap(), PermissionLevel::Write);
        assert!("delete".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_admin_is_not_grantable() {
        assert!(PermissionLevel::Admin.ensure_supported().is_err());
        for level in SUPPORTED_LEVELS {
            assert!(level.ensure_supported().is_ok());
        }
    }

    #[test]
    fn test_allowed_levels() {
        assert_eq!(PermissionLevel::Read.allowed_levels(), &[PermissionLevel::Read]);
        assert!(PermissionLevel::Write.allowed_levels().contains(&PermissionLevel::Read));
        assert!(!PermissionLevel::Write.allowed_levels().contains(&PermissionLevel::Execute));
        assert_eq!(PermissionLevel::Admin.allowed_levels().len(), 3);
    }

    #[test]
    fn test_resource_permission_serialization() {
        let perm = ResourcePermission::explicit("PUBLIC");
        let json = serde_json::to_value(&perm).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "role": "PUBLIC", "permissionType": "EXPLICIT" })
        );
    }
}

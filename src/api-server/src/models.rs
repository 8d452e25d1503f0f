use budibase_authz::{
    AccessDecision, BuiltinPermissionId, PermissionLevel, ResourcePermission, Role, RoleIdVersion,
    RoleSet, RoleUpdateResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Role create/update request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveRoleRequest {
    /// Existing role id; omit to create a role with a name-based id
    #[serde(rename = "_id", default)]
    pub id: Option<String>,

    /// Current revision, required when updating a persisted role
    #[serde(rename = "_rev", default)]
    pub rev: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Built-in preset used for base permission checks
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "write")]
    pub permission_id: Option<BuiltinPermissionId>,

    /// Parent role ids
    #[serde(default)]
    pub inherits: Vec<String>,

    /// resource id -> granted levels; omit on update to keep the stored grants
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub permissions: Option<BTreeMap<String, Vec<PermissionLevel>>>,
}

impl SaveRoleRequest {
    pub fn into_role(self) -> Role {
        let mut role = Role::new(self.id.unwrap_or_default(), self.name).with_inherits(self.inherits);
        role.rev = self.rev;
        role.permission_id = self.permission_id;
        role.permissions = self.permissions.unwrap_or_default();
        role
    }
}

/// Response of a role save
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveRoleResponse {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Role as returned to API callers, with external ids
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub permission_id: Option<BuiltinPermissionId>,

    pub inherits: Vec<String>,

    #[schema(value_type = Object)]
    pub permissions: BTreeMap<String, Vec<PermissionLevel>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub version: Option<RoleIdVersion>,
}

impl RoleResponse {
    /// Parents are reported with the external id of the role they point at
    pub fn from_role(role: &Role, roles: &RoleSet) -> Self {
        let inherits = role
            .inherits
            .iter()
            .map(|parent| match roles.get(parent) {
                Some(parent) => parent.external_id(),
                None => budibase_authz::external_role_id(parent, None),
            })
            .collect();

        Self {
            id: role.external_id(),
            rev: role.rev.clone(),
            name: role.name.clone(),
            permission_id: role.permission_id,
            inherits,
            permissions: role.permissions.clone(),
            version: role.version,
        }
    }
}

/// Effective holder of one level on a resource
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourcePermissionResponse {
    pub role: String,

    /// `EXPLICIT` or `BASE`
    #[serde(rename = "permissionType")]
    pub permission_type: String,
}

impl From<ResourcePermission> for ResourcePermissionResponse {
    fn from(permission: ResourcePermission) -> Self {
        let permission_type = match permission.source {
            budibase_authz::PermissionSource::Explicit => "EXPLICIT",
            budibase_authz::PermissionSource::Base => "BASE",
        };
        Self {
            role: permission.role,
            permission_type: permission_type.to_string(),
        }
    }
}

/// Permissions of a resource keyed by level
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourcePermissionsResponse {
    pub permissions: BTreeMap<String, ResourcePermissionResponse>,
}

/// Roles to receive the write and read grants of a resource
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPermissionsRequest {
    #[validate(length(min = 1, max = 255))]
    pub write_role: String,

    #[validate(length(min = 1, max = 255))]
    pub read_role: String,
}

/// Per-role outcome of a permission mutation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleUpdateResponse {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<RoleUpdateResult> for RoleUpdateResponse {
    fn from(result: RoleUpdateResult) -> Self {
        Self {
            id: result.id,
            rev: result.rev,
            error: result.error,
            reason: result.reason,
        }
    }
}

/// Access check outcome
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessResponse {
    pub allowed: bool,

    /// Role that granted access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(rename = "permissionType", skip_serializing_if = "Option::is_none")]
    pub permission_type: Option<String>,

    pub reason: String,
}

impl From<AccessDecision> for AccessResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            allowed: decision.allowed,
            role: decision.role,
            permission_type: decision.source.map(|source| match source {
                budibase_authz::PermissionSource::Explicit => "EXPLICIT".to_string(),
                budibase_authz::PermissionSource::Base => "BASE".to_string(),
            }),
            reason: decision.reason,
        }
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

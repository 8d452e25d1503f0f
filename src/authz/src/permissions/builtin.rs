//! Built-in permission presets and base (fallback) permissions

use crate::roles::builtin::lower_builtin_role;
use crate::roles::BuiltinRoleId;
use crate::types::{PermissionLevel, SUPPORTED_LEVELS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preset referenced by a role's `permissionId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinPermissionId {
    Public,
    ReadOnly,
    Write,
    Power,
    Admin,
}

impl BuiltinPermissionId {
    pub const ALL: [BuiltinPermissionId; 5] = [
        Self::Public,
        Self::ReadOnly,
        Self::Write,
        Self::Power,
        Self::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::ReadOnly => "read_only",
            Self::Write => "write",
            Self::Power => "power",
            Self::Admin => "admin",
        }
    }
}

/// Kind of resource a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    App,
    Table,
    User,
    Automation,
    Webhook,
    Query,
    LegacyView,
}

/// Resource type from the document type prefix of its id
pub fn permission_type(resource_id: &str) -> PermissionType {
    let doc_type = resource_id.split('_').next().unwrap_or_default();
    match doc_type {
        "ta" | "ro" => PermissionType::Table,
        "au" => PermissionType::Automation,
        "wh" => PermissionType::Webhook,
        "query" | "datasource" => PermissionType::Query,
        // views are addressed by name and end up here
        _ => PermissionType::LegacyView,
    }
}

/// One (type, level) entry of a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedPermission {
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    pub level: PermissionLevel,
}

/// Built-in permission preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinPermission {
    #[serde(rename = "_id")]
    pub id: BuiltinPermissionId,
    pub name: String,
    pub permissions: Vec<TypedPermission>,
}

impl BuiltinPermission {
    /// Whether this preset allows `level` on resources of `permission_type`
    pub fn allows(&self, permission_type: PermissionType, level: PermissionLevel) -> bool {
        self.permissions
            .iter()
            .filter(|perm| perm.permission_type == permission_type)
            .any(|perm| perm.level.allowed_levels().contains(&level))
    }
}

/// Preset definition for an id
pub fn builtin_permission(id: BuiltinPermissionId) -> BuiltinPermission {
    use PermissionLevel::*;
    use PermissionType::*;

    let (name, entries): (&str, Vec<(PermissionType, PermissionLevel)>) = match id {
        BuiltinPermissionId::Public => ("Public", vec![(Webhook, Execute)]),
        BuiltinPermissionId::ReadOnly => ("Read only", vec![(Query, Read), (Table, Read), (App, Read)]),
        BuiltinPermissionId::Write => (
            "Read/Write",
            vec![
                (Query, Write),
                (Table, Write),
                (Automation, Execute),
                (LegacyView, Read),
                (App, Read),
            ],
        ),
        BuiltinPermissionId::Power => (
            "Power",
            vec![
                (Table, Write),
                (User, Read),
                (Automation, Execute),
                (Webhook, Read),
                (Query, Write),
                (LegacyView, Read),
                (App, Read),
            ],
        ),
        BuiltinPermissionId::Admin => (
            "Admin",
            vec![
                (Table, Admin),
                (User, Admin),
                (Automation, Admin),
                (Webhook, Read),
                (Query, Admin),
                (LegacyView, Read),
                (App, Read),
            ],
        ),
    };

    BuiltinPermission {
        id,
        name: name.to_string(),
        permissions: entries
            .into_iter()
            .map(|(permission_type, level)| TypedPermission {
                permission_type,
                level,
            })
            .collect(),
    }
}

/// Every built-in preset
pub fn builtin_permissions() -> Vec<BuiltinPermission> {
    BuiltinPermissionId::ALL
        .into_iter()
        .map(builtin_permission)
        .collect()
}

/// Fallback role per level for a resource with no explicit grants
///
/// For each built-in role whose preset covers the resource type with a
/// grantable level, the lowest such role wins. A write entry also counts as
/// the read fallback.
pub fn base_permissions(resource_id: &str) -> BTreeMap<PermissionLevel, BuiltinRoleId> {
    let resource_type = permission_type(resource_id);
    let mut base: BTreeMap<PermissionLevel, BuiltinRoleId> = BTreeMap::new();

    for role_id in BuiltinRoleId::ALL {
        let Some(permission_id) = role_id.role().permission_id else {
            continue;
        };
        let preset = builtin_permission(permission_id);
        let Some(entry) = preset
            .permissions
            .iter()
            .find(|perm| perm.permission_type == resource_type)
        else {
            continue;
        };
        if !SUPPORTED_LEVELS.contains(&entry.level) {
            continue;
        }

        let lowered = lower_builtin_role(base.get(&entry.level).copied(), role_id);
        base.insert(entry.level, lowered);

        if entry.level == PermissionLevel::Write {
            let lowered = lower_builtin_role(base.get(&PermissionLevel::Read).copied(), role_id);
            base.insert(PermissionLevel::Read, lowered);
        }
    }

    base
}

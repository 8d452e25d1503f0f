//! Built-in role catalogue
//!
//! Built-in roles always exist conceptually. They are synthesized from this
//! table whenever the store has no document for them yet.

use super::ids::db_role_id;
use super::types::Role;
use crate::permissions::BuiltinPermissionId;
use std::fmt;

/// Well-known role ids, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinRoleId {
    Public,
    Basic,
    Power,
    Admin,
    Builder,
}

impl BuiltinRoleId {
    pub const ALL: [BuiltinRoleId; 5] = [
        Self::Public,
        Self::Basic,
        Self::Power,
        Self::Admin,
        Self::Builder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Basic => "BASIC",
            Self::Power => "POWER",
            Self::Admin => "ADMIN",
            Self::Builder => "BUILDER",
        }
    }

    /// Parse an external built-in id (case sensitive)
    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.as_str() == id)
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Basic => "Basic",
            Self::Power => "Power",
            Self::Admin => "App admin",
            Self::Builder => "Builder",
        }
    }

    fn permission_id(&self) -> BuiltinPermissionId {
        match self {
            Self::Public => BuiltinPermissionId::Public,
            Self::Basic => BuiltinPermissionId::Write,
            Self::Power => BuiltinPermissionId::Power,
            Self::Admin | Self::Builder => BuiltinPermissionId::Admin,
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            Self::Public => None,
            Self::Basic => Some(Self::Public),
            Self::Power => Some(Self::Basic),
            Self::Admin => Some(Self::Power),
            Self::Builder => Some(Self::Admin),
        }
    }

    /// Catalogue record with internal ids
    pub fn role(&self) -> Role {
        let role = Role::new(db_role_id(self.as_str()), self.display_name())
            .with_permission_id(self.permission_id());
        match self.parent() {
            Some(parent) => role.with_inherits([db_role_id(parent.as_str())]),
            None => role,
        }
    }
}

impl fmt::Display for BuiltinRoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every built-in role record
pub fn builtin_roles() -> Vec<Role> {
    BuiltinRoleId::ALL.iter().map(BuiltinRoleId::role).collect()
}

/// Catalogue record for an id (internal or external), if it is built-in
pub fn builtin_role(role_id: &str) -> Option<Role> {
    let external = role_id.strip_prefix(super::ids::ROLE_PREFIX).unwrap_or(role_id);
    BuiltinRoleId::parse(external).map(|builtin| builtin.role())
}

/// The lower-ranked of two built-in roles; `current` may be unset
pub fn lower_builtin_role(current: Option<BuiltinRoleId>, candidate: BuiltinRoleId) -> BuiltinRoleId {
    match current {
        Some(current) if current < candidate => current,
        _ => candidate,
    }
}

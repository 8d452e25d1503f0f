//! Role document and role snapshot types

use super::builtin::builtin_roles;
use super::ids::{db_role_id, external_role_id};
use crate::error::{AuthzError, Result};
use crate::permissions::BuiltinPermissionId;
use crate::types::{PermissionLevel, ResourceId, RoleId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Id scheme of a role document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleIdVersion {
    /// Id derived from the role name (`role_<name>`)
    Name,
}

/// Role document
///
/// A role inherits every grant of its parents. `permissions` maps resource
/// ids to the levels granted on that resource by this role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id", default)]
    pub id: RoleId,

    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Preset consulted for base permission checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<BuiltinPermissionId>,

    /// Parent roles; stored either as a single id or a list
    #[serde(default, deserialize_with = "deserialize_inherits")]
    pub inherits: Vec<RoleId>,

    #[serde(default, deserialize_with = "deserialize_permissions")]
    pub permissions: BTreeMap<ResourceId, Vec<PermissionLevel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<RoleIdVersion>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

fn deserialize_inherits<'de, D>(deserializer: D) -> std::result::Result<Vec<RoleId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<OneOrMany<RoleId>>::deserialize(deserializer)?;
    Ok(raw
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|id| !id.is_empty())
        .collect())
}

// Older documents store a single level as a bare string.
fn deserialize_permissions<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<ResourceId, Vec<PermissionLevel>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<ResourceId, OneOrMany<PermissionLevel>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(resource, levels)| {
            let mut deduped: Vec<PermissionLevel> = Vec::new();
            for level in levels.into_vec() {
                if !deduped.contains(&level) {
                    deduped.push(level);
                }
            }
            (resource, deduped)
        })
        .collect())
}

impl Role {
    /// Create a role with no grants and no parents
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            name: name.into(),
            permission_id: None,
            inherits: Vec::new(),
            permissions: BTreeMap::new(),
            version: None,
        }
    }

    pub fn with_inherits<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        self.inherits = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permission_id(mut self, permission_id: BuiltinPermissionId) -> Self {
        self.permission_id = Some(permission_id);
        self
    }

    pub fn with_permission(mut self, resource_id: impl Into<ResourceId>, level: PermissionLevel) -> Self {
        self.add_permission(&resource_id.into(), level);
        self
    }

    pub fn with_version(mut self, version: RoleIdVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Id as exposed to callers
    pub fn external_id(&self) -> RoleId {
        external_role_id(&self.id, self.version)
    }

    /// Whether this role explicitly grants `level` on `resource_id`
    pub fn has_permission(&self, resource_id: &str, level: PermissionLevel) -> bool {
        self.permissions
            .get(resource_id)
            .is_some_and(|levels| levels.contains(&level))
    }

    /// Grant a level, returning whether the role changed
    pub fn add_permission(&mut self, resource_id: &str, level: PermissionLevel) -> bool {
        let levels = self.permissions.entry(resource_id.to_string()).or_default();
        if levels.contains(&level) {
            return false;
        }
        levels.push(level);
        true
    }

    /// Revoke a level, returning whether the role changed
    pub fn remove_permission(&mut self, resource_id: &str, level: PermissionLevel) -> bool {
        let Some(levels) = self.permissions.get_mut(resource_id) else {
            return false;
        };
        let before = levels.len();
        levels.retain(|l| *l != level);
        let changed = levels.len() != before;
        if levels.is_empty() {
            self.permissions.remove(resource_id);
        }
        changed
    }

    /// Rewrite the id and parent references to internal ids
    pub fn normalized(mut self) -> Self {
        self.id = db_role_id(&self.id);
        let mut parents: Vec<RoleId> = Vec::with_capacity(self.inherits.len());
        for parent in self.inherits.iter().map(|p| db_role_id(p)) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        self.inherits = parents;
        self
    }

    /// Validate the role definition before persisting
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AuthzError::Validation("Role name cannot be empty".to_string()));
        }

        let own_id = db_role_id(&self.id);
        if self.inherits.iter().any(|parent| db_role_id(parent) == own_id) {
            return Err(AuthzError::Validation(format!(
                "Role '{}' cannot inherit from itself",
                self.name
            )));
        }

        for (resource_id, levels) in &self.permissions {
            if resource_id.is_empty() {
                return Err(AuthzError::Validation(format!(
                    "Role '{}' grants permissions on an empty resource id",
                    self.name
                )));
            }
            for level in levels {
                level.ensure_supported()?;
            }
        }

        Ok(())
    }
}

/// Immutable snapshot of every role in a workspace, keyed by internal id
///
/// Resolution and mutation take a snapshot explicitly instead of reading a
/// shared cache, so callers control exactly which role set is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeMap<RoleId, Role>,
}

impl RoleSet {
    /// Build a snapshot from arbitrary roles; later duplicates replace earlier ones
    pub fn from_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        let mut set = Self::default();
        for role in roles {
            set.insert(role);
        }
        set
    }

    /// Built-in catalogue overlaid with the given roles
    pub fn with_builtins<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        Self::from_roles(builtin_roles().into_iter().chain(roles))
    }

    /// Insert or replace a role
    pub fn insert(&mut self, role: Role) -> Option<Role> {
        let role = role.normalized();
        self.roles.insert(role.id.clone(), role)
    }

    /// Look up a role by internal or external id
    pub fn get(&self, role_id: &str) -> Option<&Role> {
        self.roles.get(&db_role_id(role_id))
    }

    pub fn contains(&self, role_id: &str) -> bool {
        self.get(role_id).is_some()
    }

    pub fn iter(&self) -> btree_map::Values<'_, RoleId, Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn into_roles(self) -> Vec<Role> {
        self.roles.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = btree_map::Values<'a, RoleId, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! Permission resolution over a role snapshot
//!
//! A principal holding a role can use every grant on that role and on all of
//! its ancestors. Resolution walks `inherits` edges breadth-first from the
//! starting role; a visited set keeps diamonds from contributing twice and
//! stops at revisited roles, so even a cyclic graph terminates.
//!
//! Unknown roles resolve to nothing, which callers must treat as no access.

use super::builtin::{base_permissions, builtin_permission, permission_type};
use crate::roles::{Role, RoleSet};
use crate::types::{
    PermissionLevel, PermissionSource, ResourceId, ResourcePermission, RoleId, SUPPORTED_LEVELS,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;

/// resource id -> level -> external role id
pub type PermissionMap = BTreeMap<ResourceId, BTreeMap<PermissionLevel, RoleId>>;

/// Normalized view of explicit grants: (resource, level) -> holders
///
/// Holders are internal role ids in snapshot order. A consistent role set has
/// at most one holder per key.
#[derive(Debug, Clone, Default)]
pub struct GrantIndex {
    grants: BTreeMap<(ResourceId, PermissionLevel), Vec<RoleId>>,
}

impl GrantIndex {
    pub fn build(roles: &RoleSet) -> Self {
        let mut grants: BTreeMap<(ResourceId, PermissionLevel), Vec<RoleId>> = BTreeMap::new();
        for role in roles {
            for (resource_id, levels) in &role.permissions {
                for level in levels {
                    grants
                        .entry((resource_id.clone(), *level))
                        .or_default()
                        .push(role.id.clone());
                }
            }
        }
        Self { grants }
    }

    /// Every role explicitly holding `level` on `resource_id`
    pub fn holders(&self, resource_id: &str, level: PermissionLevel) -> &[RoleId] {
        self.grants
            .get(&(resource_id.to_string(), level))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keys held by more than one role
    pub fn duplicates(&self) -> impl Iterator<Item = (&(ResourceId, PermissionLevel), &Vec<RoleId>)> {
        self.grants.iter().filter(|(_, holders)| holders.len() > 1)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Result of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,

    /// External id of the role that granted access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,

    #[serde(rename = "permissionType", skip_serializing_if = "Option::is_none")]
    pub source: Option<PermissionSource>,

    pub reason: String,
}

impl AccessDecision {
    fn allow(role: RoleId, source: PermissionSource, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            role: Some(role),
            source: Some(source),
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            role: None,
            source: None,
            reason: reason.into(),
        }
    }
}

/// Read-only resolver bound to one role snapshot
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    roles: &'a RoleSet,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(roles: &'a RoleSet) -> Self {
        Self { roles }
    }

    /// The starting role followed by its ancestors, breadth-first
    pub fn role_hierarchy(&self, role_id: &str) -> Vec<&'a Role> {
        let Some(start) = self.roles.get(role_id) else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&'a Role> = VecDeque::new();
        let mut hierarchy = Vec::new();

        visited.insert(start.id.as_str());
        queue.push_back(start);

        while let Some(role) = queue.pop_front() {
            hierarchy.push(role);
            for parent_id in &role.inherits {
                let Some(parent) = self.roles.get(parent_id) else {
                    continue;
                };
                if visited.insert(parent.id.as_str()) {
                    queue.push_back(parent);
                }
            }
        }

        hierarchy
    }

    /// Every grant reachable from a role, attributed to the nearest role
    /// that contributed it
    pub fn resolve_role_permissions(&self, role_id: &str) -> PermissionMap {
        let mut resolved = PermissionMap::new();
        for role in self.role_hierarchy(role_id) {
            for (resource_id, levels) in &role.permissions {
                let entry = resolved.entry(resource_id.clone()).or_default();
                for level in levels {
                    entry.entry(*level).or_insert_with(|| role.external_id());
                }
            }
        }
        resolved
    }

    /// Effective holder of each level on a resource
    ///
    /// Base permissions fill every level the presets cover; explicit grants
    /// found on any role replace them.
    pub fn get_resource_permissions(&self, resource_id: &str) -> BTreeMap<PermissionLevel, ResourcePermission> {
        let mut permissions: BTreeMap<PermissionLevel, ResourcePermission> = base_permissions(resource_id)
            .into_iter()
            .map(|(level, role)| (level, ResourcePermission::base(role.as_str())))
            .collect();

        let index = GrantIndex::build(self.roles);
        for level in SUPPORTED_LEVELS {
            if let Some(holder) = index.holders(resource_id, level).last() {
                if let Some(role) = self.roles.get(holder) {
                    permissions.insert(level, ResourcePermission::explicit(role.external_id()));
                }
            }
        }

        permissions
    }

    /// Explicit grants of every role, keyed by resource
    pub fn get_all_resource_permissions(&self) -> PermissionMap {
        let mut all = PermissionMap::new();
        for role in self.roles {
            for (resource_id, levels) in &role.permissions {
                let entry = all.entry(resource_id.clone()).or_default();
                for level in levels {
                    entry.insert(*level, role.external_id());
                }
            }
        }
        all
    }

    /// Whether a principal holding `role_id` may use `level` on `resource_id`
    ///
    /// When some role explicitly holds the grant, only principals with that
    /// role in their hierarchy pass. Otherwise the built-in presets of the
    /// hierarchy's roles decide.
    pub fn check_access(&self, role_id: &str, resource_id: &str, level: PermissionLevel) -> AccessDecision {
        let hierarchy = self.role_hierarchy(role_id);
        if hierarchy.is_empty() {
            debug!(role_id, resource_id, %level, "Unknown role, denying");
            return AccessDecision::deny(format!("Unknown role '{}'", role_id));
        }

        let index = GrantIndex::build(self.roles);
        let holders = index.holders(resource_id, level);
        if !holders.is_empty() {
            return match hierarchy.iter().find(|role| holders.contains(&role.id)) {
                Some(role) => AccessDecision::allow(
                    role.external_id(),
                    PermissionSource::Explicit,
                    format!("Role '{}' holds {} on '{}'", role.external_id(), level, resource_id),
                ),
                None => {
                    debug!(role_id, resource_id, %level, "Explicit grant held outside hierarchy");
                    AccessDecision::deny(format!(
                        "No role inherited by '{}' holds {} on '{}'",
                        role_id, level, resource_id
                    ))
                }
            };
        }

        let resource_type = permission_type(resource_id);
        let granting = hierarchy.iter().find(|role| {
            role.permission_id
                .is_some_and(|id| builtin_permission(id).allows(resource_type, level))
        });

        match granting {
            Some(role) => AccessDecision::allow(
                role.external_id(),
                PermissionSource::Base,
                format!("Preset of role '{}' allows {}", role.external_id(), level),
            ),
            None => AccessDecision::deny(format!(
                "Role '{}' has no {} permission on '{}'",
                role_id, level, resource_id
            )),
        }
    }
}

//! Permission mutations
//!
//! A (resource, level) grant lives on at most one role. Adding it to a role
//! removes it from whichever role held it before; removing it clears it from
//! every role. Only documents that actually changed are written, in a single
//! bulk write whose results are reported per role.

use crate::error::{AuthzError, Result};
use crate::roles::{builtin_role, db_role_id, external_role_id, BuiltinRoleId, Role, RoleStore};
use crate::types::{
    PermissionGrant, PermissionLevel, PermissionUpdateType, ResourceId, RoleId, RoleUpdateResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Roles to receive the write and read grants of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRoles {
    pub write_role: RoleId,
    pub read_role: RoleId,
}

/// Compute the role documents a mutation changes
///
/// `db_roles` are the persisted roles; a built-in target that was never
/// persisted is synthesized from the catalogue. Returns only roles whose
/// permission maps changed, so an ADD that is already in place yields nothing.
pub fn plan_update(
    db_roles: Vec<Role>,
    grant: &PermissionGrant,
    update: PermissionUpdateType,
) -> Result<Vec<Role>> {
    grant.level.ensure_supported()?;
    if grant.resource_id.is_empty() {
        return Err(AuthzError::Validation("Resource id cannot be empty".to_string()));
    }

    let remove = update == PermissionUpdateType::Remove;
    let target = db_role_id(&grant.role_id);
    let mut roles: Vec<Role> = db_roles.into_iter().map(Role::normalized).collect();

    if !roles.iter().any(|role| role.id == target) {
        match builtin_role(&target) {
            Some(builtin) => roles.push(builtin),
            None if !remove => return Err(AuthzError::RoleNotFound(grant.role_id.clone())),
            None => {}
        }
    }

    let mut changed = Vec::new();
    for mut role in roles {
        let is_target = role.id == target;
        let mut updated = false;

        // stale duplicates are cleared as well
        if (!is_target || remove) && role.remove_permission(&grant.resource_id, grant.level) {
            updated = true;
        }
        if !remove && is_target && role.add_permission(&grant.resource_id, grant.level) {
            updated = true;
        }

        if updated {
            changed.push(role);
        }
    }

    Ok(changed)
}

/// Applies permission mutations through a [`RoleStore`]
#[derive(Clone)]
pub struct PermissionMutator {
    store: RoleStore,
}

impl PermissionMutator {
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RoleStore {
        &self.store
    }

    /// Add or remove a grant while keeping a single holder per grant
    ///
    /// Every changed role is written with its current revision, so a
    /// concurrent update of the same role fails that role's write instead of
    /// being overwritten. Failures are reported per role and never retried.
    pub async fn update_permission_on_role(
        &self,
        grant: &PermissionGrant,
        update: PermissionUpdateType,
    ) -> Result<Vec<RoleUpdateResult>> {
        let db_roles = self.store.get_all_db_roles().await?;
        let changed = plan_update(db_roles, grant, update)?;

        if changed.is_empty() {
            debug!(
                role_id = %grant.role_id,
                resource_id = %grant.resource_id,
                level = %grant.level,
                "Permission already in place"
            );
            return Ok(Vec::new());
        }

        let versions: HashMap<RoleId, _> = changed
            .iter()
            .map(|role| (role.id.clone(), role.version))
            .collect();
        let docs = changed
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let results = self.store.db().bulk_docs(docs).await?;

        let results: Vec<RoleUpdateResult> = results
            .into_iter()
            .map(|resp| {
                let version = versions.get(&resp.id).copied().flatten();
                RoleUpdateResult {
                    id: external_role_id(&resp.id, version),
                    rev: resp.rev,
                    error: resp.error,
                    reason: resp.reason,
                }
            })
            .collect();

        for failed in results.iter().filter(|r| !r.is_ok()) {
            warn!(
                role_id = %failed.id,
                error = failed.error.as_deref().unwrap_or_default(),
                "Role update failed"
            );
        }
        info!(
            role_id = %grant.role_id,
            resource_id = %grant.resource_id,
            level = %grant.level,
            ?update,
            written = results.len(),
            "Updated permission"
        );

        Ok(results)
    }

    /// Grant write to one role and read to another
    ///
    /// The two grants are applied as independent mutations: if the second
    /// fails, the first stays in place.
    pub async fn set_permissions(
        &self,
        resource_id: &str,
        roles: &ResourceRoles,
    ) -> Result<Vec<RoleUpdateResult>> {
        let mut results = self
            .update_permission_on_role(
                &PermissionGrant::new(roles.write_role.clone(), resource_id, PermissionLevel::Write),
                PermissionUpdateType::Add,
            )
            .await?;

        results.extend(
            self.update_permission_on_role(
                &PermissionGrant::new(roles.read_role.clone(), resource_id, PermissionLevel::Read),
                PermissionUpdateType::Add,
            )
            .await?,
        );

        Ok(results)
    }

    /// Restrict a newly created table to app admins
    pub async fn init_table_permissions(&self, table_id: &ResourceId) -> Result<Vec<RoleUpdateResult>> {
        let admin = BuiltinRoleId::Admin.as_str().to_string();
        self.set_permissions(
            table_id,
            &ResourceRoles {
                write_role: admin.clone(),
                read_role: admin,
            },
        )
        .await
    }
}

//! Role persistence on top of a [`DocumentStore`]

use super::builtin::builtin_role;
use super::graph::InheritanceGraph;
use super::ids::{db_role_id, external_role_id, generate_role_id, is_builtin, ROLE_PREFIX};
use super::types::{Role, RoleIdVersion, RoleSet};
use crate::db::DocumentStore;
use crate::error::{AuthzError, Result};
use crate::types::RoleId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Response of a successful role save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRole {
    /// External role id
    #[serde(rename = "_id")]
    pub id: RoleId,

    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Role graph store for one workspace
#[derive(Clone)]
pub struct RoleStore {
    db: Arc<dyn DocumentStore>,
}

impl RoleStore {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    /// Underlying document store
    pub fn db(&self) -> &Arc<dyn DocumentStore> {
        &self.db
    }

    /// Every persisted role document, without synthesized built-ins
    pub async fn get_all_db_roles(&self) -> Result<Vec<Role>> {
        let docs = self.db.all_docs(ROLE_PREFIX).await?;
        let roles = docs
            .into_iter()
            .map(serde_json::from_value::<Role>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count = roles.len(), "Loaded role documents");
        Ok(roles)
    }

    /// Snapshot of all roles, including built-ins that were never persisted
    pub async fn get_all(&self) -> Result<RoleSet> {
        Ok(RoleSet::with_builtins(self.get_all_db_roles().await?))
    }

    /// Get a single role; built-ins are synthesized when not persisted
    pub async fn get(&self, role_id: &str) -> Result<Option<Role>> {
        let id = db_role_id(role_id);
        match self.db.get(&id).await? {
            Some(doc) => Ok(Some(serde_json::from_value::<Role>(doc)?.normalized())),
            None => Ok(builtin_role(&id)),
        }
    }

    /// Create or update a role
    ///
    /// New roles without an id get a name-based id. The candidate is checked
    /// against the full role set, and a save that would close an inheritance
    /// cycle is rejected before anything is written.
    ///
    /// An update that carries no grants keeps the grants already stored on
    /// the role; grants change through the permission mutator.
    pub async fn save(&self, mut role: Role) -> Result<SavedRole> {
        if role.id.is_empty() {
            role.id = generate_role_id(&role.name)?;
            role.version = Some(RoleIdVersion::Name);
        }
        role.validate()?;

        let mut role = role.normalized();
        if let Some(builtin) = builtin_role(&role.id) {
            role.inherits = builtin.inherits;
            role.permission_id = builtin.permission_id;
        }

        let mut snapshot = self.get_all().await?;
        if let Some(existing) = snapshot.get(&role.id) {
            if role.version.is_none() {
                role.version = existing.version;
            }
            if role.permissions.is_empty() && !existing.permissions.is_empty() {
                debug!(role_id = %role.id, "Keeping stored grants on role update");
                role.permissions = existing.permissions.clone();
            }
        }
        if let Some(missing) = role.inherits.iter().find(|parent| !snapshot.contains(parent)) {
            return Err(AuthzError::Validation(format!(
                "Role '{}' inherits from unknown role '{}'",
                role.name,
                external_role_id(missing, None)
            )));
        }

        snapshot.insert(role.clone());
        InheritanceGraph::from_roles(&snapshot).detect_cycle()?;

        let resp = self.db.put(serde_json::to_value(&role)?).await?;
        let id = external_role_id(&resp.id, role.version);
        info!(role_id = %id, rev = %resp.rev, "Saved role");

        Ok(SavedRole { id, rev: resp.rev })
    }

    /// Delete a role at the given revision
    ///
    /// Grants recorded on the role go with it; other roles that inherited
    /// from it keep a dangling parent reference, which resolution ignores.
    pub async fn delete(&self, role_id: &str, rev: &str) -> Result<()> {
        if is_builtin(role_id) {
            return Err(AuthzError::Validation(format!(
                "Built-in role '{}' cannot be deleted",
                role_id
            )));
        }

        let id = db_role_id(role_id);
        self.db.remove(&id, rev).await.map_err(|err| match err {
            AuthzError::NotFound(_) => AuthzError::RoleNotFound(role_id.to_string()),
            other => other,
        })?;

        info!(role_id = %role_id, "Deleted role");
        Ok(())
    }
}

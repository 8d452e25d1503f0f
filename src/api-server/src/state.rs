use anyhow::{Context, Result};
use budibase_authz::{DocumentStore, InMemoryDocumentStore, PermissionMutator, Role, RoleStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Role graph store of the workspace
    pub roles: RoleStore,

    /// Permission mutator over the same store
    pub mutator: PermissionMutator,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        let roles = RoleStore::new(db);
        Self {
            mutator: PermissionMutator::new(roles.clone()),
            roles,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Save every role of a JSON array file, in file order
    ///
    /// Parents must appear before the roles inheriting from them.
    pub async fn seed_roles(&self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read roles file {}", path.display()))?;
        let roles: Vec<Role> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid roles file {}", path.display()))?;

        let count = roles.len();
        for role in roles {
            let name = role.name.clone();
            let saved = self
                .roles
                .save(role)
                .await
                .with_context(|| format!("Failed to save role '{}'", name))?;
            info!(role_id = %saved.id, "Seeded role");
        }

        Ok(count)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_roles() {
        let path = std::env::temp_dir().join(format!("roles-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[
                {"name": "sales", "inherits": "BASIC", "permissions": {"ta_orders": "read"}},
                {"name": "leads", "inherits": ["sales"]}
            ]"#,
        )
        .await
        .unwrap();

        let state = AppState::default();
        assert_eq!(state.seed_roles(&path).await.unwrap(), 2);
        tokio::fs::remove_file(&path).await.unwrap();

        let leads = state.roles.get("leads").await.unwrap().unwrap();
        assert_eq!(leads.inherits, vec!["role_sales".to_string()]);
        let sales = state.roles.get("sales").await.unwrap().unwrap();
        assert!(sales.has_permission("ta_orders", budibase_authz::PermissionLevel::Read));
    }

    #[tokio::test]
    async fn test_seed_roles_missing_file() {
        let state = AppState::default();
        let err = state.seed_roles(Path::new("/nonexistent/roles.json")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read roles file"));
    }
}

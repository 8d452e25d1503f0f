//! # Budibase Authorization Core
//!
//! Role and permission resolution for Budibase workspaces.
//!
//! ## Features
//!
//! - **Role graph** with multiple inheritance and cycle rejection on save
//! - **Built-in roles** (PUBLIC < BASIC < POWER < ADMIN < BUILDER) that exist
//!   without being persisted
//! - **Permission resolution** that walks the full ancestor closure of a role
//! - **Single holder per grant**: granting a (resource, level) to one role
//!   moves it off any other role
//! - **Optimistic concurrency**: every document write is checked against its
//!   revision and bulk writes report failures per role
//!
//! ## Example
//!
//! ```rust
//! use budibase_authz::{
//!     InMemoryDocumentStore, PermissionGrant, PermissionLevel, PermissionMutator,
//!     PermissionResolver, PermissionUpdateType, Role, RoleStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RoleStore::new(Arc::new(InMemoryDocumentStore::new()));
//!     store.save(Role::new("", "sales").with_inherits(["BASIC"])).await?;
//!
//!     let mutator = PermissionMutator::new(store.clone());
//!     mutator
//!         .update_permission_on_role(
//!             &PermissionGrant::new("sales", "ta_orders", PermissionLevel::Read),
//!             PermissionUpdateType::Add,
//!         )
//!         .await?;
//!
//!     let roles = store.get_all().await?;
//!     let decision = PermissionResolver::new(&roles).check_access("sales", "ta_orders", PermissionLevel::Read);
//!     assert!(decision.allowed);
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod permissions;
pub mod roles;
pub mod types;

// Re-export commonly used types
pub use db::{BulkDocResult, DocWriteResponse, DocumentStore, InMemoryDocumentStore};
pub use error::{AuthzError, Result};
pub use permissions::{
    base_permissions, builtin_permission, builtin_permissions, permission_type, AccessDecision,
    BuiltinPermission, BuiltinPermissionId, GrantIndex, PermissionMap, PermissionMutator,
    PermissionResolver, PermissionType, ResourceRoles,
};
pub use roles::{
    builtin_role, builtin_roles, db_role_id, external_role_id, is_builtin, BuiltinRoleId,
    InheritanceGraph, Role, RoleIdVersion, RoleSet, RoleStore, SavedRole,
};
pub use types::{
    PermissionGrant, PermissionLevel, PermissionSource, PermissionUpdateType, ResourceId,
    ResourcePermission, RoleId, RoleUpdateResult, SUPPORTED_LEVELS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

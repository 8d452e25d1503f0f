//! Roles module
//!
//! Role documents, id namespacing, the built-in catalogue, inheritance graph
//! validation and the persisted role store.

pub mod builtin;
pub mod graph;
pub mod ids;
pub mod store;
pub mod types;

pub use builtin::{builtin_role, builtin_roles, BuiltinRoleId};
pub use graph::{GraphError, InheritanceGraph};
pub use ids::{db_role_id, external_role_id, is_builtin};
pub use store::{RoleStore, SavedRole};
pub use types::{Role, RoleIdVersion, RoleSet};

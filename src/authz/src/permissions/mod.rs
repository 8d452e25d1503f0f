//! Permissions module
//!
//! Built-in presets and base permissions, read-side resolution over a role
//! snapshot, and mutations that keep one holder per grant.

pub mod builtin;
pub mod mutator;
pub mod resolver;

pub use builtin::{
    base_permissions, builtin_permission, builtin_permissions, permission_type, BuiltinPermission,
    BuiltinPermissionId, PermissionType, TypedPermission,
};
pub use mutator::{plan_update, PermissionMutator, ResourceRoles};
pub use resolver::{AccessDecision, GrantIndex, PermissionMap, PermissionResolver};

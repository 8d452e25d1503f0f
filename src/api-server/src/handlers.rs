use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use budibase_authz::{
    builtin_permissions, BuiltinPermission, PermissionGrant, PermissionLevel, PermissionMap,
    PermissionResolver, PermissionUpdateType, ResourceRoles, SUPPORTED_LEVELS,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{error::Result, models::*, state::AppState};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Grantable permission levels
#[utoipa::path(
    get,
    path = "/api/permission/levels",
    responses(
        (status = 200, description = "Grantable levels", body = Vec<String>)
    ),
    tag = "permissions"
)]
pub async fn list_levels() -> Json<Vec<String>> {
    let mut levels = SUPPORTED_LEVELS.to_vec();
    levels.sort();
    Json(levels.iter().map(ToString::to_string).collect())
}

/// Built-in permission presets
#[utoipa::path(
    get,
    path = "/api/permission/builtin",
    responses(
        (status = 200, description = "Built-in permission presets")
    ),
    tag = "permissions"
)]
pub async fn list_builtin_permissions() -> Json<Vec<BuiltinPermission>> {
    Json(builtin_permissions())
}

/// Every explicit grant, keyed by resource and level
#[utoipa::path(
    get,
    path = "/api/permission",
    responses(
        (status = 200, description = "resource id -> level -> role id"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "permissions"
)]
pub async fn get_all_permissions(State(state): State<Arc<AppState>>) -> Result<Json<PermissionMap>> {
    let roles = state.roles.get_all().await?;
    Ok(Json(PermissionResolver::new(&roles).get_all_resource_permissions()))
}

/// Effective permissions of one resource
#[utoipa::path(
    get,
    path = "/api/permission/{resource_id}",
    params(
        ("resource_id" = String, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Holder of each level", body = ResourcePermissionsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "permissions"
)]
pub async fn get_resource_permissions(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
) -> Result<Json<ResourcePermissionsResponse>> {
    let roles = state.roles.get_all().await?;
    let permissions = PermissionResolver::new(&roles)
        .get_resource_permissions(&resource_id)
        .into_iter()
        .map(|(level, permission)| (level.to_string(), permission.into()))
        .collect();

    Ok(Json(ResourcePermissionsResponse { permissions }))
}

/// Grant write and read on a resource to two roles
#[utoipa::path(
    put,
    path = "/api/permission/{resource_id}",
    params(
        ("resource_id" = String, Path, description = "Resource ID")
    ),
    request_body = SetPermissionsRequest,
    responses(
        (status = 200, description = "Per-role write results", body = Vec<RoleUpdateResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "permissions"
)]
pub async fn set_permissions(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
    Json(req): Json<SetPermissionsRequest>,
) -> Result<Json<Vec<RoleUpdateResponse>>> {
    req.validate()?;

    let roles = ResourceRoles {
        write_role: req.write_role,
        read_role: req.read_role,
    };
    let results = state.mutator.set_permissions(&resource_id, &roles).await?;

    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Add a grant to a role
#[utoipa::path(
    post,
    path = "/api/permission/{role_id}/{resource_id}/{level}",
    params(
        ("role_id" = String, Path, description = "Role ID"),
        ("resource_id" = String, Path, description = "Resource ID"),
        ("level" = String, Path, description = "read, write or execute")
    ),
    responses(
        (status = 200, description = "Per-role write results", body = Vec<RoleUpdateResponse>),
        (status = 400, description = "Invalid level", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "permissions"
)]
pub async fn add_permission(
    State(state): State<Arc<AppState>>,
    Path((role_id, resource_id, level)): Path<(String, String, String)>,
) -> Result<Json<Vec<RoleUpdateResponse>>> {
    update_permission(&state, role_id, resource_id, &level, PermissionUpdateType::Add).await
}

/// Remove a grant
#[utoipa::path(
    delete,
    path = "/api/permission/{role_id}/{resource_id}/{level}",
    params(
        ("role_id" = String, Path, description = "Role ID"),
        ("resource_id" = String, Path, description = "Resource ID"),
        ("level" = String, Path, description = "read, write or execute")
    ),
    responses(
        (status = 200, description = "Per-role write results", body = Vec<RoleUpdateResponse>),
        (status = 400, description = "Invalid level", body = ErrorResponse)
    ),
    tag = "permissions"
)]
pub async fn remove_permission(
    State(state): State<Arc<AppState>>,
    Path((role_id, resource_id, level)): Path<(String, String, String)>,
) -> Result<Json<Vec<RoleUpdateResponse>>> {
    update_permission(&state, role_id, resource_id, &level, PermissionUpdateType::Remove).await
}

async fn update_permission(
    state: &AppState,
    role_id: String,
    resource_id: String,
    level: &str,
    update: PermissionUpdateType,
) -> Result<Json<Vec<RoleUpdateResponse>>> {
    let level: PermissionLevel = level.parse()?;
    let grant = PermissionGrant::new(role_id, resource_id, level);
    let results = state.mutator.update_permission_on_role(&grant, update).await?;

    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Whether a role may use a level on a resource
#[utoipa::path(
    get,
    path = "/api/access/{role_id}/{resource_id}/{level}",
    params(
        ("role_id" = String, Path, description = "Role ID"),
        ("resource_id" = String, Path, description = "Resource ID"),
        ("level" = String, Path, description = "read, write or execute")
    ),
    responses(
        (status = 200, description = "Access allowed", body = AccessResponse),
        (status = 403, description = "Access denied", body = AccessResponse),
        (status = 400, description = "Invalid level", body = ErrorResponse)
    ),
    tag = "access"
)]
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Path((role_id, resource_id, level)): Path<(String, String, String)>,
) -> Result<(StatusCode, Json<AccessResponse>)> {
    let level: PermissionLevel = level.parse()?;
    level.ensure_supported()?;
    let roles = state.roles.get_all().await?;
    let decision = PermissionResolver::new(&roles).check_access(&role_id, &resource_id, level);

    let status = if decision.allowed {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    Ok((status, Json(decision.into())))
}

/// List all roles, built-ins included
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "All roles", body = Vec<RoleResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "roles"
)]
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RoleResponse>>> {
    let roles = state.roles.get_all().await?;
    Ok(Json(
        roles
            .iter()
            .map(|role| RoleResponse::from_role(role, &roles))
            .collect(),
    ))
}

/// Create or update a role
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = SaveRoleRequest,
    responses(
        (status = 200, description = "Role saved", body = SaveRoleResponse),
        (status = 400, description = "Invalid role or inheritance cycle", body = ErrorResponse),
        (status = 409, description = "Revision conflict", body = ErrorResponse)
    ),
    tag = "roles"
)]
pub async fn save_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRoleRequest>,
) -> Result<Json<SaveRoleResponse>> {
    req.validate()?;

    let saved = state.roles.save(req.into_role()).await?;
    Ok(Json(SaveRoleResponse {
        id: saved.id,
        rev: saved.rev,
    }))
}

/// Delete a role at a revision
#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}/{rev}",
    params(
        ("role_id" = String, Path, description = "Role ID"),
        ("rev" = String, Path, description = "Current revision")
    ),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 400, description = "Built-in roles cannot be deleted", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Revision conflict", body = ErrorResponse)
    ),
    tag = "roles"
)]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path((role_id, rev)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    state.roles.delete(&role_id, &rev).await?;
    info!(role_id = %role_id, "Role deleted via API");

    Ok(Json(serde_json::json!({
        "message": format!("Role {} deleted successfully", role_id)
    })))
}

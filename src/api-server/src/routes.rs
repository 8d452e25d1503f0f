//! Route definitions for the API server
//!
//! - Health endpoint
//! - Permission reads and mutations under /api/permission
//! - Access checks under /api/access
//! - Role management under /api/roles
//! - OpenAPI document at /api-docs/openapi.json

use crate::{handlers, middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Budibase Authorization API",
        version = "0.1.0",
        description = "Role inheritance and per-resource permission management",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::list_levels,
        handlers::list_builtin_permissions,
        handlers::get_all_permissions,
        handlers::get_resource_permissions,
        handlers::set_permissions,
        handlers::add_permission,
        handlers::remove_permission,
        handlers::check_access,
        handlers::list_roles,
        handlers::save_role,
        handlers::delete_role,
    ),
    components(
        schemas(
            crate::models::HealthResponse,
            crate::models::SaveRoleRequest,
            crate::models::SaveRoleResponse,
            crate::models::RoleResponse,
            crate::models::ResourcePermissionResponse,
            crate::models::ResourcePermissionsResponse,
            crate::models::SetPermissionsRequest,
            crate::models::RoleUpdateResponse,
            crate::models::AccessResponse,
            crate::models::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "permissions", description = "Resource permissions and grants"),
        (name = "access", description = "Access checks"),
        (name = "roles", description = "Role management"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the router with every route and middleware layer
pub fn create_router(state: Arc<AppState>) -> Router {
    let permission_routes = Router::new()
        .route("/", get(handlers::get_all_permissions))
        .route("/levels", get(handlers::list_levels))
        .route("/builtin", get(handlers::list_builtin_permissions))
        .route(
            "/:resource_id",
            get(handlers::get_resource_permissions).put(handlers::set_permissions),
        )
        .route(
            "/:role_id/:resource_id/:level",
            post(handlers::add_permission).delete(handlers::remove_permission),
        );

    let role_routes = Router::new()
        .route("/", get(handlers::list_roles).post(handlers::save_role))
        .route("/:role_id/:rev", delete(handlers::delete_role));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/permission", permission_routes)
        .nest("/api/roles", role_routes)
        .route("/api/access/:role_id/:resource_id/:level", get(handlers::check_access))
        .with_state(state)
        // executed bottom to top
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        Arc::new(AppState::default())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(create_test_state());
        let (status, body) = send(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_openapi_json() {
        let app = create_router(create_test_state());
        let (status, body) = send(&app, "GET", "/api-docs/openapi.json", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/roles"].is_object());
    }

    #[tokio::test]
    async fn test_levels_and_builtin() {
        let app = create_router(create_test_state());

        let (status, body) = send(&app, "GET", "/api/permission/levels", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["read", "write", "execute"]));

        let (status, body) = send(&app, "GET", "/api/permission/builtin", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_role_lifecycle_and_access() {
        let app = create_router(create_test_state());

        let (status, body) = send(
            &app,
            "POST",
            "/api/roles",
            Some(json!({"name": "role1", "inherits": ["BASIC"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_id"], "role1");

        send(&app, "POST", "/api/roles", Some(json!({"name": "role2", "inherits": ["BASIC"]}))).await;

        let (status, body) = send(&app, "POST", "/api/permission/role1/ta_table1/read", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["_id"], "role1");
        send(&app, "POST", "/api/permission/role2/ta_table2/read", None).await;

        let (status, _) = send(&app, "GET", "/api/access/role1/ta_table1/read", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", "/api/access/role1/ta_table2/read", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["allowed"], false);

        let (status, body) = send(&app, "GET", "/api/permission/ta_table2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permissions"]["read"]["role"], "role2");
        assert_eq!(body["permissions"]["read"]["permissionType"], "EXPLICIT");
        assert_eq!(body["permissions"]["write"]["permissionType"], "BASE");

        let (_, body) = send(&app, "GET", "/api/permission", None).await;
        assert_eq!(body["ta_table1"]["read"], "role1");

        let (_, roles) = send(&app, "GET", "/api/roles", None).await;
        let role1 = roles
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["_id"] == "role1")
            .unwrap()
            .clone();
        assert_eq!(role1["inherits"], json!(["BASIC"]));

        let uri = format!("/api/roles/role1/{}", role1["_rev"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = create_router(create_test_state());

        let (status, body) = send(&app, "POST", "/api/permission/BASIC/ta_1/admin", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (status, _) = send(&app, "POST", "/api/permission/ghost/ta_1/read", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/api/roles", Some(json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, "POST", "/api/roles", Some(json!({"name": "a"}))).await;
        let (status, _) = send(&app, "POST", "/api/roles", Some(json!({"name": "a"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "DELETE", "/api/roles/ADMIN/1-abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cycle_rejected() {
        let app = create_router(create_test_state());

        let (_, a) = send(&app, "POST", "/api/roles", Some(json!({"name": "a"}))).await;
        send(&app, "POST", "/api/roles", Some(json!({"name": "b", "inherits": ["a"]}))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/roles",
            Some(json!({"_id": "a", "_rev": a["_rev"], "name": "a", "inherits": ["b"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("role_a -> role_b -> role_a"));
    }

    #[tokio::test]
    async fn test_role_edit_keeps_grants() {
        let app = create_router(create_test_state());

        send(&app, "POST", "/api/roles", Some(json!({"name": "sales", "inherits": ["BASIC"]}))).await;
        let (status, _) = send(&app, "POST", "/api/permission/sales/ta_1/write", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, roles) = send(&app, "GET", "/api/roles", None).await;
        let sales = roles
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["_id"] == "sales")
            .unwrap()
            .clone();

        let (status, _) = send(
            &app,
            "POST",
            "/api/roles",
            Some(json!({"_id": "sales", "_rev": sales["_rev"], "name": "sales", "inherits": ["POWER"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/api/permission/ta_1", None).await;
        assert_eq!(body["permissions"]["write"]["role"], "sales");
        assert_eq!(body["permissions"]["write"]["permissionType"], "EXPLICIT");
        let (status, _) = send(&app, "GET", "/api/access/sales/ta_1/write", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reserved_role_names_rejected() {
        let app = create_router(create_test_state());

        let (status, _) = send(&app, "POST", "/api/roles", Some(json!({"name": "ADMIN"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, "POST", "/api/roles", Some(json!({"name": "role_x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_set_permissions() {
        let app = create_router(create_test_state());

        let (status, body) = send(
            &app,
            "PUT",
            "/api/permission/ta_orders",
            Some(json!({"writeRole": "POWER", "readRole": "BASIC"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = send(&app, "GET", "/api/permission/ta_orders", None).await;
        assert_eq!(body["permissions"]["write"]["role"], "POWER");
        assert_eq!(body["permissions"]["read"]["role"], "BASIC");
    }
}

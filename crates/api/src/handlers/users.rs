use crate::handlers::auth::{error_response, request_context, ErrorResponse};
use crate::middleware::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use gymdesk_models::{NewUser, ResetPassword, UpdateUser};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Per-action permission check. The gate already required `users.view`
/// for this prefix; mutations need their own grant. Denials are audited
/// like any other unauthorized access.
async fn require(
    state: &AppState,
    user: &AuthUser,
    permission: &str,
    headers: &HeaderMap,
    path: &str,
) -> Result<(), Response> {
    if user.can(permission) {
        return Ok(());
    }

    let ctx = request_context(headers);
    state
        .auth_service
        .record_unauthorized(user.id, &user.username, path, &ctx)
        .await;

    Err((
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new(
            "forbidden",
            "You don't have permission to perform this action",
        )),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// List staff accounts with totals for paging
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    match state.auth_service.list_users(limit, offset).await {
        Ok((users, total)) => Json(serde_json::json!({
            "users": users,
            "total": total,
            "limit": limit,
            "offset": offset
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Response {
    match state.auth_service.get_user(user_id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    Json(request): Json<NewUser>,
) -> Response {
    if let Err(denied) = require(&state, &actor, "users.create", &headers, "/api/users").await {
        return denied;
    }

    let ctx = request_context(&headers);
    match state
        .auth_service
        .create_user(request, Some(actor.id), &ctx)
        .await
    {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUser>,
) -> Response {
    if let Err(denied) = require(&state, &actor, "users.edit", &headers, "/api/users").await {
        return denied;
    }

    let ctx = request_context(&headers);
    match state
        .auth_service
        .update_user(user_id, request, actor.id, &ctx)
        .await
    {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Deactivate an account. Their sessions die with it; the row stays for
/// the audit trail.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Response {
    if let Err(denied) = require(&state, &actor, "users.delete", &headers, "/api/users").await {
        return denied;
    }

    let ctx = request_context(&headers);
    match state.auth_service.delete_user(user_id, actor.id, &ctx).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "User deactivated"
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Set or generate a new password for a user. The effective password is
/// returned once for the admin to hand over out of band.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(request): Json<ResetPassword>,
) -> Response {
    if let Err(denied) = require(&state, &actor, "users.edit", &headers, "/api/users").await {
        return denied;
    }

    if let Err(e) = request.validate() {
        return error_response(e.into()).into_response();
    }

    let ctx = request_context(&headers);
    match state
        .auth_service
        .reset_password(user_id, request.new_password.as_deref(), actor.id, &ctx)
        .await
    {
        Ok(password) => Json(serde_json::json!({
            "success": true,
            "password": password,
            "message": "Password reset. The user must change it after logging in."
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Clear a lockout before it expires
pub async fn unlock_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Response {
    if let Err(denied) = require(&state, &actor, "users.edit", &headers, "/api/users").await {
        return denied;
    }

    match state.auth_service.unlock_account(user_id, actor.id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "Account unlocked"
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

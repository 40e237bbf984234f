use crate::handlers;
use crate::middleware;
use crate::AppState;
use axum::{
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // First-time setup
        .route("/api/setup/status", get(handlers::setup::setup_status))
        .route("/api/setup", post(handlers::setup::complete_setup))
        // Auth routes
        .route(
            "/api/auth/login",
            post(handlers::auth::login).layer(from_fn_with_state(
                state.cache.clone(),
                middleware::rate_limit_login,
            )),
        )
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/session", get(handlers::auth::validate_session))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        // Staff account management
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/:user_id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/api/users/:user_id/reset-password",
            post(handlers::users::reset_password),
        )
        .route(
            "/api/users/:user_id/unlock",
            post(handlers::users::unlock_user),
        )
        // Security events
        .route("/api/events", get(handlers::events::list_events))
        // Unknown paths still go through the gate, so a covered prefix
        // like /reporting is authorized before it 404s
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), middleware::gate))
        .with_state(state)
}

async fn not_found(uri: Uri) -> Response {
    let path = uri.path();
    if path == "/api" || path.starts_with("/api/") {
        (
            StatusCode::NOT_FOUND,
            Json(handlers::ErrorResponse::new(
                "not_found",
                "Resource not found",
            )),
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not found").into_response()
    }
}

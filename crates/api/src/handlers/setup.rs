use crate::extract::JsonOrForm;
use crate::handlers::auth::{error_response, request_context, with_auth_cookies};
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use gymdesk_auth::SetupRequest;
use std::sync::Arc;

/// Whether the one-time setup flow is still open
pub async fn setup_status(State(state): State<Arc<AppState>>) -> Response {
    match state.auth_service.is_first_time_setup().await {
        Ok(required) => Json(serde_json::json!({ "setup_required": required })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Create the first admin account and log them in. Closed forever once an
/// admin exists.
pub async fn complete_setup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonOrForm(request): JsonOrForm<SetupRequest>,
) -> Response {
    let ctx = request_context(&headers);

    match state.auth_service.bootstrap_admin(request, &ctx).await {
        Ok(auth) => with_auth_cookies(&state, &auth),
        Err(e) => error_response(e).into_response(),
    }
}

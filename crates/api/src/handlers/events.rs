use crate::handlers::auth::error_response;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use gymdesk_models::SecurityEventQuery;
use std::sync::Arc;

/// Recent security events, newest first. The route policy already
/// required `settings.view` to get here.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SecurityEventQuery>,
) -> Response {
    match state.auth_service.security_events(query.clamped()).await {
        Ok(events) => Json(serde_json::json!({ "events": events })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

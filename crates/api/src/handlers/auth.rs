use crate::cookies::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, SESSION_ID_COOKIE};
use crate::extract::JsonOrForm;
use crate::middleware::AuthUser;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use gymdesk_auth::{
    extract_bearer_token, lockout_message, AuthError, LoginRequest, RequestContext,
};
use gymdesk_database::DatabaseError;
use gymdesk_models::ChangePassword;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Map a service error onto the wire. Clients get fixed generic strings
/// per category; the specifics live in the logs. Validation and weak
/// password messages are the exception since the caller must fix input.
pub fn error_response(err: AuthError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code, message) = match &err {
        AuthError::ValidationError(msg) => {
            (StatusCode::BAD_REQUEST, "validation_failed", msg.clone())
        }
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, "weak_password", msg.clone()),
        AuthError::CurrentPasswordIncorrect => (
            StatusCode::BAD_REQUEST,
            "current_password_incorrect",
            "Current password is incorrect".to_string(),
        ),
        // Unknown user, wrong password and inactive accounts are
        // indistinguishable from the outside
        AuthError::InvalidCredentials | AuthError::UserInactive => (
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid username or password".to_string(),
        ),
        AuthError::AccountLocked { locked_until } => (
            StatusCode::LOCKED,
            "account_locked",
            lockout_message(*locked_until, Utc::now()),
        ),
        AuthError::SessionInvalid
        | AuthError::TokenExpired
        | AuthError::InvalidToken(_)
        | AuthError::JwtError(_) => (
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Session is invalid or expired".to_string(),
        ),
        AuthError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
        AuthError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
        AuthError::DatabaseError(DatabaseError::NotFound(msg)) => {
            (StatusCode::NOT_FOUND, "not_found", msg.clone())
        }
        AuthError::AlreadyExists(msg) => (StatusCode::CONFLICT, "already_exists", msg.clone()),
        AuthError::DatabaseError(DatabaseError::DuplicateEntry(msg)) => {
            (StatusCode::CONFLICT, "already_exists", msg.clone())
        }
        _ => {
            tracing::error!("Internal error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse::new(code, &message)))
}

/// Client address and agent for sessions and audit events. Proxy headers
/// win over nothing at all; there is no direct-connection fallback because
/// the service always sits behind one.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .map(|s| s.trim().to_string());

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    RequestContext {
        ip_address,
        user_agent,
    }
}

pub(crate) fn with_auth_cookies(state: &AppState, auth: &gymdesk_auth::AuthResponse) -> Response {
    let mut response = Json(auth).into_response();
    let cookies = cookies::auth_cookies(
        auth,
        state.auth_service.jwt.refresh_ttl_seconds(),
        state.secure_cookies,
    );
    cookies::apply_cookies(response.headers_mut(), &cookies);
    response
}

fn with_cleared_cookies(state: &AppState, response: Response) -> Response {
    let mut response = response;
    let cookies = cookies::clear_auth_cookies(state.secure_cookies);
    cookies::apply_cookies(response.headers_mut(), &cookies);
    response
}

/// Login with username and password, from the login form or an API client
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonOrForm(request): JsonOrForm<LoginRequest>,
) -> Response {
    let ctx = request_context(&headers);

    match state.auth_service.login(request, &ctx).await {
        Ok(auth) => with_auth_cookies(&state, &auth),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Rotate a refresh token into a new session. Cookie clients send nothing;
/// API clients may pass the token in the body.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Response {
    let ctx = request_context(&headers);

    let token = cookies::cookie_value(&headers, REFRESH_TOKEN_COOKIE)
        .map(str::to_string)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token));

    let Some(token) = token else {
        let error = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("unauthorized", "No refresh token provided")),
        );
        return error.into_response();
    };

    match state.auth_service.refresh_session(&token, &ctx).await {
        Ok(auth) => with_auth_cookies(&state, &auth),
        Err(e) => {
            let (status, json) = error_response(e);
            let response = (status, json).into_response();
            // A dead refresh pair means these cookies will never work again
            if status == StatusCode::UNAUTHORIZED {
                with_cleared_cookies(&state, response)
            } else {
                response
            }
        }
    }
}

/// Invalidate the caller's session. Success-shaped no matter what: logout
/// of an already-dead session is not an error worth surfacing.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = request_context(&headers);

    let session_id = cookies::cookie_value(&headers, SESSION_ID_COOKIE)
        .map(str::to_string)
        .or_else(|| bearer_session_id(&state, &headers));

    if let Some(session_id) = session_id {
        if let Err(e) = state.auth_service.logout(&session_id, &ctx).await {
            tracing::error!("Logout failed for session {}: {}", session_id, e);
        }
    }

    let response = Json(serde_json::json!({
        "success": true,
        "message": "Logged out"
    }))
    .into_response();

    with_cleared_cookies(&state, response)
}

/// Session id out of a bearer access token, expired ones included so a
/// stale tab can still log out.
fn bearer_session_id(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let header = headers.get("authorization")?.to_str().ok()?;
    let token = extract_bearer_token(header).ok()?;

    match state.auth_service.jwt.verify_access_token(token) {
        Ok(claims) => Some(claims.session_id),
        Err(_) => state
            .auth_service
            .jwt
            .decode_access_unverified(token)
            .ok()
            .map(|claims| claims.session_id),
    }
}

/// Validity probe: bearer access token or cookie in, user summary out
pub async fn validate_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| extract_bearer_token(h).ok())
        .map(str::to_string)
        .or_else(|| cookies::cookie_value(&headers, ACCESS_TOKEN_COOKIE).map(str::to_string));

    let Some(token) = token else {
        let error = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("unauthorized", "No access token provided")),
        );
        return error.into_response();
    };

    match state.auth_service.validate_access(&token).await {
        Ok((_claims, user)) => Json(serde_json::json!({
            "valid": true,
            "user": user
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Change the caller's own password. All sessions are revoked on success,
/// so the response clears cookies and tells the client to log in again.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(request): Json<ChangePassword>,
) -> Response {
    let ctx = request_context(&headers);

    match state
        .auth_service
        .change_password(user.id, request, &ctx)
        .await
    {
        Ok(_) => {
            let response = Json(serde_json::json!({
                "success": true,
                "message": "Password changed. Please log in again."
            }))
            .into_response();
            with_cleared_cookies(&state, response)
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    match state.auth_service.get_user(user.id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

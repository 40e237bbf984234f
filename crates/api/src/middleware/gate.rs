use crate::cookies::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::handlers::auth::{request_context, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use gymdesk_auth::AuthError;
use gymdesk_models::UserRole;
use std::sync::Arc;
use uuid::Uuid;

/// Identity and permissions attached to every gated request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub session_id: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

// Paths that bypass the gate entirely. The setup paths must stay here or
// the first-time-setup redirect would loop.
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/login",
    "/error",
    "/setup",
    "/api/setup",
    "/api/setup/status",
    "/api/auth/login",
    "/api/auth/refresh",
    "/api/auth/logout",
    "/api/auth/session",
];

fn is_public(path: &str) -> bool {
    path.starts_with("/static/") || PUBLIC_PATHS.contains(&path)
}

fn is_api(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn json_error(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(ErrorResponse::new(error, message))).into_response()
}

/// Response for a caller whose permissions do not cover the route: API
/// paths get a 403, page paths a redirect carrying the unauthorized reason.
fn denied_response(path: &str) -> Response {
    if is_api(path) {
        json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "You don't have permission to access this resource",
        )
    } else {
        Redirect::to("/error?reason=unauthorized").into_response()
    }
}

/// The request gate. Resolves the caller from cookies (with a silent
/// refresh when the access token has lapsed), enforces the route policy,
/// and attaches [`AuthUser`] for the handlers. Identity failures fail
/// closed; permission and audit infrastructure failures fail open.
pub async fn gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public(&path) {
        return next.run(request).await;
    }

    // Until an admin exists every other page is the setup page. A failed
    // check is treated as setup-done so a database blip cannot hijack
    // every route; identity resolution below still fails closed.
    match state.auth_service.is_first_time_setup().await {
        Ok(true) => {
            return if is_api(&path) {
                json_error(
                    StatusCode::FORBIDDEN,
                    "setup_required",
                    "First-time setup has not been completed",
                )
            } else {
                Redirect::to("/setup").into_response()
            };
        }
        Ok(false) => {}
        Err(e) => tracing::error!("First-time-setup check failed: {}", e),
    }

    // Access cookie first: a valid signature resolves identity with no
    // database round trip.
    let mut resolved: Option<(Uuid, String, UserRole, String)> = None;

    if let Some(token) = cookies::cookie_value(request.headers(), ACCESS_TOKEN_COOKIE) {
        if let Ok(claims) = state.auth_service.jwt.verify_access_token(token) {
            if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
                resolved = Some((user_id, claims.username, claims.role, claims.session_id));
            }
        }
    }

    // Silent refresh: redeem the refresh cookie for a new access token
    // without rotating the session. A rejected pair clears the cookies;
    // an infrastructure error leaves them so the client can retry.
    let mut refreshed_access: Option<String> = None;
    let mut clear_cookies = false;

    if resolved.is_none() {
        if let Some(refresh_token) = cookies::cookie_value(request.headers(), REFRESH_TOKEN_COOKIE)
        {
            match state.auth_service.refresh_access_token(refresh_token).await {
                Ok((user, session, access_token)) => {
                    tracing::debug!("Silent refresh for user {}", user.username);
                    resolved = Some((user.id, user.username, user.role, session.id));
                    refreshed_access = Some(access_token);
                }
                Err(
                    e @ (AuthError::DatabaseError(_)
                    | AuthError::CacheError(_)
                    | AuthError::Internal(_)),
                ) => {
                    tracing::error!("Silent refresh hit an infrastructure error: {}", e);
                }
                Err(e) => {
                    tracing::debug!("Silent refresh rejected: {}", e);
                    clear_cookies = true;
                }
            }
        }
    }

    let Some((user_id, username, role, session_id)) = resolved else {
        let response = if is_api(&path) {
            json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required",
            )
        } else {
            let login_url = format!("/login?redirect={}", urlencoding::encode(&path));
            Redirect::to(&login_url).into_response()
        };

        return if clear_cookies {
            let mut response = response;
            cookies::apply_cookies(
                response.headers_mut(),
                &cookies::clear_auth_cookies(state.secure_cookies),
            );
            response
        } else {
            response
        };
    };

    // Route policy. Load failures skip the check instead of blocking the
    // request; covered handlers still have their own denials.
    let mut permissions = Vec::new();

    match state.permission_service.permissions_for_role(role).await {
        Ok(perms) => {
            if !state.route_policy.allows(&path, &perms) {
                let ctx = request_context(request.headers());
                state
                    .auth_service
                    .record_unauthorized(user_id, &username, &path, &ctx)
                    .await;

                return denied_response(&path);
            }
            permissions = perms;
        }
        Err(e) => tracing::error!("Permission load failed for role {}: {}", role, e),
    }

    request.extensions_mut().insert(AuthUser {
        id: user_id,
        username,
        role,
        session_id,
        permissions,
    });

    let mut response = next.run(request).await;

    // The refreshed access token rides out on this same response
    if let Some(token) = refreshed_access {
        let cookie = cookies::build_cookie(
            ACCESS_TOKEN_COOKIE,
            &token,
            state.auth_service.jwt.access_ttl_seconds(),
            state.secure_cookies,
        );
        cookies::apply_cookies(response.headers_mut(), &[cookie]);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;
    use gymdesk_auth::{
        AuthService, JwtService, LoginRequest, RequestContext, SecurityPolicy,
    };
    use gymdesk_authz::{PermissionService, RoutePolicy};
    use gymdesk_cache::{Cache, CacheConfig};
    use gymdesk_database::{Database, DatabaseConfig, SecurityEventRepository};
    use gymdesk_models::{events, NewUser, SecurityEventQuery};

    #[test]
    fn denial_redirects_pages_with_unauthorized_reason() {
        let response = denied_response("/reporting");
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/error?reason=unauthorized"
        );
    }

    #[test]
    fn denial_rejects_api_paths_with_403() {
        let response = denied_response("/api/events");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn reporting_denial_for_trainer_produces_one_audit_event() {
        let db = Database::new(DatabaseConfig::from_env())
            .await
            .expect("Failed to connect to database");
        let cache = Cache::new(CacheConfig::from_env())
            .await
            .expect("Failed to connect to Redis");
        let jwt = JwtService::new(
            "gate-test-access-secret-0123456789",
            "gate-test-refresh-secret-0123456789",
        )
        .unwrap();
        let auth_service = AuthService::new(
            db.clone(),
            cache.clone(),
            jwt,
            SecurityPolicy::default(),
        );
        let permission_service = PermissionService::new(db.pool().clone(), cache);
        permission_service.seed_catalog().await.unwrap();

        let ctx = RequestContext::default();
        let id = Uuid::new_v4().simple().to_string();
        let username = format!("gate{}", &id[..8]);
        let trainer = auth_service
            .create_user(
                NewUser {
                    username: username.clone(),
                    email: format!("{}@example.com", username),
                    password: "Val1d&Secret".to_string(),
                    role: UserRole::Trainer,
                },
                None,
                &ctx,
            )
            .await
            .unwrap();

        // The gate's denial branch: role permissions do not cover the path
        let auth = auth_service
            .login(
                LoginRequest {
                    username: username.clone(),
                    password: "Val1d&Secret".to_string(),
                },
                &ctx,
            )
            .await
            .unwrap();
        let claims = auth_service
            .jwt
            .verify_access_token(&auth.access_token)
            .unwrap();

        let permissions = permission_service
            .permissions_for_role(claims.role)
            .await
            .unwrap();
        assert!(permissions.contains(&"members.view".to_string()));

        let policy = RoutePolicy::standard();
        assert!(!policy.allows("/reporting", &permissions));

        auth_service
            .record_unauthorized(trainer.id, &username, "/reporting", &ctx)
            .await;
        assert!(denied_response("/reporting").status().is_redirection());

        let repository = SecurityEventRepository::new(db.pool().clone());
        let denials = repository
            .query(&SecurityEventQuery {
                user_id: Some(trainer.id),
                event_type: Some(events::UNAUTHORIZED_ACCESS.to_string()),
                limit: Some(10),
                offset: Some(0),
            })
            .await
            .unwrap();

        assert_eq!(denials.len(), 1);
        let event = &denials[0];
        assert_eq!(event.user_id, Some(trainer.id));
        assert!(event
            .description
            .as_deref()
            .unwrap_or("")
            .contains("/reporting"));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/login"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/auth/session"));
        assert!(is_public("/api/setup/status"));
        assert!(is_public("/static/css/main.css"));

        assert!(!is_public("/"));
        assert!(!is_public("/dashboard"));
        assert!(!is_public("/api/users"));
        assert!(!is_public("/api/auth/me"));
        assert!(!is_public("/loginx"));
    }

    #[test]
    fn test_api_paths() {
        assert!(is_api("/api/users"));
        assert!(is_api("/api"));
        assert!(!is_api("/apis"));
        assert!(!is_api("/dashboard"));
    }
}

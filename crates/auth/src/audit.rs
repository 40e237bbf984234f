use crate::error::{AuthError, Result};
use gymdesk_database::SecurityEventRepository;
use gymdesk_models::{events, NewSecurityEvent, SecurityEvent, SecurityEventQuery};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditService {
    repository: SecurityEventRepository,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SecurityEventRepository::new(pool),
        }
    }

    /// Record a security event. Write failures are logged and swallowed so
    /// auditing never blocks the request that produced the event.
    pub async fn record(&self, event: NewSecurityEvent) {
        let event_type = event.event_type.clone();

        if let Err(e) = self.repository.record(&event).await {
            tracing::error!("Failed to record security event '{}': {}", event_type, e);
        }
    }

    /// Query recorded security events
    pub async fn query(&self, query: SecurityEventQuery) -> Result<Vec<SecurityEvent>> {
        self.repository
            .query(&query)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to query security events: {}", e)))
    }

    /// Log a successful login
    pub async fn login_succeeded(
        &self,
        user_id: Uuid,
        username: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) {
        self.record(
            NewSecurityEvent::new(events::LOGIN)
                .user(user_id)
                .ip(ip)
                .user_agent(user_agent)
                .description(format!("User {} logged in", username)),
        )
        .await;
    }

    /// Log a failed login. `user_id` is None when the username did not
    /// resolve to an account.
    pub async fn login_failed(
        &self,
        user_id: Option<Uuid>,
        username: &str,
        reason: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) {
        let mut event = NewSecurityEvent::new(events::LOGIN_FAILED)
            .ip(ip)
            .user_agent(user_agent)
            .description(format!("Login failed for {}: {}", username, reason));

        if let Some(id) = user_id {
            event = event.user(id);
        }

        self.record(event).await;
    }

    /// Log a logout
    pub async fn logout(&self, user_id: Uuid, ip: Option<String>, user_agent: Option<String>) {
        self.record(
            NewSecurityEvent::new(events::LOGOUT)
                .user(user_id)
                .ip(ip)
                .user_agent(user_agent),
        )
        .await;
    }

    /// Log a refresh-token rotation
    pub async fn token_refreshed(&self, user_id: Uuid, ip: Option<String>, user_agent: Option<String>) {
        self.record(
            NewSecurityEvent::new(events::TOKEN_REFRESHED)
                .user(user_id)
                .ip(ip)
                .user_agent(user_agent),
        )
        .await;
    }

    /// Log an automatic lockout
    pub async fn account_locked(&self, user_id: Uuid, locked_until: chrono::DateTime<chrono::Utc>) {
        self.record(
            NewSecurityEvent::new(events::ACCOUNT_LOCKED)
                .user(user_id)
                .description("Account locked after repeated failed login attempts")
                .metadata(serde_json::json!({ "locked_until": locked_until })),
        )
        .await;
    }

    /// Log a denied route or action access
    pub async fn unauthorized_access(
        &self,
        user_id: Uuid,
        username: &str,
        path: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) {
        self.record(
            NewSecurityEvent::new(events::UNAUTHORIZED_ACCESS)
                .user(user_id)
                .ip(ip)
                .user_agent(user_agent)
                .description(format!("User {} denied access to {}", username, path))
                .metadata(serde_json::json!({ "path": path })),
        )
        .await;
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityEvent {
    pub id: Uuid,

    // NULL when the actor could not be resolved (e.g. failed login for an
    // unknown username)
    pub user_id: Option<Uuid>,

    pub event_type: String,

    // Request context
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSecurityEvent {
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewSecurityEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            event_type: event_type.into(),
            ip_address: None,
            user_agent: None,
            description: None,
            metadata: None,
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn user_agent(mut self, ua: Option<String>) -> Self {
        self.user_agent = ua;
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn metadata(mut self, data: serde_json::Value) -> Self {
        self.metadata = Some(data);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEventQuery {
    pub user_id: Option<Uuid>,
    pub event_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for SecurityEventQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            event_type: None,
            limit: Some(100),
            offset: Some(0),
        }
    }
}

pub const EVENT_QUERY_MAX_LIMIT: i64 = 500;

impl SecurityEventQuery {
    /// Bound the paging values so a query-string caller cannot request an
    /// unbounded page or a negative offset.
    pub fn clamped(self) -> Self {
        Self {
            limit: Some(self.limit.unwrap_or(100).clamp(1, EVENT_QUERY_MAX_LIMIT)),
            offset: Some(self.offset.unwrap_or(0).max(0)),
            ..self
        }
    }
}

// Common event type constants
pub mod events {
    // Authentication events
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const TOKEN_REFRESHED: &str = "token_refreshed";

    // Password events
    pub const PASSWORD_CHANGED: &str = "password_changed";
    pub const PASSWORD_RESET: &str = "password_reset";

    // Lockout events
    pub const ACCOUNT_LOCKED: &str = "account_locked";
    pub const ACCOUNT_UNLOCKED: &str = "account_unlocked";

    // Authorization events
    pub const UNAUTHORIZED_ACCESS: &str = "unauthorized_access";

    // User management events
    pub const USER_CREATED: &str = "user_created";
    pub const USER_UPDATED: &str = "user_updated";
    pub const USER_DELETED: &str = "user_deleted";

    // System events
    pub const SETUP_COMPLETED: &str = "setup_completed";
}

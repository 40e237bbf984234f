use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    // Random 64-char hex identifier, not a database-generated value
    pub id: String,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session pair is only usable while it is neither invalidated nor expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.invalidated_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub id: String,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>, invalidated_at: Option<DateTime<Utc>>) -> Session {
        Session {
            id: "a".repeat(64),
            user_id: Uuid::new_v4(),
            refresh_token_hash: "hash".to_string(),
            ip_address: None,
            user_agent: None,
            expires_at,
            invalidated_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn live_session_is_valid() {
        let now = Utc::now();
        assert!(session(now + Duration::days(7), None).is_valid(now));
    }

    #[test]
    fn expired_session_is_invalid() {
        let now = Utc::now();
        assert!(!session(now - Duration::seconds(1), None).is_valid(now));
    }

    #[test]
    fn invalidated_session_is_invalid() {
        let now = Utc::now();
        assert!(!session(now + Duration::days(7), Some(now)).is_valid(now));
    }
}

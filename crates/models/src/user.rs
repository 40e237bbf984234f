use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Trainer,
    Member,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Member
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Trainer => write!(f, "trainer"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    // Never serialized into API responses; handlers return UserProfile instead
    pub password_hash: String,

    pub role: UserRole,
    pub is_active: bool,

    // Account lockout state
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,

    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 30), regex(path = *USERNAME_REGEX))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePassword {
    #[validate(length(min = 1))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Admin-driven password reset. Without a password the service generates a
/// temporary one and returns it in the response.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPassword {
    #[validate(length(min = 8, max = 128))]
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

// Username validation regex
lazy_static::lazy_static! {
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_accepts_valid_input() {
        let req = NewUser {
            username: "front_desk1".to_string(),
            email: "desk@example.com".to_string(),
            password: "Sup3rSecret!".to_string(),
            role: UserRole::Trainer,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn new_user_rejects_bad_username() {
        let req = NewUser {
            username: "front desk".to_string(),
            email: "desk@example.com".to_string(),
            password: "Sup3rSecret!".to_string(),
            role: UserRole::Member,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn new_user_rejects_bad_email() {
        let req = NewUser {
            username: "frontdesk".to_string(),
            email: "not-an-email".to_string(),
            password: "Sup3rSecret!".to_string(),
            role: UserRole::Member,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn role_defaults_to_member() {
        let req: NewUser = serde_json::from_str(
            r#"{"username":"alice","email":"alice@example.com","password":"Sup3rSecret!"}"#,
        )
        .unwrap();
        assert_eq!(req.role, UserRole::Member);
    }

    #[test]
    fn profile_drops_password_hash() {
        let json = serde_json::to_string(&UserProfile {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: UserRole::Admin,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        })
        .unwrap();
        assert!(!json.contains("password"));
    }
}

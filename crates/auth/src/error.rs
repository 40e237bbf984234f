use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is inactive")]
    UserInactive,

    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    // Refresh pair no longer matches a live session. Clients clear cookies
    // and re-login.
    #[error("Session is invalid or expired")]
    SessionInvalid,

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Account locked until {locked_until}")]
    AccountLocked {
        locked_until: chrono::DateTime<chrono::Utc>,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] gymdesk_database::DatabaseError),

    #[error("Cache error: {0}")]
    CacheError(#[from] gymdesk_cache::CacheError),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => {
                AuthError::InvalidToken("Invalid token signature".to_string())
            }
            _ => AuthError::JwtError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(err.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(err.to_string())
    }
}

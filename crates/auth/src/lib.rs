pub mod account_lockout;
pub mod audit;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod password;
pub mod service;

pub use account_lockout::{lockout_message, AccountLockoutService};
pub use audit::AuditService;
pub use credentials::{
    generate_secure_password, sanitize_input, validate_email, validate_password_strength,
    validate_username, EmailCheck, PasswordCheck, UsernameCheck,
};
pub use error::{AuthError, Result};
pub use jwt::{
    extract_bearer_token, generate_session_id, hash_token, AccessClaims, JwtService,
    RefreshClaims, TokenType,
};
pub use password::PasswordHasher;
pub use service::{
    AuthResponse, AuthService, LoginRequest, RequestContext, SecurityPolicy, SetupRequest,
};

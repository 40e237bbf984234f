// Core modules
pub mod audit;
pub mod permission;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use audit::{
    events, NewSecurityEvent, SecurityEvent, SecurityEventQuery,
};
pub use permission::{NewPermission, Permission};
pub use session::{NewSession, Session};
pub use user::{
    ChangePassword, NewUser, ResetPassword, UpdateUser, User, UserProfile, UserRole,
};

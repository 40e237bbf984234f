pub mod auth;
pub mod events;
pub mod health;
pub mod setup;
pub mod users;

// Re-export common types
pub use auth::ErrorResponse;

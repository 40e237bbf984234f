use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthzError>;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Database error: {0}")]
    Database(#[from] gymdesk_database::DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] gymdesk_cache::CacheError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

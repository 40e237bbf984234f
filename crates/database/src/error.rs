use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DatabaseError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound(format!("{} with id {} not found", entity, id))
    }

    pub fn duplicate(entity: &str, field: &str) -> Self {
        Self::DuplicateEntry(format!("{} with this {} already exists", entity, field))
    }

    /// Maps unique-constraint violations to DuplicateEntry, everything else
    /// to the plain sqlx wrapper.
    pub fn map_unique(err: sqlx::Error, entity: &str, field: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::duplicate(entity, field)
            }
            _ => err.into(),
        }
    }
}

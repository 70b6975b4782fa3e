use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A membership referenced a user or group that does not exist.
    #[error("{0}")]
    MissingReference(String),

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Map constraint violations raised by a write to their domain meaning.
///
/// `conflict` describes the unique value that collided.
#[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
pub(crate) fn map_write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict(conflict())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::MissingReference(
                "Membership references a user or group that does not exist".into(),
            )
        }
        _ => DbError::from(e),
    }
}

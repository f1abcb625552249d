use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

/// Errors produced by the storage layer.
///
/// Constraint failures that callers are expected to act on are split out of
/// the generic SQLite variant when the error is converted, so upper layers can
/// match on them instead of inspecting message text.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// UNIQUE or PRIMARY KEY constraint failed.
    #[error("Unique constraint failed: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint failed")]
    ForeignKeyViolation,

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    /// A stored value could not be decoded into its model type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return DbError::UniqueViolation(msg.clone().unwrap_or_default());
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::ForeignKeyViolation,
                    _ => {}
                }
            }
        }
        DbError::Sqlite(err)
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

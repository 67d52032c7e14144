//! Mapping from database errors to store errors.

use domain::StoreError;

// PostgreSQL SQLSTATE codes.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Classifies a sqlx error. Anything not attributable to the caller's input
/// is reported as `Unavailable`.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::Conflict(conflict_message(db.constraint())),
            Some(FOREIGN_KEY_VIOLATION) => {
                StoreError::NotFound(format!("referenced row missing ({})", db.message()))
            }
            Some(CHECK_VIOLATION) => StoreError::Validation(db.message().to_string()),
            _ => unavailable(err),
        },
        _ => unavailable(err),
    }
}

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some(c) if c.contains("username") => "username already taken".to_string(),
        Some(c) if c.contains("email") => "email already registered".to_string(),
        Some(c) => format!("duplicate value violates {}", c),
        None => "duplicate value".to_string(),
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Database operation failed");
    StoreError::Unavailable(err.to_string())
}

/// Error for a row whose enum column holds an unknown value.
pub fn corrupt_row(table: &str, detail: String) -> StoreError {
    tracing::error!(table = %table, detail = %detail, "Unreadable row");
    StoreError::Unavailable(format!("corrupt {} row: {}", table, detail))
}

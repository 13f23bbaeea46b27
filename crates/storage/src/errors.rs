use sea_orm::{DbErr, SqlErr};

pub use tron_deposit_domain::storage::StorageError;

/// Keeps unique-constraint violations distinguishable so callers can treat a
/// lost insert race as a duplicate rather than a failure.
pub(crate) fn map_db_err(err: DbErr) -> StorageError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StorageError::Conflict(detail),
        _ => StorageError::from_source(err),
    }
}

//! The SQLite backend: the same store contract over an indexed database.

use std::path::Path;

use rusqlite::{Connection, Row};

use crate::Error;

mod transaction;
mod user;

pub use transaction::SqliteTransactionStore;
pub use user::SqliteUserStore;

/// A trait for adding a model's schema to the database.
pub trait CreateTable {
    /// Create the model's table and indexes. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error>;
}

/// A trait for mapping a [rusqlite::Row] to a concrete record type.
pub(crate) trait MapRow {
    /// The record type rows map to.
    type ReturnType;

    /// Map a row whose columns start at index 0.
    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        Self::map_row_with_offset(row, 0)
    }

    /// Map a row whose columns start at `offset`.
    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error>;
}

/// Wrap a column conversion failure, e.g. an unparsable UUID or kind name.
pub(crate) fn column_error(
    index: usize,
    error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, error.into())
}

/// Create the tables for every record kind. Idempotent.
///
/// # Errors
///
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    SqliteUserStore::create_table(connection)?;
    SqliteTransactionStore::create_table(connection)?;

    Ok(())
}

/// Open the database at `db_path` with a bounded busy timeout so operations
/// fail fast instead of hanging the caller.
///
/// Opening is by-value and leaves nothing half-initialized on failure, so it
/// is safe to retry.
///
/// # Errors
///
/// Returns an [Error::StorageUnavailable] if the database cannot be opened.
pub fn open(db_path: &Path, busy_timeout: std::time::Duration) -> Result<Connection, Error> {
    let connection = Connection::open(db_path)?;
    connection.busy_timeout(busy_timeout)?;
    connection.pragma_update(None, "foreign_keys", "ON")?;

    Ok(connection)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();
    }

    #[test]
    fn open_is_safe_to_retry() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");
        let timeout = std::time::Duration::from_secs(1);

        let first = super::open(&db_path, timeout).unwrap();
        drop(first);
        let second = super::open(&db_path, timeout).unwrap();

        initialize(&second).unwrap();
    }
}

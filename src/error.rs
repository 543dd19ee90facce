//! Defines the crate-level error type shared by the stores, the aggregation
//! engine, and the token service.

/// The errors that may occur in the persistence and aggregation core.
///
/// The HTTP layer sitting above this crate is expected to map these onto
/// status codes; the intended mapping is noted on each variant.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The input was malformed or out of range and was rejected before
    /// persistence (400).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The identifier does not resolve to a live record (404).
    #[error("the requested record could not be found")]
    NotFound,

    /// A uniqueness constraint was violated, e.g. a duplicate email (409).
    ///
    /// Carries the name of the offending field.
    #[error("a record with the same {0} already exists")]
    Conflict(&'static str),

    /// The caller is not allowed to perform the operation (401).
    #[error("unauthorized")]
    Unauthorized,

    /// The token does not have the expected three-segment shape, or a
    /// segment could not be decoded (401).
    #[error("the token is malformed")]
    TokenInvalidFormat,

    /// The token signature does not match the token contents (401).
    #[error("the token signature is invalid")]
    TokenInvalidSignature,

    /// The token is past its expiry time (401).
    #[error("the token has expired")]
    TokenExpired,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server,
    /// never shown to a client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The storage backend is unreachable or an I/O operation failed (500).
    #[error("the storage backend is unavailable: {0}")]
    StorageUnavailable(String),

    /// An invariant the crate maintains was broken, indicating a bug rather
    /// than bad input (500).
    #[error("an internal error occurred: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::Conflict("email")
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 2067 =>
            {
                Error::Conflict("unique field")
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::StorageUnavailable(error.to_string())
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::StorageUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::StorageUnavailable(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn maps_no_rows_to_not_found() {
        let got: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(got, Error::NotFound);
    }

    #[test]
    fn maps_io_error_to_storage_unavailable() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

        let got: Error = io_error.into();

        assert!(matches!(got, Error::StorageUnavailable(_)));
    }
}

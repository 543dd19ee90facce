//! The configuration surface consumed by the core.

use std::path::PathBuf;

use time::Duration;

use crate::pagination::PaginationConfig;

/// The default lifetime of issued session tokens.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::days(7);

/// Selects which storage backend services the process.
///
/// The choice is made once at startup and held for the lifetime of the
/// process; the two backends never share mutable state.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    /// One human-readable JSON container file per collection under
    /// `data_dir`.
    File {
        /// Directory holding the container files. Created on first write.
        data_dir: PathBuf,
    },
    /// A SQLite database with native indexing.
    Sqlite {
        /// File path of the database.
        db_path: PathBuf,
    },
}

/// Bounds applied to transaction input before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLimits {
    /// The largest amount a single transaction may carry.
    pub max_amount: f64,
    /// The longest allowed description, in characters.
    pub max_description_length: usize,
    /// The longest allowed category name, in characters.
    pub max_category_length: usize,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            max_amount: 1_000_000_000.0,
            max_description_length: 500,
            max_category_length: 50,
        }
    }
}

/// The recognized configuration options of the core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which backend services the process.
    pub backend: StorageBackend,
    /// The server-held secret used to sign session tokens.
    pub token_secret: String,
    /// How long issued tokens remain valid.
    pub token_lifetime: Duration,
    /// Page-size defaults and bounds for queries.
    pub pagination: PaginationConfig,
    /// Bounds applied to transaction input.
    pub limits: TransactionLimits,
    /// How long a database operation may wait on a busy connection before
    /// failing instead of hanging the caller.
    pub busy_timeout: std::time::Duration,
}

impl Config {
    /// Create a configuration with default limits for the given backend and
    /// token secret.
    pub fn new(backend: StorageBackend, token_secret: impl Into<String>) -> Self {
        Self {
            backend,
            token_secret: token_secret.into(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            pagination: PaginationConfig::default(),
            limits: TransactionLimits::default(),
            busy_timeout: std::time::Duration::from_secs(5),
        }
    }
}

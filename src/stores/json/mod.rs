//! The flat-file backend: one human-readable JSON container file per
//! collection, with atomic writes and per-collection write serialization.

mod collection;
mod transaction;
mod user;

pub(crate) use collection::JsonCollection;
pub use transaction::JsonTransactionStore;
pub use user::JsonUserStore;

/// The container file name for the users collection.
pub const USERS_FILE: &str = "users.json";
/// The container file name for the transactions collection.
pub const TRANSACTIONS_FILE: &str = "transactions.json";

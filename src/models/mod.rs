//! Defines the record types stored by the application: users and their
//! income/expense transactions.

mod password;
mod transaction;
mod user;

pub use password::PasswordHash;
pub use transaction::{
    NewTransaction, Transaction, TransactionId, TransactionKind, TransactionUpdate,
};
pub use user::{Email, Preferences, PreferencesUpdate, User, UserId, UserUpdate};

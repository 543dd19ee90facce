//! The core of a personal-finance record keeper.
//!
//! The crate keeps user and transaction records behind storage-agnostic
//! traits with two interchangeable backends, a flat-file JSON store and a
//! SQLite store, and layers querying, aggregation, and signed session tokens
//! on top. [service::LedgerService] is the intended entry point; the lower
//! modules are exposed for callers that need finer control.
#![warn(missing_docs)]

pub mod aggregation;
pub mod auth;
pub mod config;
mod error;
pub mod models;
pub mod pagination;
pub mod service;
pub mod stores;

pub use error::Error;

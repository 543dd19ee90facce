//! A one-way hash of a user's password. The raw secret is never stored.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A bcrypt hash of a user's password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash `password` with the default bcrypt cost.
    ///
    /// # Errors
    ///
    /// Returns an [Error::HashingError] if the underlying hashing library
    /// fails. The error string should only be logged on the server.
    pub fn new(password: &str) -> Result<Self, Error> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap an existing hash string without re-hashing.
    ///
    /// Intended for loading hashes from storage and for tests; do not pass
    /// raw passwords to this function.
    pub fn new_unchecked(hash: &str) -> Self {
        Self(hash.to_owned())
    }

    /// Check whether `password` matches this hash.
    ///
    /// # Errors
    ///
    /// Returns an [Error::HashingError] if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str) -> Result<bool, Error> {
        bcrypt::verify(password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }

    /// The hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

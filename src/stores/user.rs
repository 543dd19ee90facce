//! Defines the user store trait implemented by each backend.

use crate::{
    models::{Email, PasswordHash, User, UserId, UserUpdate},
    Error,
};

/// Handles the creation, retrieval, and mutation of [User] records.
pub trait UserStore {
    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Conflict] if another active user already owns the
    /// email; the create fails atomically and no record is written.
    fn create(&mut self, email: Email, password_hash: PasswordHash) -> Result<User, Error>;

    /// Get an active user by their id.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to an active
    /// user.
    fn get(&self, id: UserId) -> Result<User, Error>;

    /// Get an active user by their email.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no active user owns the email.
    fn get_by_email(&self, email: &Email) -> Result<User, Error>;

    /// Merge `update` over the user's record and refresh its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to an active
    /// user, or [Error::Conflict] if an email change collides with another
    /// user.
    fn update(&mut self, id: UserId, update: UserUpdate) -> Result<User, Error>;

    /// Remove the user, making the id invalid for subsequent lookups.
    ///
    /// The file backend deletes the record physically; the SQLite backend
    /// marks it inactive instead. Either way lookups fail afterwards.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to an active
    /// user.
    fn delete(&mut self, id: UserId) -> Result<(), Error>;
}

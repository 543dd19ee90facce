//! The SQLite implementation of the user store.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, Row};

use crate::{
    models::{Email, PasswordHash, Preferences, User, UserId, UserUpdate},
    stores::{
        sqlite::{column_error, CreateTable, MapRow},
        UserStore,
    },
    Error,
};

const USER_COLUMNS: &str =
    "id, email, password, currency, theme, notifications, language, is_active, \
     created_at, updated_at";

/// Stores users in a SQLite database.
///
/// Deleting a user marks the row inactive rather than removing it; inactive
/// users no longer resolve by id or email.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn fetch(connection: &Connection, id: UserId) -> Result<User, Error> {
        connection
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM user WHERE id = :id AND is_active = 1"
            ))?
            .query_row(&[(":id", &id.to_string())], Self::map_row)
            .map_err(|error| error.into())
    }
}

impl UserStore for SqliteUserStore {
    /// Create and insert a new user.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Conflict] if the email's UNIQUE index is violated,
    /// or [Error::StorageUnavailable] for other SQL errors.
    fn create(&mut self, email: Email, password_hash: PasswordHash) -> Result<User, Error> {
        let user = User::new(email, password_hash);
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT INTO user (id, email, password, currency, theme, notifications, language, \
             is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.password_hash.as_str(),
                user.preferences.currency,
                user.preferences.theme,
                user.preferences.notifications,
                user.preferences.language,
                user.is_active,
                user.created_at,
                user.updated_at,
            ],
        )?;

        Ok(user)
    }

    /// Get the active user with the given `id`.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no active user has the id.
    fn get(&self, id: UserId) -> Result<User, Error> {
        Self::fetch(&self.connection.lock().unwrap(), id)
    }

    /// Get the active user that owns `email`.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no active user owns the email.
    fn get_by_email(&self, email: &Email) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM user WHERE email = :email AND is_active = 1"
            ))?
            .query_row(&[(":email", &email.as_str())], Self::map_row)
            .map_err(|error| error.into())
    }

    /// Merge `update` over the user's row.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no active user has the id, or
    /// [Error::Conflict] if an email change violates the UNIQUE index.
    fn update(&mut self, id: UserId, update: UserUpdate) -> Result<User, Error> {
        // The lock is held across the read and the write so concurrent
        // partial updates to the same user cannot overwrite each other.
        let connection = self.connection.lock().unwrap();

        let mut user = Self::fetch(&connection, id)?;
        user.apply(update);

        let rows = connection.execute(
            "UPDATE user SET email = ?1, password = ?2, currency = ?3, theme = ?4, \
             notifications = ?5, language = ?6, is_active = ?7, updated_at = ?8 \
             WHERE id = ?9",
            params![
                user.email.as_str(),
                user.password_hash.as_str(),
                user.preferences.currency,
                user.preferences.theme,
                user.preferences.notifications,
                user.preferences.language,
                user.is_active,
                user.updated_at,
                user.id.to_string(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        Ok(user)
    }

    /// Deactivate the user, making the id invalid for subsequent lookups.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no active user has the id.
    fn delete(&mut self, id: UserId) -> Result<(), Error> {
        let rows = self.connection.lock().unwrap().execute(
            "UPDATE user SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![time::OffsetDateTime::now_utc(), id.to_string()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}

impl CreateTable for SqliteUserStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL,
                    password TEXT NOT NULL,
                    currency TEXT NOT NULL,
                    theme TEXT NOT NULL,
                    notifications INTEGER NOT NULL,
                    language TEXT NOT NULL,
                    is_active INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                    )",
            (),
        )?;

        // Only active users hold their email, so a deactivated user's email
        // becomes reusable, matching the file backend.
        connection.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_user_active_email \
             ON user (email) WHERE is_active = 1",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SqliteUserStore {
    type ReturnType = User;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let raw_id: String = row.get(offset)?;
        let raw_email: String = row.get(offset + 1)?;
        let raw_password: String = row.get(offset + 2)?;

        let id = UserId::parse(&raw_id).map_err(|error| column_error(offset, error))?;

        Ok(User {
            id,
            email: Email::new(&raw_email).map_err(|error| column_error(offset + 1, error))?,
            password_hash: PasswordHash::new_unchecked(&raw_password),
            preferences: Preferences {
                currency: row.get(offset + 3)?,
                theme: row.get(offset + 4)?,
                notifications: row.get(offset + 5)?,
                language: row.get(offset + 6)?,
            },
            is_active: row.get(offset + 7)?,
            created_at: row.get(offset + 8)?,
            updated_at: row.get(offset + 9)?,
        })
    }
}

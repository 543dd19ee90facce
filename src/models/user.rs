//! Defines the user record and its preferences sub-record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{models::PasswordHash, Error};

/// The unique identifier of a [User]. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `text` is not a valid UUID.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Uuid::parse_str(text)
            .map(Self)
            .map_err(|_| Error::Validation(format!("invalid user id {text:?}")))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, lower-cased email address.
///
/// Uniqueness is enforced case-insensitively by lower-casing on construction,
/// so two addresses differing only in case compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Validate and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `text` does not have a non-empty
    /// local part and a domain containing a dot.
    pub fn new(text: &str) -> Result<Self, Error> {
        let normalized = text.trim().to_lowercase();

        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };

        if valid {
            Ok(Self(normalized))
        } else {
            Err(Error::Validation(format!("invalid email address {text:?}")))
        }
    }

    /// The normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's display and notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// ISO 4217 currency code used for display.
    pub currency: String,
    /// UI theme name.
    pub theme: String,
    /// Whether the user wants notifications.
    pub notifications: bool,
    /// BCP 47 language tag.
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "USD".to_owned(),
            theme: "light".to_owned(),
            notifications: true,
            language: "en".to_owned(),
        }
    }
}

/// A partial update of [Preferences]; unspecified fields are preserved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreferencesUpdate {
    /// New currency code, if any.
    pub currency: Option<String>,
    /// New theme, if any.
    pub theme: Option<String>,
    /// New notification flag, if any.
    pub notifications: Option<bool>,
    /// New language tag, if any.
    pub language: Option<String>,
}

impl Preferences {
    /// Merge `update` over these preferences, keeping unspecified fields.
    pub fn merge(&mut self, update: PreferencesUpdate) {
        if let Some(currency) = update.currency {
            self.currency = currency;
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(notifications) = update.notifications {
            self.notifications = notifications;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The unique identifier of the user.
    pub id: UserId,
    /// The user's unique, lower-cased email address.
    pub email: Email,
    /// The one-way hash of the user's password.
    pub password_hash: PasswordHash,
    /// Display and notification preferences.
    #[serde(default)]
    pub preferences: Preferences,
    /// Whether the user is active. Inactive users do not resolve by id or
    /// email.
    pub is_active: bool,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last modified. Always at or after `created_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Create a new active user record with fresh timestamps.
    pub fn new(email: Email, password_hash: PasswordHash) -> Self {
        let now = OffsetDateTime::now_utc();

        Self {
            id: UserId::new(),
            email,
            password_hash,
            preferences: Preferences::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update of a [User]; unspecified fields are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    /// New email address, if any. Must already be validated.
    pub email: Option<Email>,
    /// New password hash, if any.
    pub password_hash: Option<PasswordHash>,
    /// Preference fields to change, if any.
    pub preferences: Option<PreferencesUpdate>,
    /// New active flag, if any.
    pub is_active: Option<bool>,
}

impl User {
    /// Merge `update` over this record and refresh `updated_at`.
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(password_hash) = update.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(preferences) = update.preferences {
            self.preferences.merge(preferences);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use crate::{models::PasswordHash, Error};

    use super::{Email, PreferencesUpdate, User, UserUpdate};

    #[test]
    fn email_is_lower_cased() {
        let email = Email::new("Hello@World.COM").unwrap();

        assert_eq!(email.as_str(), "hello@world.com");
    }

    #[test]
    fn email_rejects_missing_domain() {
        for text in ["", "foo", "foo@", "@bar.com", "foo@bar"] {
            let got = Email::new(text);

            assert!(
                matches!(got, Err(Error::Validation(_))),
                "expected {text:?} to be rejected, got {got:?}"
            );
        }
    }

    #[test]
    fn new_user_has_equal_timestamps_and_default_preferences() {
        let user = User::new(
            Email::new("foo@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter2"),
        );

        assert_eq!(user.created_at, user.updated_at);
        assert!(user.is_active);
        assert_eq!(user.preferences.currency, "USD");
    }

    #[test]
    fn apply_preserves_unspecified_fields() {
        let mut user = User::new(
            Email::new("foo@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter2"),
        );
        let created_at = user.created_at;

        user.apply(UserUpdate {
            preferences: Some(PreferencesUpdate {
                theme: Some("dark".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(user.email.as_str(), "foo@bar.baz");
        assert_eq!(user.preferences.theme, "dark");
        assert_eq!(user.preferences.currency, "USD");
        assert_eq!(user.created_at, created_at);
        assert!(user.updated_at >= user.created_at);
    }
}

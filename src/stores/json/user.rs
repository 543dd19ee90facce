//! The flat-file implementation of the user store.

use std::{path::Path, sync::Arc};

use crate::{
    models::{Email, PasswordHash, User, UserId, UserUpdate},
    stores::{json::JsonCollection, UserStore},
    Error,
};

use super::USERS_FILE;

/// Stores users in a single JSON container file.
#[derive(Debug, Clone)]
pub struct JsonUserStore {
    users: Arc<JsonCollection<User>>,
}

impl JsonUserStore {
    /// Create a store over `data_dir/users.json`. The directory and file
    /// are created on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            users: Arc::new(JsonCollection::new(data_dir.join(USERS_FILE))),
        }
    }
}

impl UserStore for JsonUserStore {
    fn create(&mut self, email: Email, password_hash: PasswordHash) -> Result<User, Error> {
        self.users.mutate(|records| {
            // Uniqueness is checked inside the locked cycle so the create
            // fails atomically without touching the container.
            if records.iter().any(|u| u.is_active && u.email == email) {
                return Err(Error::Conflict("email"));
            }

            let user = User::new(email, password_hash);
            records.push(user.clone());

            Ok(user)
        })
    }

    fn get(&self, id: UserId) -> Result<User, Error> {
        self.users
            .read()?
            .into_iter()
            .find(|u| u.id == id && u.is_active)
            .ok_or(Error::NotFound)
    }

    fn get_by_email(&self, email: &Email) -> Result<User, Error> {
        self.users
            .read()?
            .into_iter()
            .find(|u| u.is_active && &u.email == email)
            .ok_or(Error::NotFound)
    }

    fn update(&mut self, id: UserId, update: UserUpdate) -> Result<User, Error> {
        self.users.mutate(|records| {
            if let Some(email) = &update.email {
                if records
                    .iter()
                    .any(|u| u.id != id && u.is_active && &u.email == email)
                {
                    return Err(Error::Conflict("email"));
                }
            }

            let user = records
                .iter_mut()
                .find(|u| u.id == id && u.is_active)
                .ok_or(Error::NotFound)?;

            user.apply(update);

            Ok(user.clone())
        })
    }

    fn delete(&mut self, id: UserId) -> Result<(), Error> {
        self.users.mutate(|records| {
            let index = records
                .iter()
                .position(|u| u.id == id && u.is_active)
                .ok_or(Error::NotFound)?;

            records.remove(index);

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        models::{Email, PasswordHash, PreferencesUpdate, UserId, UserUpdate},
        stores::UserStore,
        Error,
    };

    use super::JsonUserStore;

    fn get_store(dir: &std::path::Path) -> JsonUserStore {
        JsonUserStore::new(dir)
    }

    fn email(text: &str) -> Email {
        Email::new(text).unwrap()
    }

    #[test]
    fn create_then_get_returns_the_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = get_store(dir.path());

        let created = store
            .create(email("foo@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();
        let got = store.get(created.id).unwrap();

        assert_eq!(got, created);
    }

    #[test]
    fn create_fails_on_duplicate_email_with_different_casing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = get_store(dir.path());
        store
            .create(email("foo@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();

        let got = store.create(email("FOO@BAR.BAZ"), PasswordHash::new_unchecked("hunter3"));

        assert_eq!(got, Err(Error::Conflict("email")));
        // Exactly one user with the email exists afterwards.
        assert!(store.get_by_email(&email("foo@bar.baz")).is_ok());
    }

    #[test]
    fn get_fails_with_non_existent_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = get_store(dir.path());

        assert_eq!(store.get(UserId::new()), Err(Error::NotFound));
    }

    #[test]
    fn update_merges_preferences_and_bumps_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = get_store(dir.path());
        let created = store
            .create(email("foo@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();

        let updated = store
            .update(
                created.id,
                UserUpdate {
                    preferences: Some(PreferencesUpdate {
                        currency: Some("NZD".to_owned()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.preferences.currency, "NZD");
        assert_eq!(updated.preferences.theme, created.preferences.theme);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get(created.id).unwrap(), updated);
    }

    #[test]
    fn update_to_taken_email_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = get_store(dir.path());
        store
            .create(email("first@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();
        let second = store
            .create(email("second@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();

        let got = store.update(
            second.id,
            UserUpdate {
                email: Some(email("first@bar.baz")),
                ..Default::default()
            },
        );

        assert_eq!(got, Err(Error::Conflict("email")));
    }

    #[test]
    fn delete_removes_the_record_physically() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = get_store(dir.path());
        let created = store
            .create(email("foo@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .unwrap();

        store.delete(created.id).unwrap();

        assert_eq!(store.get(created.id), Err(Error::NotFound));
        assert_eq!(store.delete(created.id), Err(Error::NotFound));
        // The email is free for reuse after a physical delete.
        assert!(store
            .create(email("foo@bar.baz"), PasswordHash::new_unchecked("hunter2"))
            .is_ok());
    }
}

//! Defines the backend-agnostic store traits and their two implementations:
//! a flat-file JSON backend and a SQLite backend.
//!
//! Both backends satisfy the same contract: given identical operation
//! sequences they produce identical logical query results, differing only in
//! storage format.

pub mod json;
pub mod sqlite;
mod transaction;
mod user;

pub use transaction::{CategoryTotal, TransactionFilter, TransactionStore};
pub use user::UserStore;

#[cfg(test)]
mod equivalence_tests {
    //! Runs the same operation sequence against both backends and checks
    //! that the logical results match.

    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        models::{Email, NewTransaction, PasswordHash, TransactionKind, UserId},
        pagination::{PageQuery, SortOrder},
        stores::{
            json::{JsonTransactionStore, JsonUserStore},
            sqlite::{initialize, SqliteTransactionStore, SqliteUserStore},
            TransactionFilter, TransactionStore, UserStore,
        },
    };

    fn json_stores(dir: &std::path::Path) -> (JsonUserStore, JsonTransactionStore) {
        (
            JsonUserStore::new(dir),
            JsonTransactionStore::new(dir),
        )
    }

    fn sqlite_stores() -> (SqliteUserStore, SqliteTransactionStore) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));

        (
            SqliteUserStore::new(connection.clone()),
            SqliteTransactionStore::new(connection),
        )
    }

    fn run_sequence<U: UserStore, T: TransactionStore>(
        users: &mut U,
        transactions: &mut T,
    ) -> (Vec<(String, f64)>, u64, u64) {
        let user = users
            .create(
                Email::new("casing@example.com").unwrap(),
                PasswordHash::new_unchecked("hunter2"),
            )
            .unwrap();

        let inputs = [
            (TransactionKind::Income, 100.0, "Salary", date!(2024 - 03 - 01)),
            (TransactionKind::Expense, 30.0, "Groceries", date!(2024 - 03 - 05)),
            (TransactionKind::Expense, 20.0, "Transport", date!(2024 - 03 - 07)),
        ];
        let mut created = Vec::new();
        for (kind, amount, category, date) in inputs {
            let record = transactions
                .create(NewTransaction {
                    user_id: user.id,
                    kind,
                    category: category.to_owned(),
                    amount,
                    description: String::new(),
                    date,
                    tags: vec!["march".to_owned()],
                    payment_method: None,
                    recurring: false,
                })
                .unwrap();
            created.push(record);
        }

        transactions.delete(created[2].id).unwrap();

        let page = transactions
            .find(
                &TransactionFilter {
                    user_id: Some(user.id),
                    ..Default::default()
                },
                &PageQuery {
                    page: 1,
                    per_page: 10,
                    sort: SortOrder::Descending,
                },
            )
            .unwrap();

        let rows = page
            .data
            .iter()
            .map(|t| (t.category.clone(), t.amount))
            .collect();

        (rows, page.total, page.pages)
    }

    #[test]
    fn both_backends_yield_identical_logical_results() {
        let dir = tempfile::tempdir().unwrap();
        let (mut json_users, mut json_transactions) = json_stores(dir.path());
        let (mut sqlite_users, mut sqlite_transactions) = sqlite_stores();

        let file_result = run_sequence(&mut json_users, &mut json_transactions);
        let sqlite_result = run_sequence(&mut sqlite_users, &mut sqlite_transactions);

        assert_eq!(file_result, sqlite_result);
        assert_eq!(
            file_result,
            (
                vec![
                    ("Groceries".to_owned(), 30.0),
                    ("Salary".to_owned(), 100.0)
                ],
                2,
                1
            )
        );
    }

    #[test]
    fn both_backends_reject_duplicate_emails_with_any_casing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut json_users, _) = json_stores(dir.path());
        let (mut sqlite_users, _) = sqlite_stores();

        for users in [&mut json_users as &mut dyn UserStore, &mut sqlite_users] {
            users
                .create(
                    Email::new("casing@example.com").unwrap(),
                    PasswordHash::new_unchecked("hunter2"),
                )
                .unwrap();

            let got = users.create(
                Email::new("CASING@example.com").unwrap(),
                PasswordHash::new_unchecked("hunter3"),
            );

            assert_eq!(got, Err(crate::Error::Conflict("email")));
        }
    }

    #[test]
    fn deleted_emails_are_reusable_on_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (mut json_users, _) = json_stores(dir.path());
        let (mut sqlite_users, _) = sqlite_stores();

        for users in [&mut json_users as &mut dyn UserStore, &mut sqlite_users] {
            let first = users
                .create(
                    Email::new("reuse@example.com").unwrap(),
                    PasswordHash::new_unchecked("hunter2"),
                )
                .unwrap();

            users.delete(first.id).unwrap();

            let second = users
                .create(
                    Email::new("reuse@example.com").unwrap(),
                    PasswordHash::new_unchecked("hunter3"),
                )
                .unwrap();

            assert_ne!(second.id, first.id);
            assert_eq!(
                users
                    .get_by_email(&Email::new("reuse@example.com").unwrap())
                    .unwrap(),
                second
            );
        }
    }

    #[test]
    fn get_with_unknown_id_is_not_found_on_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (json_users, _) = json_stores(dir.path());
        let (sqlite_users, _) = sqlite_stores();

        let id = UserId::new();

        assert_eq!(json_users.get(id), Err(crate::Error::NotFound));
        assert_eq!(sqlite_users.get(id), Err(crate::Error::NotFound));
    }
}

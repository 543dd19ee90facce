//! Defines the transaction store trait and the filter type shared by both
//! backends.

use std::ops::RangeInclusive;

use time::Date;

use crate::{
    models::{NewTransaction, Transaction, TransactionId, TransactionKind, TransactionUpdate, UserId},
    pagination::{Page, PageQuery},
    Error,
};

/// A conjunctive filter over transactions: all supplied fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions owned by this user.
    pub user_id: Option<UserId>,
    /// Only transactions of this kind.
    pub kind: Option<TransactionKind>,
    /// Only transactions with exactly this category.
    pub category: Option<String>,
    /// Only transactions carrying this tag.
    pub tag: Option<String>,
    /// Only transactions dated within this range, inclusive on both ends.
    pub date_range: Option<RangeInclusive<Date>>,
}

impl TransactionFilter {
    /// Whether `transaction` satisfies every supplied filter field.
    ///
    /// This is the reference semantics for filtering; the SQLite backend's
    /// WHERE clause mirrors it.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(user_id) = self.user_id {
            if transaction.user_id != user_id {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if transaction.kind != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &transaction.category != category {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !transaction.tags.contains(tag) {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            if !range.contains(&transaction.date) {
                return false;
            }
        }

        true
    }
}

/// One row of a per-category aggregation: the summed amount and record count
/// for a (category, kind) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// Whether the row covers income or expenses.
    pub kind: TransactionKind,
    /// The summed amount of the matching transactions.
    pub total: f64,
    /// How many transactions the row covers.
    pub count: u64,
}

/// Handles the creation, retrieval, querying, and aggregation of
/// [Transaction] records.
pub trait TransactionStore {
    /// Persist a new transaction. Input must already be validated.
    fn create(&mut self, new: NewTransaction) -> Result<Transaction, Error>;

    /// Get a transaction by its id.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to a
    /// transaction.
    fn get(&self, id: TransactionId) -> Result<Transaction, Error>;

    /// Query for one page of matching transactions.
    ///
    /// Results are ordered by effective date in the requested direction,
    /// tiebroken by creation time and then id so ordering is deterministic.
    /// The returned page's `total` is computed independently of the slice;
    /// an empty result is a page with `total = 0`, never an error.
    fn find(&self, filter: &TransactionFilter, page: &PageQuery)
        -> Result<Page<Transaction>, Error>;

    /// Return every matching transaction ordered by date ascending.
    fn find_all(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, Error>;

    /// Merge `update` over the transaction and refresh its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to a
    /// transaction.
    fn update(&mut self, id: TransactionId, update: TransactionUpdate)
        -> Result<Transaction, Error>;

    /// Remove the transaction, making the id invalid for subsequent lookups.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if the id does not resolve to a
    /// transaction.
    fn delete(&mut self, id: TransactionId) -> Result<(), Error>;

    /// Sum the matching transactions per (category, kind) pair, ordered by
    /// category name then kind for determinism.
    ///
    /// Backends aggregate natively where they can (GROUP BY on SQLite, a
    /// single pass over the container file otherwise).
    fn category_totals(&self, filter: &TransactionFilter) -> Result<Vec<CategoryTotal>, Error>;
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::models::{NewTransaction, TransactionKind, UserId};

    use super::TransactionFilter;

    fn record(kind: TransactionKind, category: &str, tags: &[&str]) -> crate::models::Transaction {
        NewTransaction {
            user_id: UserId::new(),
            kind,
            category: category.to_owned(),
            amount: 10.0,
            description: String::new(),
            date: date!(2024 - 03 - 15),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            payment_method: None,
            recurring: false,
        }
        .into_record()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let transaction = record(TransactionKind::Income, "Salary", &[]);

        assert!(TransactionFilter::default().matches(&transaction));
    }

    #[test]
    fn filter_fields_are_conjunctive() {
        let transaction = record(TransactionKind::Expense, "Groceries", &["weekly"]);

        let matching = TransactionFilter {
            user_id: Some(transaction.user_id),
            kind: Some(TransactionKind::Expense),
            category: Some("Groceries".to_owned()),
            tag: Some("weekly".to_owned()),
            date_range: Some(date!(2024 - 03 - 01)..=date!(2024 - 03 - 31)),
        };

        assert!(matching.matches(&transaction));

        let wrong_kind = TransactionFilter {
            kind: Some(TransactionKind::Income),
            ..matching.clone()
        };

        assert!(!wrong_kind.matches(&transaction));
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let transaction = record(TransactionKind::Expense, "Groceries", &[]);

        let starts_on_date = TransactionFilter {
            date_range: Some(date!(2024 - 03 - 15)..=date!(2024 - 03 - 31)),
            ..Default::default()
        };
        let ends_on_date = TransactionFilter {
            date_range: Some(date!(2024 - 03 - 01)..=date!(2024 - 03 - 15)),
            ..Default::default()
        };
        let misses_date = TransactionFilter {
            date_range: Some(date!(2024 - 03 - 16)..=date!(2024 - 03 - 31)),
            ..Default::default()
        };

        assert!(starts_on_date.matches(&transaction));
        assert!(ends_on_date.matches(&transaction));
        assert!(!misses_date.matches(&transaction));
    }

    #[test]
    fn tag_filter_checks_membership() {
        let transaction = record(TransactionKind::Expense, "Groceries", &["weekly", "cash"]);

        let has_tag = TransactionFilter {
            tag: Some("cash".to_owned()),
            ..Default::default()
        };
        let missing_tag = TransactionFilter {
            tag: Some("card".to_owned()),
            ..Default::default()
        };

        assert!(has_tag.matches(&transaction));
        assert!(!missing_tag.matches(&transaction));
    }
}

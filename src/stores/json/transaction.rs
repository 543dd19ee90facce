//! The flat-file implementation of the transaction store.

use std::{cmp::Ordering, collections::HashMap, path::Path, sync::Arc};

use crate::{
    models::{NewTransaction, Transaction, TransactionId, TransactionKind, TransactionUpdate},
    pagination::{Page, PageQuery, SortOrder},
    stores::{json::JsonCollection, CategoryTotal, TransactionFilter, TransactionStore},
    Error,
};

use super::TRANSACTIONS_FILE;

/// Stores transactions in a single JSON container file.
#[derive(Debug, Clone)]
pub struct JsonTransactionStore {
    transactions: Arc<JsonCollection<Transaction>>,
}

impl JsonTransactionStore {
    /// Create a store over `data_dir/transactions.json`. The directory and
    /// file are created on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            transactions: Arc::new(JsonCollection::new(data_dir.join(TRANSACTIONS_FILE))),
        }
    }
}

/// Order by date in `sort` direction, tiebroken by creation time then id so
/// the ordering stays stable across updates.
fn compare(a: &Transaction, b: &Transaction, sort: SortOrder) -> Ordering {
    let by_date = match sort {
        SortOrder::Ascending => a.date.cmp(&b.date),
        SortOrder::Descending => b.date.cmp(&a.date),
    };

    by_date
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

impl TransactionStore for JsonTransactionStore {
    fn create(&mut self, new: NewTransaction) -> Result<Transaction, Error> {
        self.transactions.mutate(|records| {
            let transaction = new.into_record();
            records.push(transaction.clone());

            Ok(transaction)
        })
    }

    fn get(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.transactions
            .read()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound)
    }

    fn find(
        &self,
        filter: &TransactionFilter,
        page: &PageQuery,
    ) -> Result<Page<Transaction>, Error> {
        let mut matching: Vec<Transaction> = self
            .transactions
            .read()?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();

        matching.sort_by(|a, b| compare(a, b, page.sort));

        let total = matching.len() as u64;
        let skip = page.skip();
        let data = matching
            .into_iter()
            .skip(skip as usize)
            .take(page.per_page.max(1) as usize)
            .collect();

        Ok(Page::new(data, total, skip, page.per_page.max(1)))
    }

    fn find_all(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, Error> {
        let mut matching: Vec<Transaction> = self
            .transactions
            .read()?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();

        matching.sort_by(|a, b| compare(a, b, SortOrder::Ascending));

        Ok(matching)
    }

    fn update(
        &mut self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error> {
        self.transactions.mutate(|records| {
            let transaction = records
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(Error::NotFound)?;

            transaction.apply(update);

            Ok(transaction.clone())
        })
    }

    fn delete(&mut self, id: TransactionId) -> Result<(), Error> {
        self.transactions.mutate(|records| {
            let index = records
                .iter()
                .position(|t| t.id == id)
                .ok_or(Error::NotFound)?;

            records.remove(index);

            Ok(())
        })
    }

    fn category_totals(&self, filter: &TransactionFilter) -> Result<Vec<CategoryTotal>, Error> {
        let mut totals: HashMap<(String, TransactionKind), (f64, u64)> = HashMap::new();

        for transaction in self
            .transactions
            .read()?
            .into_iter()
            .filter(|t| filter.matches(t))
        {
            let entry = totals
                .entry((transaction.category, transaction.kind))
                .or_insert((0.0, 0));
            entry.0 += transaction.amount;
            entry.1 += 1;
        }

        let mut rows: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|((category, kind), (total, count))| CategoryTotal {
                category,
                kind,
                total,
                count,
            })
            .collect();

        rows.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
        });

        Ok(rows)
    }
}

//! The SQLite implementation of the transaction store.
//!
//! Filtering, pagination, and per-category totals are pushed down into SQL so
//! the database does the heavy lifting. The WHERE clause built here mirrors
//! [TransactionFilter::matches].

use std::sync::{Arc, Mutex};

use rusqlite::{params, params_from_iter, types::Value, Connection, Row};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::{
    models::{NewTransaction, Transaction, TransactionId, TransactionKind, TransactionUpdate, UserId},
    pagination::{Page, PageQuery, SortOrder},
    stores::{
        sqlite::{column_error, CreateTable, MapRow},
        CategoryTotal, TransactionFilter, TransactionStore,
    },
    Error,
};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, category, amount, description, date, tags, payment_method, recurring, \
     created_at, updated_at";

/// Effective dates are stored as ISO 8601 calendar dates so that string
/// comparison in SQL agrees with date order.
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Stores transactions in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn fetch(connection: &Connection, id: TransactionId) -> Result<Transaction, Error> {
        connection
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
            ))?
            .query_row(&[(":id", &id.to_string())], Self::map_row)
            .map_err(|error| error.into())
    }
}

/// Build the WHERE clause and its positional parameters for `filter`.
///
/// Tags are stored as a JSON array, so the tag predicate uses `json_each` to
/// test membership.
fn build_where(filter: &TransactionFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut parameters = Vec::new();

    if let Some(user_id) = filter.user_id {
        parameters.push(Value::Text(user_id.to_string()));
        clauses.push(format!("user_id = ?{}", parameters.len()));
    }

    if let Some(kind) = filter.kind {
        parameters.push(Value::Text(kind.as_str().to_owned()));
        clauses.push(format!("kind = ?{}", parameters.len()));
    }

    if let Some(category) = &filter.category {
        parameters.push(Value::Text(category.clone()));
        clauses.push(format!("category = ?{}", parameters.len()));
    }

    if let Some(tag) = &filter.tag {
        parameters.push(Value::Text(tag.clone()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(\"transaction\".tags) \
             WHERE json_each.value = ?{})",
            parameters.len()
        ));
    }

    if let Some(range) = &filter.date_range {
        parameters.push(Value::Text(range.start().to_string()));
        parameters.push(Value::Text(range.end().to_string()));
        clauses.push(format!(
            "date BETWEEN ?{} AND ?{}",
            parameters.len() - 1,
            parameters.len()
        ));
    }

    if clauses.is_empty() {
        (String::new(), parameters)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), parameters)
    }
}

impl TransactionStore for SqliteTransactionStore {
    /// Insert a new transaction. Input must already be validated.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::StorageUnavailable] if there is an SQL error.
    fn create(&mut self, new: NewTransaction) -> Result<Transaction, Error> {
        let transaction = new.into_record();
        let tags = serde_json::to_string(&transaction.tags)?;

        self.connection.lock().unwrap().execute(
            "INSERT INTO \"transaction\" (id, user_id, kind, category, amount, description, \
             date, tags, payment_method, recurring, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                transaction.id.to_string(),
                transaction.user_id.to_string(),
                transaction.kind.as_str(),
                transaction.category,
                transaction.amount,
                transaction.description,
                transaction.date.to_string(),
                tags,
                transaction.payment_method,
                transaction.recurring,
                transaction.created_at,
                transaction.updated_at,
            ],
        )?;

        Ok(transaction)
    }

    /// Get the transaction with the given `id`.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no transaction has the id.
    fn get(&self, id: TransactionId) -> Result<Transaction, Error> {
        Self::fetch(&self.connection.lock().unwrap(), id)
    }

    /// Query for one page of matching transactions.
    ///
    /// The total count is computed with a separate COUNT query so it is
    /// independent of the returned slice. Ordering is by date in the
    /// requested direction, then creation time, then id.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    fn find(
        &self,
        filter: &TransactionFilter,
        page: &PageQuery,
    ) -> Result<Page<Transaction>, Error> {
        let (where_clause, parameters) = build_where(filter);
        let connection = self.connection.lock().unwrap();

        let total: i64 = connection
            .prepare(&format!(
                "SELECT COUNT(*) FROM \"transaction\"{where_clause}"
            ))?
            .query_row(params_from_iter(parameters.iter()), |row| row.get(0))?;

        let direction = match page.sort {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        // SQLite's OFFSET is a signed integer.
        let skip = page.skip().min(i64::MAX as u64);

        let data = connection
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"{where_clause} \
                 ORDER BY date {direction}, created_at ASC, id ASC \
                 LIMIT {} OFFSET {skip}",
                page.per_page
            ))?
            .query_map(params_from_iter(parameters.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(data, total as u64, skip, page.per_page))
    }

    /// Return every matching transaction ordered by date ascending.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    fn find_all(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, Error> {
        let (where_clause, parameters) = build_where(filter);

        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"{where_clause} \
                 ORDER BY date ASC, created_at ASC, id ASC"
            ))?
            .query_map(params_from_iter(parameters.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| error.into())
    }

    /// Merge `update` over the transaction's row.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no transaction has the id.
    fn update(
        &mut self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error> {
        // The lock is held across the read and the write so concurrent
        // partial updates to the same record cannot overwrite each other.
        let connection = self.connection.lock().unwrap();

        let mut transaction = Self::fetch(&connection, id)?;
        transaction.apply(update);
        let tags = serde_json::to_string(&transaction.tags)?;

        let rows = connection.execute(
            "UPDATE \"transaction\" SET kind = ?1, category = ?2, amount = ?3, \
             description = ?4, date = ?5, tags = ?6, payment_method = ?7, recurring = ?8, \
             updated_at = ?9 WHERE id = ?10",
            params![
                transaction.kind.as_str(),
                transaction.category,
                transaction.amount,
                transaction.description,
                transaction.date.to_string(),
                tags,
                transaction.payment_method,
                transaction.recurring,
                transaction.updated_at,
                transaction.id.to_string(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        Ok(transaction)
    }

    /// Remove the transaction's row.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    ///
    /// # Errors
    ///
    /// Returns an [Error::NotFound] if no transaction has the id.
    fn delete(&mut self, id: TransactionId) -> Result<(), Error> {
        let rows = self.connection.lock().unwrap().execute(
            "DELETE FROM \"transaction\" WHERE id = ?1",
            params![id.to_string()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    /// Sum the matching transactions per (category, kind) pair with a single
    /// GROUP BY query.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is poisoned.
    fn category_totals(&self, filter: &TransactionFilter) -> Result<Vec<CategoryTotal>, Error> {
        let (where_clause, parameters) = build_where(filter);

        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT category, kind, SUM(amount), COUNT(*) \
                 FROM \"transaction\"{where_clause} \
                 GROUP BY category, kind ORDER BY category ASC, kind ASC"
            ))?
            .query_map(params_from_iter(parameters.iter()), |row| {
                let raw_kind: String = row.get(1)?;
                let count: i64 = row.get(3)?;

                Ok(CategoryTotal {
                    category: row.get(0)?,
                    kind: TransactionKind::parse(&raw_kind)
                        .map_err(|error| column_error(1, error))?,
                    total: row.get(2)?,
                    count: count as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| error.into())
    }
}

impl CreateTable for SqliteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    category TEXT NOT NULL,
                    amount REAL NOT NULL,
                    description TEXT NOT NULL,
                    date TEXT NOT NULL,
                    tags TEXT NOT NULL,
                    payment_method TEXT,
                    recurring INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id)
                    )",
            (),
        )?;

        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_transaction_user_date \
             ON \"transaction\" (user_id, date)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SqliteTransactionStore {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let raw_id: String = row.get(offset)?;
        let raw_user_id: String = row.get(offset + 1)?;
        let raw_kind: String = row.get(offset + 2)?;
        let raw_date: String = row.get(offset + 6)?;
        let raw_tags: String = row.get(offset + 7)?;

        Ok(Transaction {
            id: TransactionId::parse(&raw_id).map_err(|error| column_error(offset, error))?,
            user_id: UserId::parse(&raw_user_id)
                .map_err(|error| column_error(offset + 1, error))?,
            kind: TransactionKind::parse(&raw_kind)
                .map_err(|error| column_error(offset + 2, error))?,
            category: row.get(offset + 3)?,
            amount: row.get(offset + 4)?,
            description: row.get(offset + 5)?,
            date: Date::parse(&raw_date, DATE_FORMAT)
                .map_err(|error| column_error(offset + 6, error))?,
            tags: serde_json::from_str(&raw_tags)
                .map_err(|error| column_error(offset + 7, error))?,
            payment_method: row.get(offset + 8)?,
            recurring: row.get(offset + 9)?,
            created_at: row.get(offset + 10)?,
            updated_at: row.get(offset + 11)?,
        })
    }
}

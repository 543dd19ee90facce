//! Defines the transaction record, the core type of the budgeting side of
//! the application, and its validated input forms.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{config::TransactionLimits, models::UserId, Error};

/// The unique identifier of a [Transaction]. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
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
            .map_err(|_| Error::Validation(format!("invalid transaction id {text:?}")))
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether money was earned or spent. There is no third kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionKind {
    /// The lower-case name used in serialized records and SQL columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Parse a kind from its lower-case name.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] for anything other than `income` or
    /// `expense`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(Error::Validation(format!(
                "transaction kind must be \"income\" or \"expense\", got {text:?}"
            ))),
        }
    }
}

/// An income or expense, i.e. an event where money was earned or spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The unique identifier of the transaction.
    pub id: TransactionId,
    /// The user that owns this transaction.
    pub user_id: UserId,
    /// Whether this is income or an expense.
    pub kind: TransactionKind,
    /// A non-empty, length-bounded category name.
    pub category: String,
    /// The amount of money involved. Always positive and at most the
    /// configured maximum.
    pub amount: f64,
    /// A free-text description of the transaction. May be empty.
    pub description: String,
    /// The date the transaction took effect.
    pub date: Date,
    /// Optional free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// How the transaction was paid, if recorded.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Whether this transaction recurs.
    #[serde(default)]
    pub recurring: bool,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last modified. Always at or after `created_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The validated input for creating a [Transaction].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransaction {
    /// The user that will own the transaction.
    pub user_id: UserId,
    /// Whether this is income or an expense.
    pub kind: TransactionKind,
    /// The category name.
    pub category: String,
    /// The amount of money involved.
    pub amount: f64,
    /// A free-text description.
    #[serde(default)]
    pub description: String,
    /// The date the transaction took effect.
    pub date: Date,
    /// Optional free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// How the transaction was paid, if recorded.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Whether this transaction recurs.
    #[serde(default)]
    pub recurring: bool,
}

impl NewTransaction {
    /// Check this input against the configured `limits`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] naming the first violated bound:
    /// non-positive or over-limit amount, empty or over-long category, or
    /// over-long description.
    pub fn validate(&self, limits: &TransactionLimits) -> Result<(), Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::Validation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }

        if self.amount > limits.max_amount {
            return Err(Error::Validation(format!(
                "amount must be at most {}, got {}",
                limits.max_amount, self.amount
            )));
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(Error::Validation("category must not be empty".to_owned()));
        }
        if category.chars().count() > limits.max_category_length {
            return Err(Error::Validation(format!(
                "category must be at most {} characters",
                limits.max_category_length
            )));
        }

        if self.description.chars().count() > limits.max_description_length {
            return Err(Error::Validation(format!(
                "description must be at most {} characters",
                limits.max_description_length
            )));
        }

        Ok(())
    }

    /// Turn this input into a record with a fresh id and timestamps.
    ///
    /// Callers must run [NewTransaction::validate] first; this function does
    /// not re-check the bounds.
    pub fn into_record(self) -> Transaction {
        let now = OffsetDateTime::now_utc();

        Transaction {
            id: TransactionId::new(),
            user_id: self.user_id,
            kind: self.kind,
            category: self.category.trim().to_owned(),
            amount: self.amount,
            description: self.description,
            date: self.date,
            tags: self.tags,
            payment_method: self.payment_method,
            recurring: self.recurring,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update of a [Transaction]; unspecified fields are preserved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionUpdate {
    /// New kind, if any.
    pub kind: Option<TransactionKind>,
    /// New category, if any.
    pub category: Option<String>,
    /// New amount, if any.
    pub amount: Option<f64>,
    /// New description, if any.
    pub description: Option<String>,
    /// New effective date, if any.
    pub date: Option<Date>,
    /// Replacement tag set, if any.
    pub tags: Option<Vec<String>>,
    /// New payment method, if any. `Some(None)` clears the field.
    pub payment_method: Option<Option<String>>,
    /// New recurrence marker, if any.
    pub recurring: Option<bool>,
}

impl TransactionUpdate {
    /// Check the changed fields against the configured `limits`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] naming the first violated bound.
    pub fn validate(&self, limits: &TransactionLimits) -> Result<(), Error> {
        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(Error::Validation(format!(
                    "amount must be positive, got {amount}"
                )));
            }
            if amount > limits.max_amount {
                return Err(Error::Validation(format!(
                    "amount must be at most {}, got {amount}",
                    limits.max_amount
                )));
            }
        }

        if let Some(category) = &self.category {
            let category = category.trim();
            if category.is_empty() {
                return Err(Error::Validation("category must not be empty".to_owned()));
            }
            if category.chars().count() > limits.max_category_length {
                return Err(Error::Validation(format!(
                    "category must be at most {} characters",
                    limits.max_category_length
                )));
            }
        }

        if let Some(description) = &self.description {
            if description.chars().count() > limits.max_description_length {
                return Err(Error::Validation(format!(
                    "description must be at most {} characters",
                    limits.max_description_length
                )));
            }
        }

        Ok(())
    }
}

impl Transaction {
    /// Merge `update` over this record and refresh `updated_at`.
    pub fn apply(&mut self, update: TransactionUpdate) {
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(category) = update.category {
            self.category = category.trim().to_owned();
        }
        if let Some(amount) = update.amount {
            self.amount = amount;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(payment_method) = update.payment_method {
            self.payment_method = payment_method;
        }
        if let Some(recurring) = update.recurring {
            self.recurring = recurring;
        }
        self.updated_at = OffsetDateTime::now_utc();
    }
}

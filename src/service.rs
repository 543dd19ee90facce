//! The access facade that ties the stores, aggregation, and token service
//! together behind one typed surface.
//!
//! The facade owns all cross-cutting policy: input validation, pagination
//! clamping, credential checks, and the mapping of lookups on behalf of
//! unauthenticated callers to [Error::Unauthorized].

use tracing::info;

use crate::{
    aggregation::{
        self, category_summary, month_window, months_back, parse_month, CategorySummary,
        MonthlySummary, Summary, MAX_COMPARISON_MONTHS,
    },
    auth::{Claims, TokenService},
    config::{Config, StorageBackend, TransactionLimits},
    models::{
        Email, NewTransaction, PasswordHash, Transaction, TransactionId, TransactionUpdate, User,
        UserId, UserUpdate,
    },
    pagination::{Page, PageQuery, PaginationConfig},
    stores::{
        json::{JsonTransactionStore, JsonUserStore},
        sqlite::{self, SqliteTransactionStore, SqliteUserStore},
        TransactionFilter, TransactionStore, UserStore,
    },
    Error,
};

/// A [LedgerService] over the flat-file JSON backend.
pub type FileLedgerService = LedgerService<JsonUserStore, JsonTransactionStore>;

/// A [LedgerService] over the SQLite backend.
pub type SqliteLedgerService = LedgerService<SqliteUserStore, SqliteTransactionStore>;

/// The single entry point callers use to register users, record and query
/// transactions, aggregate them, and manage session tokens.
///
/// The service is generic over its stores so both backends, and in-memory
/// test doubles, share one code path.
#[derive(Debug, Clone)]
pub struct LedgerService<U, T> {
    users: U,
    transactions: T,
    tokens: TokenService,
    limits: TransactionLimits,
    pagination: PaginationConfig,
}

impl<U, T> LedgerService<U, T> {
    /// Create a service over the given stores, taking its policy knobs from
    /// `config`.
    pub fn new(users: U, transactions: T, config: &Config) -> Self {
        Self {
            users,
            transactions,
            tokens: TokenService::new(&config.token_secret, config.token_lifetime),
            limits: config.limits.clone(),
            pagination: config.pagination.clone(),
        }
    }
}

impl FileLedgerService {
    /// Open a service over the container files under the configured data
    /// directory.
    ///
    /// The directory is created on first write, so opening never touches the
    /// filesystem.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `config` selects another backend.
    pub fn open_file(config: &Config) -> Result<Self, Error> {
        match &config.backend {
            StorageBackend::File { data_dir } => Ok(Self::new(
                JsonUserStore::new(data_dir),
                JsonTransactionStore::new(data_dir),
                config,
            )),
            StorageBackend::Sqlite { .. } => Err(Error::Validation(
                "the configuration does not select the file backend".to_owned(),
            )),
        }
    }
}

impl SqliteLedgerService {
    /// Open a service over the configured SQLite database, creating the
    /// schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `config` selects another backend,
    /// or an [Error::StorageUnavailable] if the database cannot be opened or
    /// initialized.
    pub fn open_sqlite(config: &Config) -> Result<Self, Error> {
        let db_path = match &config.backend {
            StorageBackend::Sqlite { db_path } => db_path,
            StorageBackend::File { .. } => {
                return Err(Error::Validation(
                    "the configuration does not select the SQLite backend".to_owned(),
                ))
            }
        };

        let connection = sqlite::open(db_path, config.busy_timeout)?;
        sqlite::initialize(&connection)?;
        let connection = std::sync::Arc::new(std::sync::Mutex::new(connection));

        Ok(Self::new(
            SqliteUserStore::new(connection.clone()),
            SqliteTransactionStore::new(connection),
            config,
        ))
    }
}

impl<U: UserStore, T: TransactionStore> LedgerService<U, T> {
    /// Register a new user from a raw email and password.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] for a malformed email, an
    /// [Error::HashingError] if the password cannot be hashed, or an
    /// [Error::Conflict] if the email is already registered.
    pub fn register_user(&mut self, email: &str, password: &str) -> Result<User, Error> {
        let email = Email::new(email)?;
        let password_hash = PasswordHash::new(password)?;

        let user = self.users.create(email, password_hash)?;
        info!(user_id = %user.id, "registered user");

        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: UserId) -> Result<User, Error> {
        self.users.get(id)
    }

    /// Get a user by email address.
    pub fn get_user_by_email(&self, email: &str) -> Result<User, Error> {
        self.users.get_by_email(&Email::new(email)?)
    }

    /// Merge `update` over a user's record.
    pub fn update_user(&mut self, id: UserId, update: UserUpdate) -> Result<User, Error> {
        self.users.update(id, update)
    }

    /// Delete a user. Their transactions are retained for bookkeeping.
    pub fn delete_user(&mut self, id: UserId) -> Result<(), Error> {
        self.users.delete(id)?;
        info!(user_id = %id, "deleted user");

        Ok(())
    }

    /// Validate and persist a new transaction.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if the input violates the configured
    /// limits, or an [Error::NotFound] if the owning user does not exist.
    pub fn create_transaction(&mut self, new: NewTransaction) -> Result<Transaction, Error> {
        new.validate(&self.limits)?;
        self.users.get(new.user_id)?;

        self.transactions.create(new)
    }

    /// Get a transaction by id.
    pub fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.transactions.get(id)
    }

    /// Query for one page of matching transactions.
    ///
    /// The page request is clamped into the configured bounds before it
    /// reaches the store.
    pub fn find_transactions(
        &self,
        filter: &TransactionFilter,
        page: &PageQuery,
    ) -> Result<Page<Transaction>, Error> {
        self.transactions.find(filter, &page.normalized(&self.pagination))
    }

    /// Validate `update` and merge it over a transaction.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error> {
        update.validate(&self.limits)?;

        self.transactions.update(id, update)
    }

    /// Delete a transaction.
    pub fn delete_transaction(&mut self, id: TransactionId) -> Result<(), Error> {
        self.transactions.delete(id)
    }

    /// Summarize a user's transactions, optionally restricted to one
    /// `YYYY-MM` month.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `month` is not a valid year-month.
    pub fn summarize(&self, user_id: UserId, month: Option<&str>) -> Result<Summary, Error> {
        let date_range = match month {
            Some(text) => {
                let (year, month) = parse_month(text)?;
                Some(month_window(year, month))
            }
            None => None,
        };

        let totals = self.transactions.category_totals(&TransactionFilter {
            user_id: Some(user_id),
            date_range,
            ..Default::default()
        })?;

        Ok(Summary::from_totals(&totals))
    }

    /// Summarize one of a user's categories.
    pub fn category_summary(
        &self,
        user_id: UserId,
        category: &str,
    ) -> Result<CategorySummary, Error> {
        let records = self.transactions.find_all(&TransactionFilter {
            user_id: Some(user_id),
            category: Some(category.to_owned()),
            ..Default::default()
        })?;

        Ok(category_summary(&records, category))
    }

    /// Summarize each of the last `months` calendar months for a user,
    /// oldest month first.
    ///
    /// The range ends at the current month in the server's local calendar
    /// and is capped at [MAX_COMPARISON_MONTHS].
    pub fn monthly_comparison(
        &self,
        user_id: UserId,
        months: u32,
    ) -> Result<Vec<MonthlySummary>, Error> {
        let count = months.clamp(1, MAX_COMPARISON_MONTHS);
        let today = aggregation::local_today();

        let mut summaries = Vec::with_capacity(count as usize);
        for (year, month) in months_back(today, count) {
            let totals = self.transactions.category_totals(&TransactionFilter {
                user_id: Some(user_id),
                date_range: Some(month_window(year, month)),
                ..Default::default()
            })?;

            let month_number = u8::from(month);
            summaries.push(MonthlySummary {
                year,
                month: month_number,
                label: format!("{year:04}-{month_number:02}"),
                summary: Summary::from_totals(&totals),
            });
        }

        summaries.reverse();
        Ok(summaries)
    }

    /// Check a user's credentials and issue a signed session token.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Unauthorized] for an unknown email or a wrong
    /// password, without distinguishing the two.
    pub fn issue_token(&self, email: &str, password: &str) -> Result<String, Error> {
        let email = Email::new(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .map_err(|_| Error::Unauthorized)?;

        if !user.password_hash.verify(password)? {
            return Err(Error::Unauthorized);
        }

        self.tokens.issue(user.id, user.email.as_str())
    }

    /// Verify a session token and confirm its user is still active.
    ///
    /// # Errors
    ///
    /// Returns a token error if the token is malformed, forged, or expired,
    /// or an [Error::Unauthorized] if the user no longer exists.
    pub fn verify_token(&self, token: &str) -> Result<Claims, Error> {
        let claims = self.tokens.verify(token)?;
        self.users.get(claims.sub).map_err(|_| Error::Unauthorized)?;

        Ok(claims)
    }

    /// Exchange a valid token for a fresh one with a renewed expiry.
    pub fn refresh_token(&self, token: &str) -> Result<String, Error> {
        let claims = self.tokens.verify(token)?;
        self.users.get(claims.sub).map_err(|_| Error::Unauthorized)?;

        self.tokens.refresh(token)
    }
}

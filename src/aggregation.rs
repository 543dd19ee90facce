//! Derives financial summaries from transaction sets: income/expense totals,
//! per-category break-downs, and month-over-month comparisons.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;
use time::{Date, Month, OffsetDateTime};

use crate::{
    models::{Transaction, TransactionKind},
    stores::CategoryTotal,
    Error,
};

/// The most months a comparison may span.
pub const MAX_COMPARISON_MONTHS: u32 = 12;

/// Round to two decimal places for percentages and averages.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An income/expense summary of a set of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of all income amounts.
    pub total_income: f64,
    /// The sum of all expense amounts.
    pub total_expense: f64,
    /// `total_income - total_expense`.
    pub net_savings: f64,
    /// Net savings as a percentage of income, rounded to two decimal
    /// places. Zero when there is no income.
    pub savings_percentage: f64,
    /// Income summed per category.
    pub income_by_category: HashMap<String, f64>,
    /// Expenses summed per category.
    pub expense_by_category: HashMap<String, f64>,
    /// How many transactions the summary covers.
    pub transaction_count: u64,
}

impl Summary {
    /// Summarize a record set in a single pass.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut summary = Summary::empty();

        for transaction in transactions {
            summary.add(
                transaction.kind,
                &transaction.category,
                transaction.amount,
                1,
            );
        }

        summary.finish()
    }

    /// Summarize pre-aggregated per-category totals, as returned by
    /// [crate::stores::TransactionStore::category_totals].
    ///
    /// Produces the same result as [Summary::from_transactions] over the
    /// records the totals were computed from.
    pub fn from_totals(totals: &[CategoryTotal]) -> Self {
        let mut summary = Summary::empty();

        for row in totals {
            summary.add(row.kind, &row.category, row.total, row.count);
        }

        summary.finish()
    }

    fn empty() -> Self {
        Self {
            total_income: 0.0,
            total_expense: 0.0,
            net_savings: 0.0,
            savings_percentage: 0.0,
            income_by_category: HashMap::new(),
            expense_by_category: HashMap::new(),
            transaction_count: 0,
        }
    }

    fn add(&mut self, kind: TransactionKind, category: &str, amount: f64, count: u64) {
        let by_category = match kind {
            TransactionKind::Income => {
                self.total_income += amount;
                &mut self.income_by_category
            }
            TransactionKind::Expense => {
                self.total_expense += amount;
                &mut self.expense_by_category
            }
        };
        *by_category.entry(category.to_owned()).or_insert(0.0) += amount;
        self.transaction_count += count;
    }

    fn finish(mut self) -> Self {
        self.net_savings = self.total_income - self.total_expense;
        self.savings_percentage = if self.total_income > 0.0 {
            round2(self.net_savings / self.total_income * 100.0)
        } else {
            0.0
        };
        self
    }
}

/// A summary of one category's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// The sum of all amounts in the category, income and expense alike.
    pub total_amount: f64,
    /// How many transactions the category holds.
    pub transaction_count: u64,
    /// How many of those are income.
    pub income_count: u64,
    /// How many of those are expenses.
    pub expense_count: u64,
    /// `total_amount / transaction_count`, rounded to two decimal places.
    /// Zero when the category is empty.
    pub average: f64,
}

/// Summarize the transactions in `records` whose category equals `category`.
pub fn category_summary(records: &[Transaction], category: &str) -> CategorySummary {
    let mut total_amount = 0.0;
    let mut income_count = 0;
    let mut expense_count = 0;

    for transaction in records.iter().filter(|t| t.category == category) {
        total_amount += transaction.amount;
        match transaction.kind {
            TransactionKind::Income => income_count += 1,
            TransactionKind::Expense => expense_count += 1,
        }
    }

    let transaction_count = income_count + expense_count;
    let average = if transaction_count > 0 {
        round2(total_amount / transaction_count as f64)
    } else {
        0.0
    };

    CategorySummary {
        total_amount,
        transaction_count,
        income_count,
        expense_count,
        average,
    }
}

/// One month's summary within a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// The calendar year of the month.
    pub year: i32,
    /// The month, 1-based (January = 1).
    pub month: u8,
    /// The month label in `YYYY-MM` form.
    pub label: String,
    /// The summary of the month's transactions.
    pub summary: Summary,
}

/// The inclusive date window of a calendar month, first day through last day.
///
/// Windows are computed in the server's local calendar; no timezone
/// normalization is performed, so callers in other timezones may see
/// transactions fall into a neighboring month.
pub fn month_window(year: i32, month: Month) -> RangeInclusive<Date> {
    // Both constructions are valid for any (year, month) in Date's range.
    let first = Date::from_calendar_date(year, month, 1)
        .expect("the first of a calendar month is always a valid date");
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        _ => (year, month.next()),
    };
    let last = Date::from_calendar_date(next_year, next_month, 1)
        .expect("the first of a calendar month is always a valid date")
        .previous_day()
        .expect("the day before the first of a month always exists");

    first..=last
}

/// Parse a `YYYY-MM` month label.
///
/// # Errors
///
/// Returns an [Error::Validation] if `text` is not a valid year-month.
pub fn parse_month(text: &str) -> Result<(i32, Month), Error> {
    let error = || Error::Validation(format!("month must be in YYYY-MM form, got {text:?}"));

    let (year_text, month_text) = text.split_once('-').ok_or_else(error)?;
    let year: i32 = year_text.parse().map_err(|_| error())?;
    let month_number: u8 = month_text.parse().map_err(|_| error())?;
    let month = Month::try_from(month_number).map_err(|_| error())?;

    Ok((year, month))
}

/// The last `count` calendar months ending at `today`'s month, newest first.
pub fn months_back(today: Date, count: u32) -> Vec<(i32, Month)> {
    let mut months = Vec::with_capacity(count as usize);
    let mut year = today.year();
    let mut month = today.month();

    for _ in 0..count {
        months.push((year, month));
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    months
}

/// The current date in the server's local calendar, falling back to UTC when
/// the local offset cannot be determined.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests {
    use time::{macros::date, Month, OffsetDateTime};

    use crate::models::{NewTransaction, Transaction, TransactionKind, UserId};
    use crate::stores::CategoryTotal;

    use super::{
        category_summary, month_window, months_back, parse_month, round2, Summary,
    };

    fn transaction(kind: TransactionKind, amount: f64, category: &str) -> Transaction {
        NewTransaction {
            user_id: UserId::new(),
            kind,
            category: category.to_owned(),
            amount,
            description: String::new(),
            date: OffsetDateTime::now_utc().date(),
            tags: vec![],
            payment_method: None,
            recurring: false,
        }
        .into_record()
    }

    #[test]
    fn summarize_computes_net_savings_and_percentage() {
        let records = vec![
            transaction(TransactionKind::Income, 100.0, "Salary"),
            transaction(TransactionKind::Expense, 30.0, "Groceries"),
            transaction(TransactionKind::Expense, 20.0, "Transport"),
        ];

        let got = Summary::from_transactions(&records);

        assert_eq!(got.total_income, 100.0);
        assert_eq!(got.total_expense, 50.0);
        assert_eq!(got.net_savings, 50.0);
        assert_eq!(got.savings_percentage, 50.0);
        assert_eq!(got.transaction_count, 3);
        assert_eq!(got.income_by_category["Salary"], 100.0);
        assert_eq!(got.expense_by_category["Groceries"], 30.0);
        assert_eq!(got.expense_by_category["Transport"], 20.0);
    }

    #[test]
    fn summarize_handles_no_income() {
        let records = vec![transaction(TransactionKind::Expense, 25.0, "Groceries")];

        let got = Summary::from_transactions(&records);

        assert_eq!(got.total_income, 0.0);
        assert_eq!(got.net_savings, -25.0);
        assert_eq!(got.savings_percentage, 0.0);
    }

    #[test]
    fn summarize_handles_empty_record_set() {
        let got = Summary::from_transactions(&[]);

        assert_eq!(got.transaction_count, 0);
        assert_eq!(got.net_savings, 0.0);
        assert!(got.income_by_category.is_empty());
    }

    #[test]
    fn from_totals_matches_from_transactions() {
        let records = vec![
            transaction(TransactionKind::Income, 100.0, "Salary"),
            transaction(TransactionKind::Income, 250.0, "Salary"),
            transaction(TransactionKind::Expense, 30.0, "Groceries"),
        ];
        let totals = vec![
            CategoryTotal {
                category: "Salary".to_owned(),
                kind: TransactionKind::Income,
                total: 350.0,
                count: 2,
            },
            CategoryTotal {
                category: "Groceries".to_owned(),
                kind: TransactionKind::Expense,
                total: 30.0,
                count: 1,
            },
        ];

        assert_eq!(
            Summary::from_transactions(&records),
            Summary::from_totals(&totals)
        );
    }

    #[test]
    fn category_summary_averages_over_both_kinds() {
        let records = vec![
            transaction(TransactionKind::Income, 100.0, "Side gig"),
            transaction(TransactionKind::Expense, 49.0, "Side gig"),
            transaction(TransactionKind::Expense, 20.0, "Groceries"),
        ];

        let got = category_summary(&records, "Side gig");

        assert_eq!(got.total_amount, 149.0);
        assert_eq!(got.transaction_count, 2);
        assert_eq!(got.income_count, 1);
        assert_eq!(got.expense_count, 1);
        assert_eq!(got.average, 74.5);
    }

    #[test]
    fn category_summary_of_missing_category_is_zeroed() {
        let got = category_summary(&[], "Groceries");

        assert_eq!(got.transaction_count, 0);
        assert_eq!(got.average, 0.0);
    }

    #[test]
    fn month_window_spans_first_to_last_day() {
        let window = month_window(2024, Month::February);

        assert_eq!(*window.start(), date!(2024 - 02 - 01));
        assert_eq!(*window.end(), date!(2024 - 02 - 29));

        let window = month_window(2023, Month::December);

        assert_eq!(*window.start(), date!(2023 - 12 - 01));
        assert_eq!(*window.end(), date!(2023 - 12 - 31));
    }

    #[test]
    fn months_back_walks_across_year_boundary() {
        let got = months_back(date!(2024 - 02 - 15), 4);

        let want = vec![
            (2024, Month::February),
            (2024, Month::January),
            (2023, Month::December),
            (2023, Month::November),
        ];

        assert_eq!(want, got);
    }

    #[test]
    fn parse_month_accepts_year_month_labels() {
        assert_eq!(parse_month("2024-03"), Ok((2024, Month::March)));
        assert!(parse_month("2024").is_err());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("abcd-03").is_err());
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
    }
}

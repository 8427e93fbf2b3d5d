//! Raw form input and its validation.
//!
//! Drafts hold exactly what the user typed. Validation turns them into
//! typed request bodies before any network call is made.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Category, NewTransaction, Transaction, TransactionPatch};

/// Date format accepted in drafts.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The transaction name is empty or whitespace.
    #[error("transaction name must not be empty")]
    EmptyName,
    /// The amount is not a finite number.
    #[error("amount {0:?} is not a number")]
    InvalidAmount(String),
    /// The date is not a valid `YYYY-MM-DD` calendar date.
    #[error("date {0:?} is not a valid YYYY-MM-DD date")]
    InvalidDate(String),
    /// The category name is not one of the known categories.
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    /// The month number is outside `1..=12`.
    #[error("month {0} is out of range")]
    InvalidMonth(u32),
    /// The year does not fit the four-digit `YYYY` form.
    #[error("year {0} is out of range")]
    InvalidYear(i32),
    /// The period string is not `YYYY-MM`.
    #[error("period {0:?} is not in YYYY-MM form")]
    InvalidPeriod(String),
}

/// Contents of the "new transaction" form, or of an in-place edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Entered name.
    pub name: String,
    /// Entered amount, unparsed.
    pub amount: String,
    /// Selected category.
    pub category: Category,
    /// Entered date, unparsed.
    pub date: String,
}

impl TransactionDraft {
    /// Creates an empty draft dated `today`, as the add form starts out.
    #[inline]
    #[must_use]
    pub fn dated(today: NaiveDate) -> Self {
        Self {
            date: today.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Seeds a draft from an existing record (edit start).
    #[inline]
    #[must_use]
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            name: tx.name.clone(),
            amount: tx.amount.to_string(),
            category: tx.category,
            date: tx.date.format(DATE_FORMAT).to_string(),
        }
    }

    /// Validates the draft into a create body.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking name,
    /// amount, then date.
    #[inline]
    pub fn validate(&self) -> Result<NewTransaction, ValidationError> {
        Ok(NewTransaction {
            name: parse_name(&self.name)?,
            amount: parse_amount(&self.amount)?,
            category: self.category,
            date: parse_date(&self.date)?,
        })
    }
}

/// Raw input for a partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDraft {
    /// Entered name.
    pub name: Option<String>,
    /// Entered amount, unparsed.
    pub amount: Option<String>,
    /// Selected category.
    pub category: Option<Category>,
    /// Entered date, unparsed.
    pub date: Option<String>,
}

impl PatchDraft {
    /// Validates the provided fields with the same rules as
    /// [`TransactionDraft::validate`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] among the provided fields.
    #[inline]
    pub fn validate(&self) -> Result<TransactionPatch, ValidationError> {
        Ok(TransactionPatch {
            name: self.name.as_deref().map(parse_name).transpose()?,
            amount: self.amount.as_deref().map(parse_amount).transpose()?,
            category: self.category,
            date: self.date.as_deref().map(parse_date).transpose()?,
        })
    }
}

impl From<TransactionDraft> for PatchDraft {
    #[inline]
    fn from(draft: TransactionDraft) -> Self {
        Self {
            name: Some(draft.name),
            amount: Some(draft.amount),
            category: Some(draft.category),
            date: Some(draft.date),
        }
    }
}

/// Trims the name and rejects empty input.
fn parse_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(trimmed.to_owned())
    }
}

/// Parses a finite decimal amount.
fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| ValidationError::InvalidAmount(raw.to_owned()))
}

/// Parses a `YYYY-MM-DD` calendar date.
fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_err| ValidationError::InvalidDate(raw.to_owned()))
}

//! Transaction model and request bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Category, TransactionId, UserId};

/// A spending record as stored by the server.
///
/// Records are immutable from the client's point of view; changes go
/// through an explicit update and the server's response replaces the
/// local copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-assigned identifier.
    pub id: TransactionId,
    /// Owning user, when echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Free-text label (e.g. "Coffee").
    pub name: String,
    /// Amount spent.
    pub amount: f64,
    /// Spending category.
    #[serde(default)]
    pub category: Category,
    /// Calendar date of the purchase (`YYYY-MM-DD`).
    pub date: NaiveDate,
}

/// Body of `POST /api/transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Free-text label.
    pub name: String,
    /// Amount spent.
    pub amount: f64,
    /// Spending category.
    pub category: Category,
    /// Calendar date.
    pub date: NaiveDate,
}

impl NewTransaction {
    /// Builds the record the server would return for this body.
    #[inline]
    #[must_use]
    pub fn into_transaction(self, id: TransactionId, user_id: Option<UserId>) -> Transaction {
        Transaction {
            id,
            user_id,
            name: self.name,
            amount: self.amount,
            category: self.category,
            date: self.date,
        }
    }
}

/// Body of `PATCH /api/transactions/{id}`: only the fields being changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// New label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// New date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl TransactionPatch {
    /// Returns `true` if no field is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
    }

    /// Drops every field whose value already matches `current`.
    #[must_use]
    pub fn without_unchanged(mut self, current: &Transaction) -> Self {
        if self.name.as_deref() == Some(current.name.as_str()) {
            self.name = None;
        }
        if self
            .amount
            .is_some_and(|amount| (amount - current.amount).abs() < f64::EPSILON)
        {
            self.amount = None;
        }
        if self.category == Some(current.category) {
            self.category = None;
        }
        if self.date == Some(current.date) {
            self.date = None;
        }
        self
    }

}

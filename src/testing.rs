//! In-memory stand-in for the Spender server, for unit tests.
//!
//! Emulates the server's observable behaviour: per-user, per-month
//! filtering, newest-first ordering, id assignment, 404 for unknown ids,
//! and per-category aggregation. Failures and per-month latency can be
//! injected to exercise error and race paths.

use core::time::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::backend::Backend;
use crate::error::{Operation, Result, SpenderError};
use crate::models::{
    CategoryBreakdownEntry, DashboardResponse, NewTransaction, Period, Transaction,
    TransactionId, TransactionPatch, UserId,
};

/// Fake backend with interior mutability.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    /// Server state.
    inner: Mutex<FakeInner>,
}

/// Server state behind the mutex.
#[derive(Debug, Default)]
struct FakeInner {
    /// Last assigned id.
    last_id: i64,
    /// Stored rows.
    rows: Vec<Transaction>,
    /// Operations that currently fail with a 500.
    failing: HashSet<Operation>,
    /// Artificial latency per month for list and dashboard calls.
    latency: HashMap<Period, Duration>,
    /// Artificial latency per operation, used when no month latency applies.
    op_latency: HashMap<Operation, Duration>,
    /// Number of calls per operation.
    calls: HashMap<Operation, usize>,
}

impl FakeBackend {
    /// Creates an empty fake server.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly, bypassing the API, and returns it.
    pub(crate) fn seed(&self, user: UserId, body: NewTransaction) -> Transaction {
        let mut inner = self.lock();
        inner.last_id += 1;
        let tx = body.into_transaction(TransactionId::new(inner.last_id), Some(user));
        inner.rows.push(tx.clone());
        tx
    }

    /// Deletes a row directly, as another client would.
    pub(crate) fn delete_behind_the_scenes(&self, id: TransactionId) {
        self.lock().rows.retain(|tx| tx.id != id);
    }

    /// Makes `operation` fail (or succeed again).
    pub(crate) fn set_failing(&self, operation: Operation, failing: bool) {
        let mut inner = self.lock();
        if failing {
            let _inserted = inner.failing.insert(operation);
        } else {
            let _removed = inner.failing.remove(&operation);
        }
    }

    /// Delays list and dashboard responses for `period`.
    pub(crate) fn set_latency(&self, period: Period, latency: Duration) {
        let _previous = self.lock().latency.insert(period, latency);
    }

    /// Delays every call of `operation` without a month-specific latency.
    pub(crate) fn set_call_latency(&self, operation: Operation, latency: Duration) {
        let _previous = self.lock().op_latency.insert(operation, latency);
    }

    /// Number of times `operation` was called.
    pub(crate) fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Acquires the state lock, recovering from poisoning.
    fn lock(&self) -> std::sync::MutexGuard<'_, FakeInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records a call and returns the configured latency and failure flag.
    fn begin(&self, operation: Operation, period: Option<Period>) -> (Option<Duration>, bool) {
        let mut inner = self.lock();
        *inner.calls.entry(operation).or_insert(0) += 1;
        let latency = period
            .and_then(|p| inner.latency.get(&p).copied())
            .or_else(|| inner.op_latency.get(&operation).copied());
        (latency, inner.failing.contains(&operation))
    }

    /// Waits out the configured latency, then fails if requested.
    async fn gate(&self, operation: Operation, period: Option<Period>) -> Result<()> {
        let (latency, failing) = self.begin(operation, period);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(SpenderError::Api {
                status: 500,
                message: format!("injected {operation} failure"),
            });
        }
        Ok(())
    }

    /// Rows visible to `user` in `period`, newest first.
    fn scoped(&self, user: UserId, period: Period) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .lock()
            .rows
            .iter()
            .filter(|tx| tx.user_id == Some(user) && period.contains(tx.date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }
}

/// Returns `current` with the fields set in `patch` overwritten, as the
/// server's partial update does.
fn patched(current: &Transaction, patch: &TransactionPatch) -> Transaction {
    Transaction {
        id: current.id,
        user_id: current.user_id,
        name: patch.name.clone().unwrap_or_else(|| current.name.clone()),
        amount: patch.amount.unwrap_or(current.amount),
        category: patch.category.unwrap_or(current.category),
        date: patch.date.unwrap_or(current.date),
    }
}

/// 404 as the server reports it.
fn not_found() -> SpenderError {
    SpenderError::Api {
        status: 404,
        message: "Transaction not found".to_owned(),
    }
}

impl Backend for FakeBackend {
    async fn list_transactions(&self, user: UserId, period: Period) -> Result<Vec<Transaction>> {
        // Rows are read on arrival; latency only delays the answer.
        let rows = self.scoped(user, period);
        self.gate(Operation::FetchTransactions, Some(period)).await?;
        Ok(rows)
    }

    async fn create_transaction(&self, user: UserId, body: &NewTransaction) -> Result<Transaction> {
        self.gate(Operation::AddTransaction, None).await?;
        Ok(self.seed(user, body.clone()))
    }

    async fn update_transaction(
        &self,
        user: UserId,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction> {
        self.gate(Operation::UpdateTransaction, None).await?;
        let mut inner = self.lock();
        let row = inner
            .rows
            .iter_mut()
            .find(|tx| tx.id == id && tx.user_id == Some(user))
            .ok_or_else(not_found)?;
        *row = patched(row, patch);
        Ok(row.clone())
    }

    async fn delete_transaction(&self, user: UserId, id: TransactionId) -> Result<()> {
        self.gate(Operation::DeleteTransaction, None).await?;
        let mut inner = self.lock();
        let before = inner.rows.len();
        inner
            .rows
            .retain(|tx| !(tx.id == id && tx.user_id == Some(user)));
        if inner.rows.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn dashboard(&self, user: UserId, period: Period) -> Result<DashboardResponse> {
        self.gate(Operation::FetchDashboard, Some(period)).await?;
        let mut breakdown: Vec<CategoryBreakdownEntry> = Vec::new();
        let mut total = 0.0;
        for tx in self.scoped(user, period) {
            total += tx.amount;
            let name = tx.category.as_str();
            match breakdown.iter_mut().find(|entry| entry.category == name) {
                Some(entry) => entry.amount += tx.amount,
                None => breakdown.push(CategoryBreakdownEntry {
                    category: name.to_owned(),
                    amount: tx.amount,
                }),
            }
        }
        Ok(DashboardResponse {
            total_spent: Some(total),
            category_breakdown: breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NaiveDate};

    #[test]
    fn patched_overwrites_only_set_fields() {
        let current = Transaction {
            id: TransactionId::new(1),
            user_id: Some(UserId::new(9)),
            name: "Coffee".to_owned(),
            amount: 4.5,
            category: Category::EatingOut,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        };
        let patch = TransactionPatch {
            name: Some("Latte".to_owned()),
            ..TransactionPatch::default()
        };
        let updated = patched(&current, &patch);
        assert_eq!(updated.name, "Latte");
        assert_eq!(updated.id, TransactionId::new(1));
        assert!((updated.amount - 4.5).abs() < f64::EPSILON);
        assert_eq!(updated.category, Category::EatingOut);
    }
}

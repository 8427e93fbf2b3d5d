//! Remote data source consumed by the transaction store and aggregator.
//!
//! [`Backend`] mirrors the REST surface one method per endpoint. The
//! production implementation is [`crate::client::SpenderClient`]; tests
//! substitute an in-memory fake.

use core::future::Future;

use crate::error::Result;
use crate::models::{
    DashboardResponse, NewTransaction, Period, Transaction, TransactionId, TransactionPatch,
    UserId,
};

/// Async access to the Spender REST API.
///
/// Every method is a suspension point: while it is pending the caller's
/// scope may change, so implementations must not assume the result is
/// still wanted when it resolves.
pub trait Backend: core::fmt::Debug + Send + Sync {
    /// Lists the user's transactions dated within `period`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    fn list_transactions(
        &self,
        user: UserId,
        period: Period,
    ) -> impl Future<Output = Result<Vec<Transaction>>> + Send;

    /// Creates a transaction and returns the stored record with its
    /// server-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    fn create_transaction(
        &self,
        user: UserId,
        body: &NewTransaction,
    ) -> impl Future<Output = Result<Transaction>> + Send;

    /// Applies `patch` to transaction `id` and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SpenderError::Api`] with status 404 if the
    /// server does not know the transaction, or any transport error.
    fn update_transaction(
        &self,
        user: UserId,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> impl Future<Output = Result<Transaction>> + Send;

    /// Deletes transaction `id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SpenderError::Api`] with status 404 if the
    /// server does not know the transaction, or any transport error.
    fn delete_transaction(
        &self,
        user: UserId,
        id: TransactionId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetches the per-category breakdown for `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    fn dashboard(
        &self,
        user: UserId,
        period: Period,
    ) -> impl Future<Output = Result<DashboardResponse>> + Send;
}

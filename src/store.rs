//! Period-scoped transaction collection.
//!
//! [`TransactionStore`] owns the transactions visible for the current
//! [`Scope`]. It replaces the whole collection on every settled fetch and
//! never mutates it before the server has confirmed a change: a failed
//! create, update or delete leaves the exact same snapshot in place.
//!
//! Each confirmed mutation publishes a [`RefreshEvent`] so the dashboard
//! aggregator re-derives its breakdown for the same scope.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::Backend;
use crate::error::{Operation, Result, SpenderError};
use crate::events::{RefreshEvent, RefreshPublisher};
use crate::models::{PatchDraft, Transaction, TransactionDraft, TransactionId};
use crate::scope::{FetchOutcome, FetchTicket, Scope, ScopeMark, ScopeTracker};

/// Mutable state guarded by the store's mutex.
#[derive(Debug)]
struct StoreState {
    /// Current scope and fetch ordering.
    tracker: ScopeTracker,
    /// Snapshot handed out by [`TransactionStore::list`].
    transactions: Arc<[Transaction]>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tracker: ScopeTracker::new(),
            transactions: empty(),
        }
    }
}

/// Owner of the transaction collection for one scope at a time.
///
/// Readers receive cheap [`Arc`] snapshots; every write funnels through
/// the methods below. The internal lock is never held across an
/// `.await`, so the store can be shared between concurrently polled
/// futures.
#[derive(Debug)]
pub struct TransactionStore<B> {
    /// Remote data source.
    backend: Arc<B>,
    /// Scope tracker and materialized collection.
    state: Mutex<StoreState>,
    /// Channel to the dashboard aggregator.
    events: RefreshPublisher,
}

impl<B: Backend> TransactionStore<B> {
    /// Creates an empty store without a scope.
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<B>, events: RefreshPublisher) -> Self {
        Self {
            backend,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    /// Scope currently selected, if any.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.with_state(|state| state.tracker.current())
    }

    /// Switches to `scope` and fetches its transactions.
    ///
    /// Selecting a different scope empties the collection immediately so
    /// no record of the previous scope remains visible while the new
    /// fetch is pending. Any fetch still in flight for another scope is
    /// discarded when it resolves.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::Sync`] if the fetch fails while `scope` is
    /// still current, or [`SpenderError::Auth`] if the server rejects the
    /// user.
    #[tracing::instrument(skip_all, fields(scope = %scope))]
    pub async fn set_scope(&self, scope: Scope) -> Result<FetchOutcome> {
        let ticket = self.with_state(|state| {
            if state.tracker.select(scope) {
                state.transactions = empty();
            }
            state.tracker.issue()
        });
        match ticket {
            Some(ticket) => self.fetch(ticket).await,
            None => Err(SpenderError::NotLoggedIn),
        }
    }

    /// Re-fetches the current scope.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::NotLoggedIn`] if no scope is selected, or
    /// the same errors as [`Self::set_scope`].
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let ticket = self
            .with_state(|state| state.tracker.issue())
            .ok_or(SpenderError::NotLoggedIn)?;
        self.fetch(ticket).await
    }

    /// Drops the scope and the collection; outstanding fetches become stale.
    #[inline]
    pub fn clear(&self) {
        self.with_state(|state| {
            state.tracker.clear();
            state.transactions = empty();
        });
    }

    /// Current snapshot of the collection, newest first.
    ///
    /// Empty before the first successful fetch of a scope.
    #[inline]
    #[must_use]
    pub fn list(&self) -> Arc<[Transaction]> {
        self.with_state(|state| Arc::clone(&state.transactions))
    }

    /// Looks up a transaction in the current collection.
    #[inline]
    #[must_use]
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.with_state(|state| state.transactions.iter().find(|tx| tx.id == id).cloned())
    }

    /// Sum of amounts in the current collection.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.with_state(|state| state.transactions.iter().map(|tx| tx.amount).sum())
    }

    /// Returns `true` while a fetch for the current scope is unresolved.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.with_state(|state| state.tracker.is_pending())
    }

    /// Validates `draft`, creates it on the server and re-fetches the scope.
    ///
    /// If the follow-up fetch fails, the confirmed record is appended
    /// locally instead, provided its date lies in the active period.
    ///
    /// # Errors
    ///
    /// - [`SpenderError::Validation`] before any network call.
    /// - [`SpenderError::NotLoggedIn`] without a scope.
    /// - [`SpenderError::Sync`] if the create request fails; the
    ///   collection is left unchanged.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, draft: &TransactionDraft) -> Result<Transaction> {
        let body = draft.validate()?;
        let mark = self.mark()?;
        let scope = mark.scope();

        let created = self
            .backend
            .create_transaction(scope.user, &body)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "create failed");
                err.into_sync(Operation::AddTransaction)
            })?;
        tracing::debug!(id = %created.id, "transaction created");
        self.notify(scope, Operation::AddTransaction);

        let ticket = self.with_state(|state| {
            if state.tracker.confirm_mutation(mark) {
                state.tracker.issue()
            } else {
                tracing::debug!(%scope, "scope changed during create; re-fetch skipped");
                None
            }
        });
        if let Some(ticket) = ticket
            && let Err(err) = self.fetch(ticket).await
        {
            tracing::warn!(error = %err, "re-fetch after create failed; appending locally");
            self.append_confirmed(scope, &created);
        }
        Ok(created)
    }

    /// Applies the fields set in `patch` to transaction `id`.
    ///
    /// Fields equal to the current record are not sent. If nothing is
    /// left to change the current record is returned without a request.
    /// On success the server's record replaces the local one; it is
    /// dropped instead when its new date moved it out of the period.
    ///
    /// # Errors
    ///
    /// - [`SpenderError::NotFound`] if `id` is not in the collection or
    ///   the server no longer knows it; a refresh is forced first.
    /// - [`SpenderError::Validation`] for malformed fields.
    /// - [`SpenderError::Sync`] if the request fails; the collection
    ///   snapshot is left untouched.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn update(&self, id: TransactionId, patch: &PatchDraft) -> Result<Transaction> {
        let mark = self.mark()?;
        let scope = mark.scope();
        let Some(current) = self.get(id) else {
            return Err(self.missing(id).await);
        };
        let changes = patch.validate()?.without_unchanged(&current);
        if changes.is_empty() {
            tracing::debug!("nothing changed; update skipped");
            return Ok(current);
        }

        let updated = match self
            .backend
            .update_transaction(scope.user, id, &changes)
            .await
        {
            Ok(updated) => updated,
            Err(err) if is_not_found(&err) => return Err(self.missing(id).await),
            Err(err) => {
                tracing::warn!(error = %err, "update failed");
                return Err(err.into_sync(Operation::UpdateTransaction));
            }
        };

        self.with_state(|state| {
            if !state.tracker.confirm_mutation(mark) {
                tracing::debug!(%scope, "scope changed during update; local copy untouched");
                return;
            }
            let next: Vec<Transaction> = if scope.period.contains(updated.date) {
                state
                    .transactions
                    .iter()
                    .map(|tx| if tx.id == id { updated.clone() } else { tx.clone() })
                    .collect()
            } else {
                tracing::debug!(date = %updated.date, "updated record left the period");
                state
                    .transactions
                    .iter()
                    .filter(|tx| tx.id != id)
                    .cloned()
                    .collect()
            };
            state.transactions = next.into();
        });
        self.notify(scope, Operation::UpdateTransaction);
        Ok(updated)
    }

    /// Deletes transaction `id` and removes it locally once confirmed.
    ///
    /// Fetches issued before the delete are discarded when they resolve,
    /// since they may still contain the record.
    ///
    /// # Errors
    ///
    /// - [`SpenderError::NotFound`] if `id` is not in the collection or
    ///   the server no longer knows it; a refresh is forced first.
    /// - [`SpenderError::Sync`] if the request fails; the record stays
    ///   and the delete can be retried.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn remove(&self, id: TransactionId) -> Result<()> {
        let mark = self.mark()?;
        let scope = mark.scope();
        if self.get(id).is_none() {
            return Err(self.missing(id).await);
        }

        match self.backend.delete_transaction(scope.user, id).await {
            Ok(()) => {}
            Err(err) if is_not_found(&err) => return Err(self.missing(id).await),
            Err(err) => {
                tracing::warn!(error = %err, "delete failed");
                return Err(err.into_sync(Operation::DeleteTransaction));
            }
        }

        self.with_state(|state| {
            if state.tracker.confirm_mutation(mark) {
                let next: Vec<Transaction> = state
                    .transactions
                    .iter()
                    .filter(|tx| tx.id != id)
                    .cloned()
                    .collect();
                state.transactions = next.into();
            } else {
                tracing::debug!(%scope, "scope changed during delete; local copy untouched");
            }
        });
        self.notify(scope, Operation::DeleteTransaction);
        Ok(())
    }

    /// Resolves `ticket` against the backend and applies the result if
    /// the ticket is still the newest one for the current scope.
    async fn fetch(&self, ticket: FetchTicket) -> Result<FetchOutcome> {
        let scope = ticket.scope();
        tracing::trace!(%scope, "fetching transactions");
        let result = self
            .backend
            .list_transactions(scope.user, scope.period)
            .await;

        self.with_state(|state| {
            if !state.tracker.settle(ticket) {
                tracing::debug!(
                    issued_for = %scope,
                    current = ?state.tracker.current(),
                    "discarding stale transaction response"
                );
                return Ok(FetchOutcome::Stale);
            }
            match result {
                Ok(mut transactions) => {
                    dedup_by_id(&mut transactions);
                    tracing::debug!(%scope, count = transactions.len(), "transactions applied");
                    state.transactions = transactions.into();
                    Ok(FetchOutcome::Applied)
                }
                Err(err) => {
                    tracing::warn!(%scope, error = %err, "transaction fetch failed");
                    Err(err.into_sync(Operation::FetchTransactions))
                }
            }
        })
    }

    /// Inserts a server-confirmed record in date order, unless the scope
    /// changed, the date falls outside the period or the id is present.
    fn append_confirmed(&self, scope: Scope, created: &Transaction) {
        self.with_state(|state| {
            if state.tracker.current() != Some(scope)
                || !scope.period.contains(created.date)
                || state.transactions.iter().any(|tx| tx.id == created.id)
            {
                return;
            }
            let mut next = state.transactions.to_vec();
            let at = next.partition_point(|tx| tx.date >= created.date);
            next.insert(at, created.clone());
            state.transactions = next.into();
        });
    }

    /// Marks the current scope before a mutation is sent.
    fn mark(&self) -> Result<ScopeMark> {
        self.with_state(|state| state.tracker.mark())
            .ok_or(SpenderError::NotLoggedIn)
    }

    /// Forces a refresh after a stale-id access and builds the error.
    async fn missing(&self, id: TransactionId) -> SpenderError {
        tracing::warn!(id = %id, "transaction missing; forcing refresh");
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "forced refresh failed");
        }
        SpenderError::NotFound(id)
    }

    /// Publishes a refresh for `scope`.
    fn notify(&self, scope: Scope, cause: Operation) {
        let _delivered = self.events.publish(RefreshEvent { scope, cause });
    }

    /// Runs `op` with the state locked.
    fn with_state<R, F: FnOnce(&mut StoreState) -> R>(&self, op: F) -> R {
        let mut guard: MutexGuard<'_, StoreState> =
            self.state.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut guard)
    }
}

/// Empty collection snapshot.
fn empty() -> Arc<[Transaction]> {
    Arc::from(Vec::new())
}

/// Returns `true` for the server's "no such transaction" answer.
const fn is_not_found(err: &SpenderError) -> bool {
    matches!(*err, SpenderError::Api { status: 404, .. })
}

/// Keeps the first occurrence of every id.
fn dedup_by_id(transactions: &mut Vec<Transaction>) {
    let mut seen: Vec<TransactionId> = Vec::with_capacity(transactions.len());
    transactions.retain(|tx| {
        if seen.contains(&tx.id) {
            tracing::warn!(id = %tx.id, "duplicate transaction id in response");
            false
        } else {
            seen.push(tx.id);
            true
        }
    });
}

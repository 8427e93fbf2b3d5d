//! Coordinator tying the session, period filter, transaction store,
//! aggregator and edit session together.
//!
//! [`Dashboard`] is what a presentation layer talks to. Changing the
//! period (or the user) re-fetches the transaction list and the category
//! breakdown in parallel; each applies its own result independently and
//! discards it if the scope moved on meanwhile. Every confirmed mutation
//! is followed by a breakdown refresh for the same scope before the call
//! returns, so the chart and the table agree once both have settled.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::aggregator::{BreakdownStatus, DashboardAggregator};
use crate::backend::Backend;
use crate::edit::{EditSession, EditState};
use crate::error::{Result, SpenderError};
use crate::events::{RefreshReceiver, drain_pending, refresh_channel};
use crate::models::{
    CategoryBreakdownEntry, PatchDraft, Period, Transaction, TransactionDraft, TransactionId, User,
};
use crate::scope::{FetchOutcome, Scope};
use crate::session::Session;
use crate::store::TransactionStore;

/// Outcome of loading a scope into both views.
///
/// The two fetches are independent: one may fail while the other is
/// applied.
#[derive(Debug)]
pub struct ScopeLoad {
    /// Result of the transaction list fetch.
    pub transactions: Result<FetchOutcome>,
    /// Result of the breakdown fetch.
    pub dashboard: Result<FetchOutcome>,
}

impl ScopeLoad {
    /// Collapses both results, returning the first error.
    ///
    /// # Errors
    ///
    /// Returns the transaction fetch error if any, otherwise the
    /// breakdown fetch error.
    #[inline]
    pub fn into_result(self) -> Result<()> {
        let _transactions = self.transactions?;
        let _dashboard = self.dashboard?;
        Ok(())
    }
}

/// Point-in-time view for rendering.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    /// Selected period.
    pub period: Period,
    /// Signed-in user, if any.
    pub user: Option<User>,
    /// Transactions of the current scope, newest first.
    pub transactions: Arc<[Transaction]>,
    /// Sum of the listed amounts.
    pub total: f64,
    /// Chartable categories.
    pub breakdown: Vec<CategoryBreakdownEntry>,
    /// What the chart should display.
    pub chart: BreakdownStatus,
    /// `true` while the transaction list is being fetched.
    pub loading: bool,
    /// Edit session state.
    pub edit: EditState,
}

/// Resets the in-flight submission flag when the submit future ends,
/// including when it is dropped mid-flight.
#[derive(Debug)]
struct SubmitGuard<'flag>(&'flag AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Application-facing dashboard state.
#[derive(Debug)]
pub struct Dashboard<B> {
    /// Signed-in user, if any.
    session: Mutex<Option<Session>>,
    /// Selected month.
    period: Mutex<Period>,
    /// Transaction collection for the current scope.
    store: TransactionStore<B>,
    /// Category breakdown for the current scope.
    aggregator: DashboardAggregator<B>,
    /// The collection's single edit session.
    edit: Mutex<EditSession>,
    /// Refresh events published by the store.
    events: Mutex<RefreshReceiver>,
    /// Set while a create submission is in flight.
    submitting: AtomicBool,
}

impl<B: Backend> Dashboard<B> {
    /// Creates a dashboard showing `period`. Nothing is fetched until
    /// [`Self::load`] or [`Self::select_period`] is called.
    #[must_use]
    pub fn new(backend: Arc<B>, session: Option<Session>, period: Period) -> Self {
        let (publisher, receiver) = refresh_channel();
        Self {
            session: Mutex::new(session),
            period: Mutex::new(period),
            store: TransactionStore::new(Arc::clone(&backend), publisher),
            aggregator: DashboardAggregator::new(backend),
            edit: Mutex::new(EditSession::new()),
            events: Mutex::new(receiver),
            submitting: AtomicBool::new(false),
        }
    }

    /// Transaction store backing the table.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &TransactionStore<B> {
        &self.store
    }

    /// Aggregator backing the chart.
    #[inline]
    #[must_use]
    pub const fn aggregator(&self) -> &DashboardAggregator<B> {
        &self.aggregator
    }

    /// Selected period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Period {
        *lock(&self.period)
    }

    /// Current session, if signed in.
    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    /// Scope derived from the session and the selected period.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        let period = self.period();
        lock(&self.session)
            .as_ref()
            .map(|session| session.scope(period))
    }

    /// Loads the current scope into both views.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::NotLoggedIn`] without a session. Fetch
    /// failures are reported per view in [`ScopeLoad`].
    pub async fn load(&self) -> Result<ScopeLoad> {
        let scope = self.scope().ok_or(SpenderError::NotLoggedIn)?;
        Ok(self.load_scope(scope).await)
    }

    /// Selects `period` and loads it into both views.
    ///
    /// The period is remembered even without a session.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::NotLoggedIn`] without a session.
    #[tracing::instrument(skip_all, fields(period = %period))]
    pub async fn select_period(&self, period: Period) -> Result<ScopeLoad> {
        *lock(&self.period) = period;
        self.load().await
    }

    /// Replaces the session (sign-in or user switch) and loads its scope.
    ///
    /// Any edit in progress belongs to the previous user and is dropped.
    pub async fn start_session(&self, session: Session) -> ScopeLoad {
        let scope = session.scope(self.period());
        *lock(&self.session) = Some(session);
        *lock(&self.edit) = EditSession::new();
        self.load_scope(scope).await
    }

    /// Ends the session: both views discard their data, outstanding
    /// fetches become stale and the edit session is reset.
    ///
    /// Returns the ended session so the caller can forget it in storage.
    pub fn logout(&self) -> Option<Session> {
        let session = lock(&self.session).take();
        self.store.clear();
        self.aggregator.clear();
        *lock(&self.edit) = EditSession::new();
        let _discarded = drain_pending(&mut lock(&self.events));
        session
    }

    /// Validates and submits the add form.
    ///
    /// Only one submission may be in flight at a time.
    ///
    /// # Errors
    ///
    /// - [`SpenderError::DuplicateSubmission`] while another submit runs.
    /// - Any error of [`TransactionStore::create`].
    #[tracing::instrument(skip_all)]
    pub async fn submit(&self, draft: &TransactionDraft) -> Result<Transaction> {
        if self.submitting.swap(true, Ordering::AcqRel) {
            tracing::debug!("submission already in flight");
            return Err(SpenderError::DuplicateSubmission);
        }
        let _guard = SubmitGuard(&self.submitting);

        let created = self.store.create(draft).await?;
        self.pump_refreshes().await;
        self.reconcile_edit();
        Ok(created)
    }

    /// Starts editing transaction `id`.
    ///
    /// Returns `Ok(false)` if another edit is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::NotFound`] if `id` is not listed; the
    /// collection is refreshed first.
    pub async fn begin_edit(&self, id: TransactionId) -> Result<bool> {
        if let Some(tx) = self.store.get(id) {
            return Ok(lock(&self.edit).begin(&tx));
        }
        tracing::warn!(id = %id, "edit requested for unknown transaction");
        if let Err(err) = self.store.refresh().await {
            tracing::warn!(error = %err, "forced refresh failed");
        }
        self.reconcile_edit();
        Err(SpenderError::NotFound(id))
    }

    /// Changes the draft of the active edit. Returns `false` if nothing
    /// is being edited.
    pub fn update_draft<F: FnOnce(&mut TransactionDraft)>(&self, change: F) -> bool {
        let mut edit = lock(&self.edit);
        edit.draft_mut().map(change).is_some()
    }

    /// Discards the active edit.
    #[inline]
    pub fn cancel_edit(&self) -> bool {
        lock(&self.edit).cancel()
    }

    /// Current edit state.
    #[inline]
    #[must_use]
    pub fn edit_state(&self) -> EditState {
        lock(&self.edit).state().clone()
    }

    /// Saves the active edit.
    ///
    /// Returns `Ok(None)` if nothing is being edited. On failure the
    /// session stays in editing with the draft intact and the error
    /// attached, unless the target no longer exists.
    ///
    /// # Errors
    ///
    /// Any error of [`TransactionStore::update`].
    #[tracing::instrument(skip_all)]
    pub async fn save_edit(&self) -> Result<Option<Transaction>> {
        let Some((target, draft)) = lock(&self.edit).start_save() else {
            return Ok(None);
        };

        match self.store.update(target, &PatchDraft::from(draft)).await {
            Ok(updated) => {
                lock(&self.edit).complete(target, Ok(()));
                self.pump_refreshes().await;
                Ok(Some(updated))
            }
            Err(err @ SpenderError::NotFound(_)) => {
                let _reset = lock(&self.edit).invalidate(target);
                Err(err)
            }
            Err(err) => {
                lock(&self.edit).complete(target, Err(err.to_string()));
                Err(err)
            }
        }
    }

    /// Deletes transaction `id`, resetting the edit session if it
    /// targeted it.
    ///
    /// # Errors
    ///
    /// Any error of [`TransactionStore::remove`]. On
    /// [`SpenderError::NotFound`] the collection has been refreshed and
    /// an edit of a vanished record is reset.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: TransactionId) -> Result<()> {
        match self.store.remove(id).await {
            Ok(()) => {
                let _reset = lock(&self.edit).invalidate(id);
                self.pump_refreshes().await;
                Ok(())
            }
            Err(err) => {
                self.reconcile_edit();
                Err(err)
            }
        }
    }

    /// Consistent view for rendering.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            period: self.period(),
            user: lock(&self.session).as_ref().map(|s| s.user().clone()),
            transactions: self.store.list(),
            total: self.store.total(),
            breakdown: self.aggregator.breakdown(),
            chart: self.aggregator.status(),
            loading: self.store.is_loading(),
            edit: self.edit_state(),
        }
    }

    /// Fetches both views for `scope` concurrently.
    async fn load_scope(&self, scope: Scope) -> ScopeLoad {
        // The fresh breakdown fetch covers anything queued so far.
        let _covered = drain_pending(&mut lock(&self.events));
        let (transactions, dashboard) =
            tokio::join!(self.store.set_scope(scope), self.aggregator.refresh(scope));
        self.reconcile_edit();
        ScopeLoad {
            transactions,
            dashboard,
        }
    }

    /// Lets the aggregator handle every queued refresh event.
    async fn pump_refreshes(&self) {
        let pending = drain_pending(&mut lock(&self.events));
        for event in pending {
            if let Err(err) = self.aggregator.handle(event).await {
                tracing::warn!(error = %err, "breakdown refresh after mutation failed");
            }
        }
    }

    /// Resets the edit session if its target left the collection.
    fn reconcile_edit(&self) {
        let _reset = lock(&self.edit).retain_existing(|id| self.store.get(id).is_some());
    }
}

/// Locks `mutex`, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

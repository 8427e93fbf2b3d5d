//! Category breakdown for the selected scope.
//!
//! [`DashboardAggregator`] fetches the server-side aggregation for a
//! scope and exposes only the entries the chart should draw. It follows
//! the same ticketed stale-response suppression as the transaction
//! store, and it re-fetches whenever a [`RefreshEvent`] arrives for the
//! scope it is showing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::Backend;
use crate::error::{Operation, Result, SpenderError};
use crate::events::{RefreshEvent, RefreshReceiver};
use crate::models::CategoryBreakdownEntry;
use crate::scope::{FetchOutcome, FetchTicket, Scope, ScopeTracker};

/// What the chart should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownStatus {
    /// No fetch for the current scope has settled yet.
    Loading,
    /// The scope has positive spending to chart.
    Ready,
    /// The scope has no positive spending, or the last fetch failed.
    NoData,
}

/// Mutable state guarded by the aggregator's mutex.
#[derive(Debug, Default)]
struct AggregatorState {
    /// Current scope and fetch ordering.
    tracker: ScopeTracker,
    /// Raw entries for the current scope; `None` until a fetch succeeds.
    entries: Option<Vec<CategoryBreakdownEntry>>,
}

/// Owner of the category breakdown for one scope at a time.
#[derive(Debug)]
pub struct DashboardAggregator<B> {
    /// Remote data source.
    backend: Arc<B>,
    /// Scope tracker and breakdown.
    state: Mutex<AggregatorState>,
}

impl<B: Backend> DashboardAggregator<B> {
    /// Creates an aggregator without a scope.
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Mutex::new(AggregatorState::default()),
        }
    }

    /// Scope currently selected, if any.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.with_state(|state| state.tracker.current())
    }

    /// Fetches the breakdown for `scope`, making it current.
    ///
    /// A breakdown computed for a different scope is discarded
    /// immediately. If the fetch fails the aggregator reports no data.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::Sync`] if the fetch fails while `scope` is
    /// still current, or [`SpenderError::Auth`] if the server rejects the
    /// user.
    #[tracing::instrument(skip_all, fields(scope = %scope))]
    pub async fn refresh(&self, scope: Scope) -> Result<FetchOutcome> {
        let ticket = self.with_state(|state| {
            if state.tracker.select(scope) {
                state.entries = None;
            }
            state.tracker.issue()
        });
        match ticket {
            Some(ticket) => self.fetch(ticket).await,
            None => Err(SpenderError::NotLoggedIn),
        }
    }

    /// Handles a mutation notice from the transaction store.
    ///
    /// Events for any scope other than the current one are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Self::refresh`].
    #[tracing::instrument(skip_all, fields(scope = %event.scope, cause = %event.cause))]
    pub async fn handle(&self, event: RefreshEvent) -> Result<FetchOutcome> {
        let ticket = self.with_state(|state| {
            if state.tracker.current() == Some(event.scope) {
                state.tracker.issue()
            } else {
                None
            }
        });
        match ticket {
            Some(ticket) => self.fetch(ticket).await,
            None => {
                tracing::debug!("refresh event for inactive scope ignored");
                Ok(FetchOutcome::Stale)
            }
        }
    }

    /// Consumes refresh events until every publisher is dropped.
    ///
    /// Failures are logged and the loop continues; the next mutation or
    /// scope change retries naturally.
    pub async fn follow(&self, events: &mut RefreshReceiver) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle(event).await {
                tracing::warn!(error = %err, "dashboard refresh failed");
            }
        }
        tracing::debug!("refresh channel closed");
    }

    /// Drops the scope and the breakdown.
    #[inline]
    pub fn clear(&self) {
        self.with_state(|state| {
            state.tracker.clear();
            state.entries = None;
        });
    }

    /// Entries to chart: only finite, strictly positive amounts, in
    /// server order.
    #[inline]
    #[must_use]
    pub fn breakdown(&self) -> Vec<CategoryBreakdownEntry> {
        self.with_state(|state| {
            state
                .entries
                .iter()
                .flatten()
                .filter(|entry| is_visible(entry))
                .cloned()
                .collect()
        })
    }

    /// Sum of the visible entries.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.breakdown().iter().map(|entry| entry.amount).sum()
    }

    /// Returns `true` if there is anything to chart.
    #[inline]
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.with_state(|state| state.entries.iter().flatten().any(is_visible))
    }

    /// What the chart should display right now.
    #[inline]
    #[must_use]
    pub fn status(&self) -> BreakdownStatus {
        self.with_state(|state| match state.entries.as_deref() {
            None if state.tracker.is_pending() => BreakdownStatus::Loading,
            Some(entries) if entries.iter().any(is_visible) => BreakdownStatus::Ready,
            None | Some(_) => BreakdownStatus::NoData,
        })
    }

    /// Resolves `ticket` against the backend and applies the result if
    /// it is still the newest for the current scope.
    async fn fetch(&self, ticket: FetchTicket) -> Result<FetchOutcome> {
        let scope = ticket.scope();
        tracing::trace!(%scope, "fetching dashboard");
        let result = self.backend.dashboard(scope.user, scope.period).await;

        self.with_state(|state| {
            if !state.tracker.settle(ticket) {
                tracing::debug!(
                    issued_for = %scope,
                    current = ?state.tracker.current(),
                    "discarding stale dashboard response"
                );
                return Ok(FetchOutcome::Stale);
            }
            match result {
                Ok(response) => {
                    if let Some(reported) = response.total_spent {
                        tracing::trace!(reported, "server-reported total");
                    }
                    tracing::debug!(
                        %scope,
                        categories = response.category_breakdown.len(),
                        "dashboard applied"
                    );
                    state.entries = Some(response.category_breakdown);
                    Ok(FetchOutcome::Applied)
                }
                Err(err) => {
                    tracing::warn!(%scope, error = %err, "dashboard fetch failed");
                    state.entries = None;
                    Err(err.into_sync(Operation::FetchDashboard))
                }
            }
        })
    }

    /// Runs `op` with the state locked.
    fn with_state<R, F: FnOnce(&mut AggregatorState) -> R>(&self, op: F) -> R {
        let mut guard: MutexGuard<'_, AggregatorState> =
            self.state.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut guard)
    }
}

/// Chart boundary: zero, negative and non-finite amounts are hidden.
fn is_visible(entry: &CategoryBreakdownEntry) -> bool {
    entry.amount.is_finite() && entry.amount > 0.0
}

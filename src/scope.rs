//! Data scope and stale-response suppression.
//!
//! Every fetch is issued against a [`FetchTicket`] that records the
//! scope and a monotonically increasing serial. When the response
//! arrives it is applied only if [`ScopeTracker::settle`] accepts the
//! ticket: the scope must still be current and no newer fetch may have
//! settled in the meantime. A slow response for March therefore can
//! never overwrite a faster one for April.
//!
//! Mutations take a [`ScopeMark`] before their request goes out. Once the
//! server confirms, [`ScopeTracker::confirm_mutation`] retires every
//! ticket still outstanding, so a list fetched before a delete cannot
//! bring the deleted row back.

use core::fmt;

use crate::models::{Period, UserId};

/// The `(user, period)` pair that determines which data is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Signed-in user.
    pub user: UserId,
    /// Selected month.
    pub period: Period,
}

impl Scope {
    /// Creates a scope.
    #[inline]
    #[must_use]
    pub const fn new(user: UserId, period: Period) -> Self {
        Self { user, period }
    }
}

impl fmt::Display for Scope {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {} / {}", self.user, self.period)
    }
}

/// Result of a fetch that completed without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response matched the current scope and replaced local state.
    Applied,
    /// The scope changed (or a newer fetch settled) while the request
    /// was in flight; the response was discarded.
    Stale,
}

impl FetchOutcome {
    /// Returns `true` if the response was applied.
    #[inline]
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Token captured when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    /// Scope the request was issued for.
    scope: Scope,
    /// Issue order; higher is newer.
    serial: u64,
}

impl FetchTicket {
    /// Scope the request was issued for.
    #[inline]
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }
}

/// Scope selection captured when a mutation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMark {
    /// Scope the mutation targets.
    scope: Scope,
    /// Selection count at the time of the mark.
    selection: u64,
}

impl ScopeMark {
    /// Scope the mutation targets.
    #[inline]
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }
}

/// Tracks the current scope and which fetch last settled for it.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    /// Scope currently selected, if any.
    current: Option<Scope>,
    /// Number of scope changes so far.
    selection: u64,
    /// Serial handed to the most recently issued ticket.
    issued: u64,
    /// Serial of the most recently settled ticket.
    settled: u64,
}

impl ScopeTracker {
    /// Creates a tracker with no scope.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope currently selected.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> Option<Scope> {
        self.current
    }

    /// Selects `scope`. Returns `true` if it differs from the previous one.
    #[inline]
    pub fn select(&mut self, scope: Scope) -> bool {
        let changed = self.current != Some(scope);
        if changed {
            self.selection = self.selection.saturating_add(1);
        }
        self.current = Some(scope);
        changed
    }

    /// Drops the current scope; every outstanding ticket becomes stale.
    #[inline]
    pub const fn clear(&mut self) {
        self.current = None;
    }

    /// Issues a ticket for the current scope, or `None` without one.
    #[inline]
    pub fn issue(&mut self) -> Option<FetchTicket> {
        let scope = self.current?;
        self.issued = self.issued.saturating_add(1);
        Some(FetchTicket {
            scope,
            serial: self.issued,
        })
    }

    /// Marks `ticket` as resolved. Returns `true` if its result should
    /// be applied, `false` if it is stale.
    #[inline]
    pub fn settle(&mut self, ticket: FetchTicket) -> bool {
        if self.current != Some(ticket.scope) || ticket.serial <= self.settled {
            return false;
        }
        self.settled = ticket.serial;
        true
    }

    /// Marks the current scope at the start of a mutation.
    #[inline]
    #[must_use]
    pub fn mark(&self) -> Option<ScopeMark> {
        self.current.map(|scope| ScopeMark {
            scope,
            selection: self.selection,
        })
    }

    /// Records a server-confirmed mutation taken under `mark`.
    ///
    /// Returns `true` if the marked scope stayed selected throughout, in
    /// which case every outstanding ticket becomes stale and the caller
    /// may apply the change locally. Returns `false` if the scope changed
    /// in the meantime, even if it was selected again since.
    #[inline]
    pub fn confirm_mutation(&mut self, mark: ScopeMark) -> bool {
        if self.current != Some(mark.scope) || self.selection != mark.selection {
            return false;
        }
        self.settled = self.issued;
        true
    }

    /// Returns `true` while a ticket issued for the current scope has
    /// not settled yet.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.current.is_some() && self.issued > self.settled
    }
}

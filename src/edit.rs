//! In-place edit state machine.
//!
//! ```text
//! Idle --begin--> Editing --start_save--> Saving --complete(Ok)--> Idle
//!                   |  ^                     |
//!                 cancel +---complete(Err)---+
//!                   v
//!                  Idle
//! ```
//!
//! At most one transaction is edited at a time: [`EditSession::begin`]
//! is a no-op unless the session is idle. If the target disappears from
//! the collection the session is forced back to idle.

use core::mem;

use crate::models::{Transaction, TransactionDraft, TransactionId};

/// State of an [`EditSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    /// No transaction is being edited.
    #[default]
    Idle,
    /// The user is changing `draft`.
    Editing {
        /// Transaction being edited.
        target: TransactionId,
        /// User's unsaved input.
        draft: TransactionDraft,
        /// Error from the last failed save, shown next to the form.
        error: Option<String>,
    },
    /// An update request is in flight.
    Saving {
        /// Transaction being saved.
        target: TransactionId,
        /// Input being saved; restored if the save fails.
        draft: TransactionDraft,
    },
}

/// The single edit session of a transaction collection.
#[derive(Debug, Default)]
pub struct EditSession {
    /// Current state.
    state: EditState,
}

impl EditSession {
    /// Creates an idle session.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &EditState {
        &self.state
    }

    /// Returns `true` if nothing is being edited.
    #[inline]
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, EditState::Idle)
    }

    /// Transaction being edited or saved.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> Option<TransactionId> {
        match self.state {
            EditState::Idle => None,
            EditState::Editing { target, .. } | EditState::Saving { target, .. } => Some(target),
        }
    }

    /// The user's input, in either editing or saving state.
    #[inline]
    #[must_use]
    pub const fn draft(&self) -> Option<&TransactionDraft> {
        match &self.state {
            EditState::Idle => None,
            EditState::Editing { draft, .. } | EditState::Saving { draft, .. } => Some(draft),
        }
    }

    /// Mutable access to the draft; only while editing.
    #[inline]
    pub const fn draft_mut(&mut self) -> Option<&mut TransactionDraft> {
        match &mut self.state {
            EditState::Editing { draft, .. } => Some(draft),
            EditState::Idle | EditState::Saving { .. } => None,
        }
    }

    /// Error left by the last failed save.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { error, .. } => error.as_deref(),
            EditState::Idle | EditState::Saving { .. } => None,
        }
    }

    /// Starts editing `tx`, seeding the draft from it.
    ///
    /// Returns `false` and changes nothing if another edit is active.
    pub fn begin(&mut self, tx: &Transaction) -> bool {
        if !self.is_idle() {
            tracing::debug!(id = %tx.id, active = ?self.target(), "edit already in progress");
            return false;
        }
        self.state = EditState::Editing {
            target: tx.id,
            draft: TransactionDraft::from_transaction(tx),
            error: None,
        };
        true
    }

    /// Moves from editing to saving and hands out what to send.
    ///
    /// Returns `None` unless the session is editing.
    pub fn start_save(&mut self) -> Option<(TransactionId, TransactionDraft)> {
        match mem::take(&mut self.state) {
            EditState::Editing { target, draft, .. } => {
                self.state = EditState::Saving {
                    target,
                    draft: draft.clone(),
                };
                Some((target, draft))
            }
            other @ (EditState::Idle | EditState::Saving { .. }) => {
                self.state = other;
                None
            }
        }
    }

    /// Finishes the save of `target`.
    ///
    /// Success returns to idle. Failure returns to editing with the
    /// user's draft intact and `message` attached. A completion for a
    /// session that was meanwhile invalidated is ignored.
    pub fn complete(&mut self, target: TransactionId, outcome: Result<(), String>) {
        match mem::take(&mut self.state) {
            EditState::Saving { target: saving, draft } if saving == target => {
                if let Err(message) = outcome {
                    self.state = EditState::Editing {
                        target,
                        draft,
                        error: Some(message),
                    };
                }
            }
            other => self.state = other,
        }
    }

    /// Discards the draft without saving.
    ///
    /// Returns `false` unless the session was editing.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, EditState::Editing { .. }) {
            self.state = EditState::Idle;
            true
        } else {
            false
        }
    }

    /// Forces the session idle if it targets `id`.
    pub fn invalidate(&mut self, id: TransactionId) -> bool {
        if self.target() == Some(id) {
            tracing::debug!(id = %id, "edit target removed; session reset");
            self.state = EditState::Idle;
            true
        } else {
            false
        }
    }

    /// Forces the session idle if its target no longer exists.
    pub fn retain_existing<F: FnOnce(TransactionId) -> bool>(&mut self, exists: F) -> bool {
        match self.target() {
            Some(id) if !exists(id) => self.invalidate(id),
            Some(_) | None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NaiveDate};

    fn tx(id: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            user_id: None,
            name: "Shoes".to_owned(),
            amount: 60.0,
            category: Category::Shopping,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        }
    }

    #[test]
    fn begin_seeds_draft() {
        let mut session = EditSession::new();
        assert!(session.begin(&tx(1)));
        assert_eq!(session.target(), Some(TransactionId::new(1)));
        assert_eq!(session.draft().unwrap().amount, "60");
        assert_eq!(session.draft().unwrap().date, "2025-03-10");
    }

    #[test]
    fn only_one_edit_at_a_time() {
        let mut session = EditSession::new();
        assert!(session.begin(&tx(1)));
        assert!(!session.begin(&tx(2)));
        assert_eq!(session.target(), Some(TransactionId::new(1)));
    }

    #[test]
    fn successful_save_returns_to_idle() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        session.draft_mut().unwrap().name = "Boots".to_owned();

        let (target, draft) = session.start_save().unwrap();
        assert_eq!(draft.name, "Boots");
        assert!(matches!(session.state(), EditState::Saving { .. }));
        assert!(session.draft_mut().is_none());
        assert!(!session.begin(&tx(2)));

        session.complete(target, Ok(()));
        assert!(session.is_idle());
    }

    #[test]
    fn failed_save_keeps_draft_and_error() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        session.draft_mut().unwrap().amount = "75".to_owned();

        let (target, _draft) = session.start_save().unwrap();
        session.complete(target, Err("failed to update transactions".to_owned()));
        assert_eq!(session.error(), Some("failed to update transactions"));
        assert_eq!(session.draft().unwrap().amount, "75");
        assert_eq!(session.target(), Some(target));
    }

    #[test]
    fn cancel_discards_draft() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        assert!(session.cancel());
        assert!(session.is_idle());
        assert!(!session.cancel());
    }

    #[test]
    fn start_save_requires_editing() {
        let mut session = EditSession::new();
        assert!(session.start_save().is_none());
        assert!(session.is_idle());
    }

    #[test]
    fn invalidate_resets_only_matching_target() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        assert!(!session.invalidate(TransactionId::new(2)));
        assert!(session.invalidate(TransactionId::new(1)));
        assert!(session.is_idle());
    }

    #[test]
    fn completion_after_invalidation_is_ignored() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        let (target, _draft) = session.start_save().unwrap();
        assert!(session.invalidate(target));

        session.complete(target, Err("boom".to_owned()));
        assert!(session.is_idle());
    }

    #[test]
    fn retain_existing_resets_when_target_vanished() {
        let mut session = EditSession::new();
        let _began = session.begin(&tx(1));
        assert!(!session.retain_existing(|_id| true));
        assert!(session.retain_existing(|_id| false));
        assert!(session.is_idle());
    }
}

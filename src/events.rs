//! Scope-refresh events published after successful mutations.
//!
//! The transaction store publishes one [`RefreshEvent`] per confirmed
//! create, update or delete. The dashboard aggregator consumes them and
//! re-fetches the breakdown, so the chart cannot drift from the table.

use tokio::sync::mpsc;

use crate::error::Operation;
use crate::scope::Scope;

/// Request to re-derive aggregates for `scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshEvent {
    /// Scope the mutation was issued against.
    pub scope: Scope,
    /// Mutation that triggered the refresh.
    pub cause: Operation,
}

/// Receiving half of the refresh channel.
pub type RefreshReceiver = mpsc::UnboundedReceiver<RefreshEvent>;

/// Sending half of the refresh channel, held by the transaction store.
#[derive(Debug, Clone)]
pub struct RefreshPublisher {
    /// Underlying channel sender.
    sender: mpsc::UnboundedSender<RefreshEvent>,
}

impl RefreshPublisher {
    /// Publishes `event`.
    ///
    /// Returns `false` if no consumer is listening any more.
    #[inline]
    pub fn publish(&self, event: RefreshEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => {
                tracing::trace!(scope = %event.scope, cause = %event.cause, "published refresh");
                true
            }
            Err(_closed) => {
                tracing::warn!(scope = %event.scope, "refresh consumer is gone; event dropped");
                false
            }
        }
    }
}

/// Creates a connected publisher / receiver pair.
#[inline]
#[must_use]
pub fn refresh_channel() -> (RefreshPublisher, RefreshReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (RefreshPublisher { sender }, receiver)
}

/// Removes every queued event, collapsing duplicates of the same scope.
///
/// Order of first appearance is kept.
#[must_use]
pub fn drain_pending(receiver: &mut RefreshReceiver) -> Vec<RefreshEvent> {
    let mut events: Vec<RefreshEvent> = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if !events.iter().any(|seen| seen.scope == event.scope) {
            events.push(event);
        }
    }
    events
}

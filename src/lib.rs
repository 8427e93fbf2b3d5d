//! Client library for the Spender personal finance dashboard.
//!
//! The crate keeps a consistent, period-scoped view of a user's
//! transactions and their category breakdown on top of the Spender REST
//! API:
//!
//! - [`client::SpenderClient`] speaks HTTP to the server.
//! - [`store::TransactionStore`] owns the transaction list for the
//!   selected `(user, month)` scope.
//! - [`aggregator::DashboardAggregator`] owns the category breakdown for
//!   the same scope.
//! - [`edit::EditSession`] is the single in-place edit state machine.
//! - [`dashboard::Dashboard`] wires them together: period changes fetch
//!   both views in parallel, stale responses are discarded, and every
//!   confirmed mutation refreshes the breakdown.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spender_rs::client::SpenderClient;
//! use spender_rs::dashboard::Dashboard;
//! use spender_rs::models::{Period, User, UserId};
//! use spender_rs::session::Session;
//!
//! # async fn run() -> spender_rs::error::Result<()> {
//! let client = Arc::new(SpenderClient::builder().build()?);
//! let user = User {
//!     id: UserId::new(1),
//!     name: "Ada".to_owned(),
//!     picture: String::new(),
//!     email: None,
//! };
//! let dashboard = Dashboard::new(client, Some(Session::new(user)), Period::new(2025, 3)?);
//! dashboard.load().await?.into_result()?;
//! let snapshot = dashboard.snapshot();
//! println!("{} transactions, {:.2} spent", snapshot.transactions.len(), snapshot.total);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod backend;
pub mod client;
pub mod dashboard;
pub mod edit;
pub mod error;
pub mod events;
pub mod models;
pub mod scope;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
mod testing;

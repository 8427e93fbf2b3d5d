//! Data models for the Spender API.
//!
//! Wire types for every endpoint the dashboard consumes, the `Period`
//! value that scopes them, and the raw form drafts validated before a
//! request is sent.

mod category;
mod dashboard;
mod draft;
mod ids;
mod period;
mod transaction;
mod user;

pub use category::Category;
pub use chrono::NaiveDate;
pub use dashboard::{CategoryBreakdownEntry, DashboardResponse};
pub use draft::{PatchDraft, TransactionDraft, ValidationError};
pub use ids::{TransactionId, UserId};
pub use period::Period;
pub use transaction::{NewTransaction, Transaction, TransactionPatch};
pub use user::{AuthRequest, User};

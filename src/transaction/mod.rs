//! Transaction lifecycle manager.
//!
//! A transaction holds one lease for its whole body. State moves
//! `Active -> Committing -> Closed` on success and
//! `Active -> RollingBack -> Closed` on any failure, including a panicking body.
//! Nested calls on a [`TransactionContext`] become savepoints on the same lease.

mod context;
mod lifecycle;
mod state;

pub(crate) use context::HeldConnection;
pub use context::{TaskContext, TransactionContext};
pub(crate) use lifecycle::run;
pub use state::{IsolationLevel, TxMode, TxState};

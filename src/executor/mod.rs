//! Query executor: one query from mask check to released connection.
//!
//! Every entry point takes the held lease as an explicit capability. With
//! `None` the executor leases and releases locally; with `Some` it runs on
//! the caller's connection and touches neither.

mod dispatch;

pub use dispatch::{execute, fetch};

//! In-memory pool backend for tests and benchmarks.
//!
//! Enabled by the `test-utils` feature. [`StubBackend`] answers every
//! statement from a responder closure and records leases, releases and the
//! SQL it saw, so tests can assert on connection accounting without a server.

mod stub;

use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

pub use stub::{Responder, StubBackend, StubConnection};

/// A result set of `n` rows with a single `id` column numbered from 1.
#[must_use]
pub fn rows(n: usize) -> ResultSet {
    let mut result_set = ResultSet::with_capacity(n);
    result_set.set_column_names(Arc::new(vec!["id".to_string()]));
    for id in 1..=n {
        result_set.add_row_values(vec![RowValues::Int(i64::try_from(id).unwrap_or(i64::MAX))]);
    }
    result_set
}

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

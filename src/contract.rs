//! Result contract engine: checks a result set against a mask and reduces it
//! to the single shape the caller asked for.

use crate::error::{ContractViolation, SqlContractDbError};
use crate::mask::QueryResultMask;
use crate::results::{CustomDbRow, ResultSet};

/// Mask-shaped value handed back to callers in place of raw rows.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// No row (`NONE`, or `ONE | NONE` with nothing returned).
    Empty,
    /// Exactly one row.
    Single(CustomDbRow),
    /// Rows in driver order; empty only when `NONE` was also accepted.
    Multiple(Vec<CustomDbRow>),
}

impl NormalizedResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            NormalizedResult::Empty => true,
            NormalizedResult::Single(_) => false,
            NormalizedResult::Multiple(rows) => rows.is_empty(),
        }
    }

    /// Number of rows carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            NormalizedResult::Empty => 0,
            NormalizedResult::Single(_) => 1,
            NormalizedResult::Multiple(rows) => rows.len(),
        }
    }

    /// Take the single row.
    ///
    /// # Errors
    /// Returns `SqlContractDbError::ExecutionError` when the value is not `Single`.
    pub fn into_single(self) -> Result<CustomDbRow, SqlContractDbError> {
        match self {
            NormalizedResult::Single(row) => Ok(row),
            other => Err(shape_error("a single row", &other)),
        }
    }

    /// Take the row if there is one.
    ///
    /// # Errors
    /// Returns `SqlContractDbError::ExecutionError` for `Multiple`.
    pub fn into_optional(self) -> Result<Option<CustomDbRow>, SqlContractDbError> {
        match self {
            NormalizedResult::Empty => Ok(None),
            NormalizedResult::Single(row) => Ok(Some(row)),
            other => Err(shape_error("zero or one row", &other)),
        }
    }

    /// Flatten into a row list. Never fails.
    #[must_use]
    pub fn into_rows(self) -> Vec<CustomDbRow> {
        match self {
            NormalizedResult::Empty => Vec::new(),
            NormalizedResult::Single(row) => vec![row],
            NormalizedResult::Multiple(rows) => rows,
        }
    }
}

fn shape_error(expected: &str, got: &NormalizedResult) -> SqlContractDbError {
    SqlContractDbError::ExecutionError(format!(
        "expected {expected}, result carries {} row(s)",
        got.len()
    ))
}

/// Validate `rows` against `mask`.
///
/// Pure: the same inputs always produce the same shape.
///
/// # Errors
/// Returns `SqlContractDbError::ContractViolation` when the row count does not
/// fit the mask.
pub fn validate(
    rows: ResultSet,
    mask: QueryResultMask,
) -> Result<NormalizedResult, SqlContractDbError> {
    let mut rows = rows.into_rows();
    let received = rows.len();
    let normalized = match (mask, received) {
        (QueryResultMask::None, 0) => NormalizedResult::Empty,
        (QueryResultMask::None, _) => {
            return Err(ContractViolation::UnexpectedRows { received }.into());
        }
        (QueryResultMask::One | QueryResultMask::OneOrNone, 1) => match rows.pop() {
            Some(row) => NormalizedResult::Single(row),
            None => NormalizedResult::Empty,
        },
        (QueryResultMask::One, _) => {
            return Err(ContractViolation::NoDataOrTooMany { received }.into());
        }
        (QueryResultMask::OneOrNone, 0) => NormalizedResult::Empty,
        (QueryResultMask::OneOrNone, _) => {
            return Err(ContractViolation::TooManyRows { received }.into());
        }
        (QueryResultMask::Many, 0) => return Err(ContractViolation::NoData.into()),
        (QueryResultMask::Many | QueryResultMask::ManyOrNone, _) => {
            NormalizedResult::Multiple(rows)
        }
    };
    Ok(normalized)
}

//! Result masks: the set of row-count shapes a caller accepts for a query.
//!
//! [`ResultFlags`] is the raw set and combines freely with `|`. A
//! [`QueryResultMask`] is a flag set that passed the validity check (at least
//! one flag, never `ONE` together with `MANY`), so the contract engine only
//! ever sees masks it can interpret.

use std::fmt;
use std::ops::BitOr;

use crate::error::SqlContractDbError;

/// Raw combination of result flags, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResultFlags {
    one: bool,
    many: bool,
    none: bool,
}

impl ResultFlags {
    /// Exactly one row.
    pub const ONE: ResultFlags = ResultFlags {
        one: true,
        many: false,
        none: false,
    };
    /// One or more rows.
    pub const MANY: ResultFlags = ResultFlags {
        one: false,
        many: true,
        none: false,
    };
    /// No rows.
    pub const NONE: ResultFlags = ResultFlags {
        one: false,
        many: false,
        none: true,
    };
    /// No flag at all; never a valid mask.
    pub const EMPTY: ResultFlags = ResultFlags {
        one: false,
        many: false,
        none: false,
    };

    #[must_use]
    pub fn has_one(self) -> bool {
        self.one
    }

    #[must_use]
    pub fn has_many(self) -> bool {
        self.many
    }

    #[must_use]
    pub fn has_none(self) -> bool {
        self.none
    }

    /// Whether these flags form an interpretable mask.
    #[must_use]
    pub fn is_valid(self) -> bool {
        (self.one || self.many || self.none) && !(self.one && self.many)
    }
}

impl BitOr for ResultFlags {
    type Output = ResultFlags;

    fn bitor(self, rhs: ResultFlags) -> ResultFlags {
        ResultFlags {
            one: self.one || rhs.one,
            many: self.many || rhs.many,
            none: self.none || rhs.none,
        }
    }
}

impl fmt::Display for ResultFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [(self.one, "ONE"), (self.many, "MANY"), (self.none, "NONE")]
            .into_iter()
            .filter_map(|(set, name)| set.then_some(name))
            .collect();
        if names.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Validated result mask.
///
/// Every accepted shape is one of the five variants; contradictory or empty
/// flag sets cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryResultMask {
    /// `NONE`
    None,
    /// `ONE`
    One,
    /// `MANY`
    Many,
    /// `ONE | NONE`
    OneOrNone,
    /// `MANY | NONE`
    ManyOrNone,
}

impl QueryResultMask {
    /// Validate a flag set.
    ///
    /// # Errors
    /// Returns `SqlContractDbError::InvalidMask` when `ONE` and `MANY` are both
    /// set or when no flag is set.
    pub fn new(flags: ResultFlags) -> Result<Self, SqlContractDbError> {
        match (flags.one, flags.many, flags.none) {
            (false, false, true) => Ok(QueryResultMask::None),
            (true, false, false) => Ok(QueryResultMask::One),
            (false, true, false) => Ok(QueryResultMask::Many),
            (true, false, true) => Ok(QueryResultMask::OneOrNone),
            (false, true, true) => Ok(QueryResultMask::ManyOrNone),
            (true, true, _) => Err(SqlContractDbError::InvalidMask(format!(
                "{flags}: ONE and MANY are mutually exclusive"
            ))),
            (false, false, false) => Err(SqlContractDbError::InvalidMask(
                "no result flag set".to_string(),
            )),
        }
    }

    /// The flags this mask was built from.
    #[must_use]
    pub fn flags(self) -> ResultFlags {
        match self {
            QueryResultMask::None => ResultFlags::NONE,
            QueryResultMask::One => ResultFlags::ONE,
            QueryResultMask::Many => ResultFlags::MANY,
            QueryResultMask::OneOrNone => ResultFlags::ONE | ResultFlags::NONE,
            QueryResultMask::ManyOrNone => ResultFlags::MANY | ResultFlags::NONE,
        }
    }
}

impl TryFrom<ResultFlags> for QueryResultMask {
    type Error = SqlContractDbError;

    fn try_from(flags: ResultFlags) -> Result<Self, Self::Error> {
        QueryResultMask::new(flags)
    }
}

impl From<QueryResultMask> for ResultFlags {
    fn from(mask: QueryResultMask) -> Self {
        mask.flags()
    }
}

impl fmt::Display for QueryResultMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.flags().fmt(f)
    }
}

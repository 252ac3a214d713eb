use std::fmt;

use serde::Deserialize;

/// Where a transaction context is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    /// BEGIN succeeded; queries are accepted.
    Active,
    /// The body resolved; COMMIT is in flight.
    Committing,
    /// The body, BEGIN or COMMIT failed; ROLLBACK is in flight.
    RollingBack,
    /// COMMIT or ROLLBACK finished. Terminal.
    Closed,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Active => "active",
            TxState::Committing => "committing",
            TxState::RollingBack => "rolling back",
            TxState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Options rendered into the opening `BEGIN` of a top-level transaction.
///
/// ```rust
/// use sql_contract::prelude::*;
///
/// let mode = TxMode::default()
///     .with_isolation(IsolationLevel::Serializable)
///     .read_only(true);
/// assert_eq!(mode.begin_statement(), "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TxMode {
    #[serde(default)]
    pub isolation: Option<IsolationLevel>,
    #[serde(default)]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub deferrable: Option<bool>,
}

impl TxMode {
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    #[must_use]
    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    #[must_use]
    pub fn begin_statement(&self) -> String {
        let mut parts = vec!["BEGIN"];
        if let Some(isolation) = self.isolation {
            parts.push(isolation.as_sql());
        }
        match self.read_only {
            Some(true) => parts.push("READ ONLY"),
            Some(false) => parts.push("READ WRITE"),
            None => {}
        }
        match self.deferrable {
            Some(true) => parts.push("DEFERRABLE"),
            Some(false) => parts.push("NOT DEFERRABLE"),
            None => {}
        }
        parts.join(" ")
    }
}

/// The three boundary statements of one transaction level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundaries {
    pub(crate) begin: String,
    pub(crate) commit: String,
    pub(crate) rollback: String,
}

impl Boundaries {
    /// Depth 0 is a real transaction; deeper levels are savepoints.
    pub(crate) fn new(mode: &TxMode, depth: u32) -> Self {
        if depth == 0 {
            Self {
                begin: mode.begin_statement(),
                commit: "COMMIT".to_string(),
                rollback: "ROLLBACK".to_string(),
            }
        } else {
            Self {
                begin: format!("SAVEPOINT sp_{depth}"),
                commit: format!("RELEASE SAVEPOINT sp_{depth}"),
                rollback: format!("ROLLBACK TO SAVEPOINT sp_{depth}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_plain_begin() {
        assert_eq!(TxMode::default().begin_statement(), "BEGIN");
        let mode = TxMode::default()
            .with_isolation(IsolationLevel::RepeatableRead)
            .read_only(false)
            .deferrable(true);
        assert_eq!(
            mode.begin_statement(),
            "BEGIN ISOLATION LEVEL REPEATABLE READ READ WRITE DEFERRABLE"
        );
    }

    #[test]
    fn nested_levels_use_savepoints() {
        let mode = TxMode::default().read_only(true);
        assert_eq!(Boundaries::new(&mode, 0).begin, "BEGIN READ ONLY");
        let nested = Boundaries::new(&mode, 2);
        assert_eq!(nested.begin, "SAVEPOINT sp_2");
        assert_eq!(nested.commit, "RELEASE SAVEPOINT sp_2");
        assert_eq!(nested.rollback, "ROLLBACK TO SAVEPOINT sp_2");
    }

    #[test]
    fn mode_deserializes() {
        let mode: TxMode =
            serde_json::from_str(r#"{"isolation":"serializable","read_only":true}"#)
                .unwrap_or_default();
        assert_eq!(
            mode.begin_statement(),
            "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY"
        );
    }
}

use thiserror::Error;

#[cfg(feature = "postgres")]
use deadpool_postgres::PoolError;

/// Mismatch between the declared result mask and the rows a query produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// At least one row was required, none came back.
    #[error("No data returned from the query.")]
    NoData,
    /// Exactly one row was required.
    #[error("Expected exactly one row, received {received}.")]
    NoDataOrTooMany { received: usize },
    /// No rows were permitted.
    #[error("No return data was expected, received {received} rows.")]
    UnexpectedRows { received: usize },
    /// Zero or one row was permitted.
    #[error("Multiple rows were not expected, received {received}.")]
    TooManyRows { received: usize },
}

#[derive(Debug, Error)]
pub enum SqlContractDbError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] PoolError),

    #[error("Invalid result mask: {0}")]
    InvalidMask(String),

    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter formatting error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("{original} (rollback also failed: {rollback})")]
    RollbackFailed {
        original: Box<SqlContractDbError>,
        rollback: Box<SqlContractDbError>,
    },

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlContractDbError {
    /// The contract violation carried by this error, if any.
    #[must_use]
    pub fn violation(&self) -> Option<ContractViolation> {
        match self {
            Self::ContractViolation(v) => Some(*v),
            Self::RollbackFailed { original, .. } => original.violation(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        self.violation().is_some()
    }

    /// The reason a transaction failed, looking through any rollback failure
    /// that was attached to it.
    #[must_use]
    pub fn original(&self) -> &SqlContractDbError {
        match self {
            Self::RollbackFailed { original, .. } => original.original(),
            other => other,
        }
    }

    /// Attach a failed ROLLBACK to the error that caused it.
    pub(crate) fn with_rollback_failure(self, rollback: SqlContractDbError) -> Self {
        Self::RollbackFailed {
            original: Box::new(self),
            rollback: Box::new(rollback),
        }
    }
}

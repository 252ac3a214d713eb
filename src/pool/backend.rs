use async_trait::async_trait;

use crate::error::SqlContractDbError;
use crate::results::ResultSet;

/// A live wire connection checked out of a pool.
///
/// Dropping the value hands the connection back to the pool it came from.
#[async_trait]
pub trait WireConnection: Send {
    /// Run one statement and return its rows.
    ///
    /// Statements without a row description report `rows_affected` on an
    /// otherwise empty `ResultSet`.
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlContractDbError>;

    /// Run one or more statements whose rows are not needed
    /// (`BEGIN`, `COMMIT`, `SAVEPOINT`, ...).
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlContractDbError>;
}

/// Connection pool seen from the broker: where leases come from.
#[async_trait]
pub trait PoolBackend: Send + Sync {
    /// Check out a connection, waiting according to the pool's exhaustion policy.
    async fn lease(&self) -> Result<Box<dyn WireConnection>, SqlContractDbError>;

    /// Close the pool: idle connections are dropped and further leases fail.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

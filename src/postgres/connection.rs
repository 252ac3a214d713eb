use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};

use crate::config::{ConnectionConfig, PoolOptions};
use crate::error::SqlContractDbError;
use crate::formatting::is_multi_statement;
use crate::pool::{PoolBackend, WireConnection};
use crate::results::ResultSet;

use super::config::build_pool;
use super::query::{build_result_set_from_simple, build_result_set_from_statement};

/// deadpool-postgres pool exposed as a [`PoolBackend`].
#[derive(Clone)]
pub struct PostgresBackend {
    pool: Pool,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresBackend")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

impl PostgresBackend {
    /// # Errors
    /// Returns `ConfigError` for incomplete configuration or `ConnectionError`
    /// when the pool cannot be built.
    pub fn new(config: &ConnectionConfig, options: &PoolOptions) -> Result<Self, SqlContractDbError> {
        Ok(Self {
            pool: build_pool(config, options)?,
        })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl PoolBackend for PostgresBackend {
    async fn lease(&self) -> Result<Box<dyn WireConnection>, SqlContractDbError> {
        let client = self.pool.get().await?;
        Ok(Box::new(PostgresConnection { client }))
    }

    fn close(&self) {
        self.pool.close();
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// One pooled client. Dropping it returns the client to the pool.
pub struct PostgresConnection {
    client: Object,
}

#[async_trait]
impl WireConnection for PostgresConnection {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlContractDbError> {
        // a prepared statement holds one command
        if is_multi_statement(sql) {
            let messages = self.client.simple_query(sql).await?;
            return build_result_set_from_simple(&messages);
        }
        let stmt = self.client.prepare(sql).await?;
        if stmt.columns().is_empty() {
            let affected = self.client.execute(&stmt, &[]).await?;
            let affected = usize::try_from(affected).map_err(|e| {
                SqlContractDbError::ExecutionError(format!(
                    "postgres affected rows conversion error: {e}"
                ))
            })?;
            return Ok(ResultSet::affected(affected));
        }
        let rows = self.client.query(&stmt, &[]).await?;
        build_result_set_from_statement(&stmt, &rows)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlContractDbError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }
}

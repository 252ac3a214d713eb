use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Mutex as AsyncMutex;

use crate::contract::NormalizedResult;
use crate::error::SqlContractDbError;
use crate::executor;
use crate::mask::ResultFlags;
use crate::pool::{ConnectionBroker, Lease, LeaseId};
use crate::query::QueryOps;
use crate::results::ResultSet;
use crate::transaction::{self, HeldConnection, TaskContext, TransactionContext, TxMode};
use crate::types::RowValues;

/// One connection configuration with its own pool.
///
/// Cloning shares the pool. Standalone queries each lease and release their
/// own connection; [`Database::task`] and [`Database::transaction`] hold one
/// connection for the whole body.
///
/// ```rust,no_run
/// use sql_contract::prelude::*;
///
/// # async fn demo(db: Database) -> Result<(), SqlContractDbError> {
/// let id = db
///     .transaction(|tx| async move {
///         let row = tx
///             .one("INSERT INTO users(name) VALUES($1) RETURNING id", &["ann".into()])
///             .await?;
///         tx.none("INSERT INTO audit(user_id) VALUES($1)", &[row.get("id").cloned().into()])
///             .await?;
///         Ok(row.get("id").and_then(RowValues::as_int).copied())
///     })
///     .await?;
/// # let _ = id;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Database {
    broker: Arc<ConnectionBroker>,
}

impl Database {
    pub(crate) fn new(broker: Arc<ConnectionBroker>) -> Self {
        Self { broker }
    }

    /// Label used in events and logs.
    #[must_use]
    pub fn label(&self) -> &str {
        self.broker.database()
    }

    /// Lease a connection for manual use, without connect/disconnect
    /// notifications.
    ///
    /// # Errors
    /// Returns the pool's error when no connection can be checked out.
    pub async fn connect(&self) -> Result<DirectConnection, SqlContractDbError> {
        let lease = self.broker.lease_unobserved().await?;
        Ok(DirectConnection {
            id: lease.id(),
            lease: AsyncMutex::new(lease),
            broker: self.broker.clone(),
        })
    }

    /// Hold one connection across `body`, without opening a transaction.
    ///
    /// The connection is released when the body resolves, fails or panics.
    ///
    /// # Errors
    /// Returns the pool's error or the body's error.
    pub async fn task<T, F, Fut>(&self, body: F) -> Result<T, SqlContractDbError>
    where
        F: FnOnce(TaskContext) -> Fut + Send,
        Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
        T: Send,
    {
        let held = HeldConnection::new(self.broker.lease().await?, self.broker.clone());
        let ctx = TaskContext::new(held.clone());
        let scoped = ctx.clone();
        let outcome = std::panic::AssertUnwindSafe(async move { body(scoped).await })
            .catch_unwind()
            .await;
        ctx.finish();
        held.release().await;
        match outcome {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Run `body` inside `BEGIN`/`COMMIT` on one held connection.
    ///
    /// Any failure of `BEGIN`, the body or `COMMIT` rolls the transaction back
    /// and returns the original error; a failed `ROLLBACK` is attached as
    /// [`SqlContractDbError::RollbackFailed`]. A panicking body is rolled back
    /// and released before the panic continues.
    ///
    /// # Errors
    /// Returns the pool's error, the body's error or a boundary statement's error.
    pub async fn transaction<T, F, Fut>(&self, body: F) -> Result<T, SqlContractDbError>
    where
        F: FnOnce(TransactionContext) -> Fut + Send,
        Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
        T: Send,
    {
        self.transaction_with(TxMode::default(), body).await
    }

    /// [`Database::transaction`] with explicit isolation and access options.
    ///
    /// # Errors
    /// See [`Database::transaction`].
    pub async fn transaction_with<T, F, Fut>(
        &self,
        mode: TxMode,
        body: F,
    ) -> Result<T, SqlContractDbError>
    where
        F: FnOnce(TransactionContext) -> Fut + Send,
        Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
        T: Send,
    {
        let held = HeldConnection::new(self.broker.lease().await?, self.broker.clone());
        let outcome = transaction::run(&held, &mode, 0, body).await;
        held.release().await;
        outcome.resolve()
    }

    /// Close this database's pool. Later queries fail with `ConnectionError`.
    pub fn close(&self) {
        self.broker.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.broker.is_closed()
    }
}

impl QueryOps for Database {
    async fn query(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> Result<NormalizedResult, SqlContractDbError> {
        executor::execute(&self.broker, sql, params, flags, None).await
    }

    async fn result(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlContractDbError> {
        executor::fetch(&self.broker, sql, params, None).await
    }
}

/// A connection leased through [`Database::connect`].
///
/// Call [`DirectConnection::release`] when done; dropping it also returns the
/// connection to the pool.
pub struct DirectConnection {
    id: LeaseId,
    lease: AsyncMutex<Lease>,
    broker: Arc<ConnectionBroker>,
}

impl std::fmt::Debug for DirectConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectConnection")
            .field("lease", &self.id)
            .field("database", &self.broker.database())
            .finish()
    }
}

impl DirectConnection {
    #[must_use]
    pub fn id(&self) -> LeaseId {
        self.id
    }

    /// Return the connection to its pool.
    pub fn release(self) {
        self.lease.into_inner().release();
    }
}

impl QueryOps for DirectConnection {
    async fn query(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> Result<NormalizedResult, SqlContractDbError> {
        let mut lease = self.lease.lock().await;
        executor::execute(&self.broker, sql, params, flags, Some(&mut *lease)).await
    }

    async fn result(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlContractDbError> {
        let mut lease = self.lease.lock().await;
        executor::fetch(&self.broker, sql, params, Some(&mut *lease)).await
    }
}

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::contract::NormalizedResult;
use crate::error::SqlContractDbError;
use crate::executor;
use crate::mask::ResultFlags;
use crate::pool::{ConnectionBroker, Lease, LeaseId};
use crate::query::QueryOps;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::lifecycle;
use super::state::{TxMode, TxState};

/// One lease held across a task or transaction body.
///
/// Queries lock the lease for their duration, so statements issued through
/// clones of the same context run one at a time on the single connection.
#[derive(Clone)]
pub(crate) struct HeldConnection {
    id: LeaseId,
    lease: Arc<AsyncMutex<Option<Lease>>>,
    broker: Arc<ConnectionBroker>,
}

impl HeldConnection {
    pub(crate) fn new(lease: Lease, broker: Arc<ConnectionBroker>) -> Self {
        Self {
            id: lease.id(),
            lease: Arc::new(AsyncMutex::new(Some(lease))),
            broker,
        }
    }

    pub(crate) fn id(&self) -> LeaseId {
        self.id
    }

    pub(crate) fn broker(&self) -> &ConnectionBroker {
        &self.broker
    }

    fn released(&self) -> SqlContractDbError {
        SqlContractDbError::ConnectionError(format!("{} was already released", self.id))
    }

    pub(crate) async fn execute(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> Result<NormalizedResult, SqlContractDbError> {
        let mut guard = self.lease.lock().await;
        let lease = guard.as_mut().ok_or_else(|| self.released())?;
        executor::execute(&self.broker, sql, params, flags, Some(lease)).await
    }

    pub(crate) async fn fetch(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlContractDbError> {
        let mut guard = self.lease.lock().await;
        let lease = guard.as_mut().ok_or_else(|| self.released())?;
        executor::fetch(&self.broker, sql, params, Some(lease)).await
    }

    /// Send a transaction boundary statement. `open_after` records whether a
    /// top-level transaction is open once it succeeds; savepoints pass `None`.
    pub(crate) async fn boundary(
        &self,
        sql: &str,
        open_after: Option<bool>,
    ) -> Result<(), SqlContractDbError> {
        let mut guard = self.lease.lock().await;
        let lease = guard.as_mut().ok_or_else(|| self.released())?;
        lease.execute_batch(sql).await?;
        if let Some(open) = open_after {
            lease.set_in_transaction(open);
        }
        Ok(())
    }

    /// Return the connection to the pool. Later calls are no-ops.
    pub(crate) async fn release(&self) {
        if let Some(lease) = self.lease.lock().await.take() {
            lease.release();
        }
    }
}

/// Query context bound to one transaction level on a held connection.
///
/// Cloning is cheap; all clones share the connection and the state flag.
#[derive(Clone)]
pub struct TransactionContext {
    held: HeldConnection,
    state: Arc<Mutex<TxState>>,
    depth: u32,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("lease", &self.held.id())
            .field("depth", &self.depth)
            .field("state", &self.state())
            .finish()
    }
}

impl TransactionContext {
    pub(crate) fn new(held: HeldConnection, depth: u32) -> Self {
        Self {
            held,
            state: Arc::new(Mutex::new(TxState::Active)),
            depth,
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, next: TxState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(lease = %self.held.id(), depth = self.depth, from = %*state, to = %next, "transaction state");
        *state = next;
    }

    /// 0 for a top-level transaction, N inside N nested savepoints.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn lease_id(&self) -> LeaseId {
        self.held.id()
    }

    pub(crate) fn held(&self) -> &HeldConnection {
        &self.held
    }

    fn ensure_active(&self) -> Result<(), SqlContractDbError> {
        match self.state() {
            TxState::Active => Ok(()),
            other => Err(SqlContractDbError::TransactionError(format!(
                "transaction at depth {} is {other}; it no longer accepts queries",
                self.depth
            ))),
        }
    }

    /// Run `body` inside a savepoint on this transaction's connection.
    ///
    /// The savepoint is released when `body` succeeds and rolled back to when
    /// it fails; the enclosing transaction stays active either way.
    ///
    /// # Errors
    /// Returns the body's error, a savepoint statement's error, or a
    /// `TransactionError` when this context is no longer active.
    pub async fn transaction<T, F, Fut>(&self, body: F) -> Result<T, SqlContractDbError>
    where
        F: FnOnce(TransactionContext) -> Fut + Send,
        Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
        T: Send,
    {
        self.ensure_active()?;
        lifecycle::run(&self.held, &TxMode::default(), self.depth + 1, body)
            .await
            .resolve()
    }
}

impl QueryOps for TransactionContext {
    async fn query(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> Result<NormalizedResult, SqlContractDbError> {
        self.ensure_active()?;
        self.held.execute(sql, flags, params).await
    }

    async fn result(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlContractDbError> {
        self.ensure_active()?;
        self.held.fetch(sql, params).await
    }
}

/// Query context holding one connection across a body, without a transaction.
#[derive(Clone)]
pub struct TaskContext {
    held: HeldConnection,
    done: Arc<AtomicBool>,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("lease", &self.held.id())
            .field("done", &self.is_done())
            .finish()
    }
}

impl TaskContext {
    pub(crate) fn new(held: HeldConnection) -> Self {
        Self {
            held,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether the task body has completed and the connection was handed back.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn lease_id(&self) -> LeaseId {
        self.held.id()
    }

    fn ensure_open(&self) -> Result<(), SqlContractDbError> {
        if self.is_done() {
            Err(SqlContractDbError::TransactionError(
                "task has finished; its connection was released".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Run a top-level transaction on the task's connection.
    ///
    /// # Errors
    /// See [`crate::Database::transaction`].
    pub async fn transaction<T, F, Fut>(&self, body: F) -> Result<T, SqlContractDbError>
    where
        F: FnOnce(TransactionContext) -> Fut + Send,
        Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
        T: Send,
    {
        self.transaction_with(TxMode::default(), body).await
    }

    /// Run a top-level transaction with explicit options on the task's connection.
    ///
    /// # Errors
    /// See [`crate::Database::transaction`].
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
        self.ensure_open()?;
        lifecycle::run(&self.held, &mode, 0, body).await.resolve()
    }
}

impl QueryOps for TaskContext {
    async fn query(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> Result<NormalizedResult, SqlContractDbError> {
        self.ensure_open()?;
        self.held.execute(sql, flags, params).await
    }

    async fn result(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlContractDbError> {
        self.ensure_open()?;
        self.held.fetch(sql, params).await
    }
}

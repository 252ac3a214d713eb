use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SqlContractDbError;
use crate::results::ResultSet;

use super::backend::{PoolBackend, WireConnection};
use super::events::{ConnectEvent, Observers};

/// Identity of one lease, unique within a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(pub u64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease#{}", self.0)
    }
}

/// Hands out connections from one pool and reports their lifecycle.
pub struct ConnectionBroker {
    backend: Arc<dyn PoolBackend>,
    observers: Observers,
    database: Arc<str>,
    next_lease: AtomicU64,
}

impl fmt::Debug for ConnectionBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBroker")
            .field("database", &self.database)
            .field("observers", &self.observers)
            .field("closed", &self.backend.is_closed())
            .finish_non_exhaustive()
    }
}

impl ConnectionBroker {
    #[must_use]
    pub fn new(backend: Arc<dyn PoolBackend>, observers: Observers, database: &str) -> Self {
        Self {
            backend,
            observers,
            database: Arc::from(database),
            next_lease: AtomicU64::new(1),
        }
    }

    /// Label used in events and logs.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    pub(crate) fn database_label(&self) -> Arc<str> {
        self.database.clone()
    }

    #[must_use]
    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Lease a connection and notify `on_connect` observers.
    ///
    /// # Errors
    /// Returns the pool's error when no connection can be checked out.
    pub async fn lease(&self) -> Result<Lease, SqlContractDbError> {
        let lease = self.checkout(true).await?;
        let event = ConnectEvent {
            lease: lease.id,
            database: self.database.clone(),
        };
        self.observers.emit("connect", |o| o.on_connect(&event));
        Ok(lease)
    }

    /// Lease a connection without lifecycle notifications.
    ///
    /// # Errors
    /// Returns the pool's error when no connection can be checked out.
    pub async fn lease_unobserved(&self) -> Result<Lease, SqlContractDbError> {
        self.checkout(false).await
    }

    async fn checkout(&self, observed: bool) -> Result<Lease, SqlContractDbError> {
        if self.backend.is_closed() {
            return Err(SqlContractDbError::ConnectionError(format!(
                "pool for {} has been closed",
                self.database
            )));
        }
        let conn = self.backend.lease().await.inspect_err(|e| {
            tracing::debug!(database = %self.database, error = %e, "lease failed");
        })?;
        let id = LeaseId(self.next_lease.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(database = %self.database, lease = %id, observed, "connection leased");

        let notifier = observed.then(|| Notifier {
            observers: self.observers.clone(),
            database: self.database.clone(),
        });
        Ok(Lease {
            id,
            conn: Some(conn),
            notifier,
            database: self.database.clone(),
            in_transaction: false,
        })
    }

    /// Close the underlying pool.
    pub fn close(&self) {
        tracing::debug!(database = %self.database, "closing pool");
        self.backend.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }
}

struct Notifier {
    observers: Observers,
    database: Arc<str>,
}

/// Exclusive claim on one pooled connection.
///
/// Released exactly once: by [`Lease::release`], or on drop when the owner
/// never got that far (error paths, abandoned futures). A lease released while
/// a transaction is still open sends `ROLLBACK` before the connection goes
/// back to the pool.
pub struct Lease {
    id: LeaseId,
    conn: Option<Box<dyn WireConnection>>,
    notifier: Option<Notifier>,
    database: Arc<str>,
    in_transaction: bool,
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("database", &self.database)
            .field("released", &self.conn.is_none())
            .finish()
    }
}

impl Lease {
    #[must_use]
    pub fn id(&self) -> LeaseId {
        self.id
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.conn.is_none()
    }

    /// Whether a top-level transaction is open on this connection.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub(crate) fn set_in_transaction(&mut self, open: bool) {
        self.in_transaction = open;
    }

    fn connection(&mut self) -> Result<&mut Box<dyn WireConnection>, SqlContractDbError> {
        let id = self.id;
        self.conn.as_mut().ok_or_else(|| {
            SqlContractDbError::ConnectionError(format!("{id} was already released"))
        })
    }

    /// Run one statement on the leased connection.
    ///
    /// # Errors
    /// Returns the driver's error.
    pub async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlContractDbError> {
        tracing::trace!(lease = %self.id, sql, "query");
        self.connection()?.query(sql).await
    }

    /// Run statements whose rows are not needed.
    ///
    /// # Errors
    /// Returns the driver's error.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlContractDbError> {
        tracing::trace!(lease = %self.id, sql, "batch");
        self.connection()?.execute_batch(sql).await
    }

    /// Return the connection to its pool.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.in_transaction {
            self.in_transaction = false;
            roll_back_detached(conn, self.id);
        } else {
            drop(conn);
        }
        tracing::debug!(database = %self.database, lease = %self.id, "connection released");
        if let Some(notifier) = &self.notifier {
            let event = ConnectEvent {
                lease: self.id,
                database: notifier.database.clone(),
            };
            notifier
                .observers
                .emit("disconnect", |o| o.on_disconnect(&event));
        }
    }
}

fn roll_back_detached(mut conn: Box<dyn WireConnection>, id: LeaseId) {
    tracing::warn!(lease = %id, "released inside an open transaction; rolling back");
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = conn.execute_batch("ROLLBACK").await {
                    tracing::warn!(lease = %id, error = %e, "rollback on release failed");
                }
            });
        }
        Err(_) => {
            tracing::warn!(lease = %id, "no tokio runtime; connection returned without rollback");
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::SqlContractDbError;
use crate::pool::{PoolBackend, WireConnection};
use crate::results::ResultSet;

use super::rows;

/// Produces the result for one query statement.
pub type Responder = dyn Fn(&str) -> Result<ResultSet, SqlContractDbError> + Send + Sync;

struct Shared {
    responder: Box<Responder>,
    statements: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    hanging: Mutex<Vec<String>>,
    leases: AtomicUsize,
    releases: AtomicUsize,
    refuse_leases: AtomicBool,
    closed: AtomicBool,
}

impl Shared {
    fn matches(list: &Mutex<Vec<String>>, sql: &str) -> bool {
        list.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|fragment| sql.contains(fragment.as_str()))
    }

    /// Record `sql`, then hang or fail if a registered fragment matches.
    async fn submit(&self, sql: &str) -> Result<(), SqlContractDbError> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        if Self::matches(&self.hanging, sql) {
            std::future::pending::<()>().await;
        }
        if Self::matches(&self.failing, sql) {
            return Err(SqlContractDbError::ExecutionError(format!(
                "stub failure: {sql}"
            )));
        }
        Ok(())
    }
}

/// Pool backend that never touches the network.
///
/// Clones share state, so a test can keep one handle for assertions after
/// passing another to [`crate::SqlContract::database`].
#[derive(Clone)]
pub struct StubBackend {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for StubBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubBackend")
            .field("leases", &self.leases())
            .field("releases", &self.releases())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl StubBackend {
    /// Answer every query statement with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<ResultSet, SqlContractDbError> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                responder: Box::new(responder),
                statements: Mutex::new(Vec::new()),
                failing: Mutex::new(Vec::new()),
                hanging: Mutex::new(Vec::new()),
                leases: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                refuse_leases: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Answer every query statement with `n` rows.
    #[must_use]
    pub fn with_rows(n: usize) -> Self {
        Self::new(move |_| Ok(rows(n)))
    }

    /// Fail every statement, query or batch, that contains `fragment`.
    #[must_use]
    pub fn failing_on(self, fragment: &str) -> Self {
        self.shared
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fragment.to_string());
        self
    }

    /// Never complete statements that contain `fragment`.
    #[must_use]
    pub fn hanging_on(self, fragment: &str) -> Self {
        self.shared
            .hanging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fragment.to_string());
        self
    }

    /// Make further leases fail, as an exhausted fail-fast pool would.
    pub fn refuse_leases(&self, refuse: bool) {
        self.shared.refuse_leases.store(refuse, Ordering::SeqCst);
    }

    /// Every statement received, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.shared
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many received statements equal `sql` exactly.
    #[must_use]
    pub fn count(&self, sql: &str) -> usize {
        self.shared
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.as_str() == sql)
            .count()
    }

    #[must_use]
    pub fn leases(&self) -> usize {
        self.shared.leases.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn releases(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }

    /// A shared handle to pass to [`crate::SqlContract::database`].
    #[must_use]
    pub fn backend(&self) -> Arc<dyn PoolBackend> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl PoolBackend for StubBackend {
    async fn lease(&self) -> Result<Box<dyn WireConnection>, SqlContractDbError> {
        if self.shared.refuse_leases.load(Ordering::SeqCst) {
            return Err(SqlContractDbError::ConnectionError(
                "stub pool exhausted".to_string(),
            ));
        }
        self.shared.leases.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubConnection {
            shared: self.shared.clone(),
        }))
    }

    fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

/// Connection handed out by [`StubBackend`]. Dropping it counts a release.
pub struct StubConnection {
    shared: Arc<Shared>,
}

#[async_trait]
impl WireConnection for StubConnection {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlContractDbError> {
        self.shared.submit(sql).await?;
        (self.shared.responder)(sql)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlContractDbError> {
        self.shared.submit(sql).await
    }
}

impl Drop for StubConnection {
    fn drop(&mut self) {
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_leases_and_releases() {
        let stub = StubBackend::with_rows(2).failing_on("boom");
        let backend = stub.backend();

        let mut conn = backend.lease().await.expect("lease");
        let rs = conn.query("select 1").await.expect("query");
        assert_eq!(rs.len(), 2);
        assert!(conn.execute_batch("boom").await.is_err());
        drop(conn);

        assert_eq!((stub.leases(), stub.releases()), (1, 1));
        assert_eq!(stub.statements(), vec!["select 1", "boom"]);
        assert_eq!(stub.count("boom"), 1);

        stub.refuse_leases(true);
        assert!(backend.lease().await.is_err());
        assert_eq!(stub.leases(), 1);
    }
}

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::SqlContractDbError;

use super::broker::LeaseId;

/// Identity of a pool-managed lease, passed to connect/disconnect observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectEvent {
    pub lease: LeaseId,
    pub database: Arc<str>,
}

/// A statement about to be sent to the driver.
#[derive(Debug, Clone, Copy)]
pub struct QueryEvent<'a> {
    pub lease: LeaseId,
    pub database: &'a str,
    /// Fully formatted SQL text.
    pub sql: &'a str,
}

/// A failed query, after any local lease was released.
#[derive(Debug, Clone, Copy)]
pub struct ErrorEvent<'a> {
    pub database: &'a str,
    pub sql: &'a str,
    pub error: &'a SqlContractDbError,
}

/// Transaction boundary reached on a held connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub lease: LeaseId,
    pub database: Arc<str>,
    /// 0 for a top-level transaction, N for the Nth nested savepoint.
    pub depth: u32,
    pub phase: TransactionPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Begin,
    Commit,
    Rollback,
}

/// Typed subscription to connection lifecycle and query notifications.
///
/// All methods default to no-ops. Notifications are a side channel: a
/// panicking observer is logged and skipped, never failing the query.
pub trait ConnectionObserver: Send + Sync {
    fn on_connect(&self, _event: &ConnectEvent) {}

    fn on_disconnect(&self, _event: &ConnectEvent) {}

    fn on_query(&self, _event: &QueryEvent<'_>) {}

    fn on_error(&self, _event: &ErrorEvent<'_>) {}

    fn on_transaction(&self, _event: &TransactionEvent) {}
}

/// Observers registered at library init, shared by every database built from it.
#[derive(Clone, Default)]
pub struct Observers {
    inner: Arc<Vec<Arc<dyn ConnectionObserver>>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.inner.len())
            .finish()
    }
}

impl Observers {
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn ConnectionObserver>>) -> Self {
        Self {
            inner: Arc::new(observers),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn emit(&self, what: &'static str, notify: impl Fn(&dyn ConnectionObserver)) {
        for observer in self.inner.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| notify(observer.as_ref())));
            if outcome.is_err() {
                tracing::warn!(event = what, "connection observer panicked; notification skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Panicky;

    impl ConnectionObserver for Panicky {
        fn on_connect(&self, _event: &ConnectEvent) {
            panic!("observer failure");
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ConnectionObserver for Counter {
        fn on_connect(&self, _event: &ConnectEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn panicking_observer_does_not_stop_the_rest() {
        let counter = Arc::new(Counter::default());
        let list: Vec<Arc<dyn ConnectionObserver>> = vec![Arc::new(Panicky), counter.clone()];
        let observers = Observers::new(list);
        let event = ConnectEvent {
            lease: LeaseId(1),
            database: Arc::from("db"),
        };

        observers.emit("connect", |o| o.on_connect(&event));

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}

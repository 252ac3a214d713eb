#![cfg(feature = "test-utils")]

use std::time::Duration;

use futures_util::future::join_all;
use sql_contract::prelude::*;
use sql_contract::test_utils::StubBackend;

fn database(stub: &StubBackend) -> Database {
    SqlContract::new(InitOptions::default()).database(stub.backend(), "stub")
}

#[tokio::test]
async fn every_standalone_call_releases_its_lease() {
    let stub = StubBackend::with_rows(1).failing_on("broken");
    let db = database(&stub);
    let n = 10;

    let mut failures = 0;
    for i in 0..n {
        let outcome = match i % 5 {
            0 => db.one("SELECT 1", &[]).await.map(|_| ()),
            1 => db.many_or_none("SELECT 1", &[]).await.map(|_| ()),
            // contract violation: one row where none were allowed
            2 => db.none("SELECT 1", &[]).await,
            // driver error
            3 => db.one("SELECT broken", &[]).await.map(|_| ()),
            // formatting error after the lease
            _ => db.one("SELECT $3", &[]).await.map(|_| ()),
        };
        if outcome.is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 6);
    assert_eq!(stub.leases(), n);
    assert_eq!(stub.releases(), n);
}

#[tokio::test]
async fn concurrent_queries_each_lease_their_own_connection() {
    let stub = StubBackend::with_rows(2);
    let db = database(&stub);

    let results = join_all((0..8).map(|i| {
        let db = db.clone();
        async move {
            if i % 2 == 0 {
                db.many("SELECT id FROM t", &[]).await.map(|rows| rows.len())
            } else {
                db.one("SELECT id FROM t", &[]).await.map(|_| 1)
            }
        }
    }))
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    assert_eq!((stub.leases(), stub.releases()), (8, 8));
}

#[tokio::test]
async fn abandoned_query_releases_on_drop() {
    let stub = StubBackend::with_rows(1).hanging_on("pg_sleep");
    let db = database(&stub);

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        db.one("SELECT pg_sleep(60)", &[]),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!((stub.leases(), stub.releases()), (1, 1));
}

#[tokio::test]
async fn refused_lease_is_an_error_without_release() {
    let stub = StubBackend::with_rows(1);
    stub.refuse_leases(true);
    let db = database(&stub);

    let result = db.one("SELECT 1", &[]).await;
    assert!(matches!(result, Err(SqlContractDbError::ConnectionError(_))));
    assert_eq!((stub.leases(), stub.releases()), (0, 0));
}

#[tokio::test]
async fn closed_database_rejects_queries() {
    let stub = StubBackend::with_rows(1);
    let db = database(&stub);

    db.close();
    assert!(db.is_closed());
    let result = db.one("SELECT 1", &[]).await;
    assert!(matches!(result, Err(SqlContractDbError::ConnectionError(_))));
    assert_eq!(stub.leases(), 0);
}

#![cfg(feature = "test-utils")]

use std::sync::{Arc, Mutex};

use sql_contract::prelude::*;
use sql_contract::test_utils::StubBackend;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ConnectionObserver for Recorder {
    fn on_connect(&self, event: &ConnectEvent) {
        self.push(format!("connect {} {}", event.database, event.lease));
    }

    fn on_disconnect(&self, event: &ConnectEvent) {
        self.push(format!("disconnect {}", event.lease));
    }

    fn on_query(&self, event: &QueryEvent<'_>) {
        self.push(format!("query {}", event.sql));
    }

    fn on_error(&self, event: &ErrorEvent<'_>) {
        self.push(format!("error {}", event.sql));
    }

    fn on_transaction(&self, event: &TransactionEvent) {
        self.push(format!("{:?} depth={}", event.phase, event.depth));
    }
}

struct Exploding;

impl ConnectionObserver for Exploding {
    fn on_query(&self, _event: &QueryEvent<'_>) {
        panic!("observer bug");
    }
}

fn observed(stub: &StubBackend) -> (Database, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let lib = SqlContract::new(
        InitOptions::default()
            .with_observer(Arc::new(Exploding))
            .with_observer(recorder.clone()),
    );
    (lib.database(stub.backend(), "orders"), recorder)
}

#[tokio::test]
async fn standalone_query_lifecycle() {
    let stub = StubBackend::with_rows(1);
    let (db, recorder) = observed(&stub);

    db.one("SELECT $1", &[RowValues::Int(5)]).await.expect("query");
    let _ = db.none("SELECT 2", &[]).await;

    assert_eq!(
        recorder.events(),
        vec![
            "connect orders lease#1",
            "query SELECT 5",
            "disconnect lease#1",
            "connect orders lease#2",
            "query SELECT 2",
            "disconnect lease#2",
            "error SELECT 2",
        ]
    );
}

#[tokio::test]
async fn transaction_reports_phases_on_one_lease() {
    let stub = StubBackend::with_rows(1);
    let (db, recorder) = observed(&stub);

    db.transaction(|tx| async move {
        tx.transaction(|sp| async move { sp.one("SELECT 1", &[]).await })
            .await
    })
    .await
    .expect("transaction");

    assert_eq!(
        recorder.events(),
        vec![
            "connect orders lease#1",
            "Begin depth=0",
            "Begin depth=1",
            "query SELECT 1",
            "Commit depth=1",
            "Commit depth=0",
            "disconnect lease#1",
        ]
    );
}

#[tokio::test]
async fn direct_connections_skip_connect_notifications() {
    let stub = StubBackend::with_rows(1);
    let (db, recorder) = observed(&stub);

    let conn = db.connect().await.expect("connect");
    conn.one("SELECT 1", &[]).await.expect("query");
    conn.release();

    assert_eq!(recorder.events(), vec!["query SELECT 1"]);
}

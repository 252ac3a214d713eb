#![cfg(feature = "test-utils")]

use sql_contract::prelude::*;
use sql_contract::test_utils::StubBackend;

fn database(stub: &StubBackend) -> Database {
    SqlContract::new(InitOptions::default()).database(stub.backend(), "stub")
}

fn violation<T: std::fmt::Debug>(result: Result<T, SqlContractDbError>) -> Option<ContractViolation> {
    result.err().and_then(|e| e.violation())
}

#[tokio::test]
async fn one_and_many_together_never_reach_the_driver() {
    for n in 0..4 {
        let stub = StubBackend::with_rows(n);
        let db = database(&stub);

        for flags in [
            ResultFlags::ONE | ResultFlags::MANY,
            ResultFlags::ONE | ResultFlags::MANY | ResultFlags::NONE,
            ResultFlags::EMPTY,
        ] {
            let result = db.query("SELECT * FROM t", flags, &[]).await;
            assert!(
                matches!(result, Err(SqlContractDbError::InvalidMask(_))),
                "{flags} with {n} rows"
            );
        }
        assert_eq!(stub.leases(), 0);
        assert!(stub.statements().is_empty());
    }
}

#[tokio::test]
async fn none_mask() {
    let empty = StubBackend::with_rows(0);
    assert!(database(&empty).none("DELETE FROM t", &[]).await.is_ok());

    let one = StubBackend::with_rows(1);
    assert_eq!(
        violation(database(&one).none("DELETE FROM t RETURNING id", &[]).await),
        Some(ContractViolation::UnexpectedRows { received: 1 })
    );
}

#[tokio::test]
async fn one_mask() {
    for (n, expected) in [
        (0, Some(ContractViolation::NoDataOrTooMany { received: 0 })),
        (1, None),
        (3, Some(ContractViolation::NoDataOrTooMany { received: 3 })),
    ] {
        let stub = StubBackend::with_rows(n);
        let result = database(&stub).one("SELECT id FROM t", &[]).await;
        match expected {
            Some(v) => assert_eq!(violation(result), Some(v)),
            None => {
                let row = result.expect("single row");
                assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
            }
        }
    }
}

#[tokio::test]
async fn many_mask() {
    let empty = StubBackend::with_rows(0);
    assert_eq!(
        violation(database(&empty).many("SELECT id FROM t", &[]).await),
        Some(ContractViolation::NoData)
    );

    let three = StubBackend::with_rows(3);
    let rows = database(&three)
        .many("SELECT id FROM t", &[])
        .await
        .expect("rows");
    let ids: Vec<_> = rows.iter().filter_map(|r| r.get("id").and_then(RowValues::as_int)).collect();
    assert_eq!(ids, vec![&1, &2, &3]);
}

#[tokio::test]
async fn one_or_none_mask() {
    let empty = StubBackend::with_rows(0);
    assert_eq!(
        database(&empty).one_or_none("SELECT id FROM t", &[]).await.ok(),
        Some(None)
    );

    let one = StubBackend::with_rows(1);
    let row = database(&one)
        .one_or_none("SELECT id FROM t", &[])
        .await
        .expect("query");
    assert!(row.is_some());

    let two = StubBackend::with_rows(2);
    assert_eq!(
        violation(database(&two).one_or_none("SELECT id FROM t", &[]).await),
        Some(ContractViolation::TooManyRows { received: 2 })
    );
}

#[tokio::test]
async fn many_or_none_mask() {
    for n in [0, 1, 5] {
        let stub = StubBackend::with_rows(n);
        let db = database(&stub);
        assert_eq!(db.many_or_none("SELECT id FROM t", &[]).await.map(|r| r.len()).ok(), Some(n));
        assert_eq!(db.any("SELECT id FROM t", &[]).await.map(|r| r.len()).ok(), Some(n));
    }
}

#[tokio::test]
async fn query_returns_the_normalized_shape() {
    let stub = StubBackend::with_rows(1);
    let db = database(&stub);

    let single = db
        .query("SELECT id FROM t", ResultFlags::ONE | ResultFlags::NONE, &[])
        .await
        .expect("query");
    assert!(matches!(single, NormalizedResult::Single(_)));

    let multiple = db
        .query("SELECT id FROM t", ResultFlags::MANY, &[])
        .await
        .expect("query");
    assert!(matches!(multiple, NormalizedResult::Multiple(ref rows) if rows.len() == 1));
}

#[tokio::test]
async fn parameters_are_formatted_before_submission() {
    let stub = StubBackend::with_rows(1);
    let db = database(&stub);

    db.one(
        "SELECT * FROM $1:name WHERE name = $2 AND tags = $3",
        &[
            "people".into(),
            "O'Brien".into(),
            RowValues::Array(vec!["a".into(), RowValues::Null]),
        ],
    )
    .await
    .expect("query");

    assert_eq!(
        stub.statements(),
        vec![r#"SELECT * FROM "people" WHERE name = 'O''Brien' AND tags = array['a',null]"#]
    );
}

#[tokio::test]
async fn missing_parameter_fails_and_releases() {
    let stub = StubBackend::with_rows(1);
    let db = database(&stub);

    let result = db.one("SELECT $2", &[RowValues::Int(1)]).await;
    assert!(matches!(result, Err(SqlContractDbError::ParameterError(_))));
    assert!(stub.statements().is_empty());
    assert_eq!((stub.leases(), stub.releases()), (1, 1));
}

#[tokio::test]
async fn result_reports_rows_affected() {
    let stub = StubBackend::new(|_| Ok(ResultSet::affected(4)));
    let db = database(&stub);

    let rs = db.result("UPDATE t SET x = 1", &[]).await.expect("result");
    assert_eq!(rs.rows_affected, 4);
    assert!(rs.is_empty());
    assert!(db.none("UPDATE t SET x = 1", &[]).await.is_ok());
}

#[tokio::test]
async fn functions_and_procedures() {
    let stub = StubBackend::with_rows(1);
    let db = database(&stub);

    let rows = db.func("app.find_user", &[RowValues::Int(5)]).await.expect("func");
    assert_eq!(rows.len(), 1);
    let out = db.proc("cleanup", &["old".into()]).await.expect("proc");
    assert!(out.is_some());
    let scalar = db
        .func_with("now", &[], ResultFlags::ONE)
        .await
        .and_then(NormalizedResult::into_single);
    assert!(scalar.is_ok());

    assert_eq!(
        stub.statements(),
        vec![
            r#"SELECT * FROM "app"."find_user"(5)"#,
            r#"CALL "cleanup"('old')"#,
            r#"SELECT * FROM "now"()"#,
        ]
    );
}

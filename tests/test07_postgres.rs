#![cfg(feature = "postgres")]

//! Runs against a live server only when `SQL_CONTRACT_PG_URL` is set, e.g.
//! `postgres://testuser@localhost/testing`.

use std::env;

use sql_contract::prelude::*;

fn connection_url() -> Option<String> {
    env::var("SQL_CONTRACT_PG_URL").ok().filter(|url| !url.is_empty())
}

#[tokio::test]
async fn contracts_and_transactions_against_postgres() -> Result<(), SqlContractDbError> {
    let Some(url) = connection_url() else {
        eprintln!("SQL_CONTRACT_PG_URL not set; skipping");
        return Ok(());
    };

    let lib = SqlContract::new(InitOptions::default());
    let db = lib.postgres_with_options(
        url.parse()?,
        PoolOptions::default()
            .with_max_size(2)
            .with_exhaustion(PoolExhaustion::Timeout { wait_ms: 5_000 }),
    )?;

    db.task(|t| async move {
        t.none("DROP TABLE IF EXISTS contract_test", &[]).await?;
        t.none(
            "CREATE TABLE contract_test (id BIGINT PRIMARY KEY, name TEXT, score DOUBLE PRECISION, seen TIMESTAMP, tags TEXT[])",
            &[],
        )
        .await
    })
    .await?;

    let inserted = db
        .result(
            "INSERT INTO contract_test VALUES ($1, $2, $3, $4, $5), ($6, $7, null, null, null)",
            &[
                RowValues::Int(1),
                "O'Hara".into(),
                RowValues::Float(1.5),
                RowValues::Text("2024-01-02 03:04:05".into()),
                RowValues::Array(vec!["a".into(), "b".into()]),
                RowValues::Int(2),
                "Bo".into(),
            ],
        )
        .await?;
    assert_eq!(inserted.rows_affected, 2);

    let row = db
        .one("SELECT * FROM contract_test WHERE id = $1", &[RowValues::Int(1)])
        .await?;
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("O'Hara"));
    assert_eq!(row.get("score").and_then(RowValues::as_float), Some(1.5));
    assert!(row.get("seen").and_then(RowValues::as_timestamp).is_some());
    assert_eq!(
        row.get("tags").and_then(RowValues::as_array).map(<[RowValues]>::len),
        Some(2)
    );

    let violation = db.one("SELECT * FROM contract_test", &[]).await;
    assert_eq!(
        violation.err().and_then(|e| e.violation()),
        Some(ContractViolation::NoDataOrTooMany { received: 2 })
    );

    let rolled_back: Result<(), _> = db
        .transaction(|tx| async move {
            tx.none("DELETE FROM contract_test", &[]).await?;
            tx.one("SELECT * FROM contract_test", &[]).await?;
            Ok(())
        })
        .await;
    assert!(rolled_back.is_err());
    assert_eq!(db.many("SELECT id FROM contract_test", &[]).await?.len(), 2);

    db.transaction(|tx| async move {
        tx.none("DELETE FROM contract_test WHERE id = $1", &[RowValues::Int(2)])
            .await
    })
    .await?;
    assert!(
        db.one_or_none("SELECT id FROM contract_test WHERE id = 2", &[])
            .await?
            .is_none()
    );

    db.none("DROP TABLE contract_test", &[]).await?;
    lib.end();
    assert!(db.is_closed());
    Ok(())
}

#[tokio::test]
async fn multi_statement_text_and_text_rendered_types() -> Result<(), SqlContractDbError> {
    let Some(url) = connection_url() else {
        eprintln!("SQL_CONTRACT_PG_URL not set; skipping");
        return Ok(());
    };

    let lib = SqlContract::new(InitOptions::default());
    let db = lib.postgres(url.parse()?)?;

    let last = db
        .task(|t| async move {
            t.none(
                "CREATE TEMP TABLE multi_test (id INT); INSERT INTO multi_test VALUES (1), (2)",
                &[],
            )
            .await?;
            t.one("SELECT count(*) FROM multi_test; SELECT 7 AS last", &[])
                .await
        })
        .await?;
    assert_eq!(last.get("last").and_then(RowValues::as_text), Some("7"));

    db.transaction(|tx| async move {
        tx.none(
            "CREATE TEMP TABLE tx_multi (id INT) ON COMMIT DROP; INSERT INTO tx_multi VALUES (1)",
            &[],
        )
        .await
    })
    .await?;

    let avg = db
        .one("SELECT avg(x) AS s FROM (VALUES (1), (2)) v(x)", &[])
        .await?;
    let avg = avg.get("s").and_then(RowValues::as_text).map(str::to_owned);
    assert!(avg.as_deref().is_some_and(|s| s.starts_with("1.5")), "{avg:?}");

    let id = db
        .one("SELECT 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS u", &[])
        .await?;
    assert_eq!(
        id.get("u").and_then(RowValues::as_text),
        Some("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11")
    );

    let missing = db.one("SELECT NULL::numeric AS n", &[]).await?;
    assert_eq!(missing.get("n"), Some(&RowValues::Null));

    lib.end();
    Ok(())
}

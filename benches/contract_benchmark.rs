use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use sql_contract::prelude::*;
use sql_contract::test_utils::{StubBackend, rows};
use tokio::runtime::Runtime;

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    for n in [0usize, 1, 100] {
        let input = rows(n);
        group.bench_with_input(BenchmarkId::new("many_or_none", n), &input, |b, input| {
            b.iter(|| validate(input.clone(), QueryResultMask::ManyOrNone));
        });
    }
    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let params = vec![
        RowValues::Int(42),
        RowValues::Text("it's a name".into()),
        RowValues::JSON(json!({"tags": ["a", "b"], "score": 1.5})),
        RowValues::Array((0..20).map(RowValues::Int).collect()),
    ];
    let sql = "SELECT * FROM t /* $9 */ WHERE id = $1 AND name = $2 AND meta = $3 AND x IN ($4:csv)";

    c.bench_function("format_query", |b| {
        b.iter(|| format_query(sql, &params));
    });
}

fn bench_stub_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let stub = StubBackend::with_rows(1);
    let db = SqlContract::new(InitOptions::default()).database(stub.backend(), "bench");

    c.bench_function("one_via_stub", |b| {
        b.to_async(&rt)
            .iter(|| async { db.one("SELECT $1", &[RowValues::Int(1)]).await });
    });
    c.bench_function("transaction_via_stub", |b| {
        b.to_async(&rt).iter(|| async {
            db.transaction(|tx| async move { tx.one("SELECT 1", &[]).await })
                .await
        });
    });
}

criterion_group!(benches, bench_validate, bench_format, bench_stub_round_trip);
criterion_main!(benches);

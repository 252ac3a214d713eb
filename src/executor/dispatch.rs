use crate::contract::{NormalizedResult, validate};
use crate::error::SqlContractDbError;
use crate::formatting::format_query;
use crate::mask::{QueryResultMask, ResultFlags};
use crate::pool::{ConnectionBroker, ErrorEvent, Lease, QueryEvent};
use crate::results::ResultSet;
use crate::types::RowValues;

/// Execute `sql` and shape its rows according to `flags`.
///
/// Invalid flags are rejected before any connection is leased or statement sent.
///
/// # Errors
/// Returns `InvalidMask`, a contract violation, a parameter formatting error, or
/// the pool/driver error. A locally leased connection is released first.
pub async fn execute(
    broker: &ConnectionBroker,
    sql: &str,
    params: &[RowValues],
    flags: ResultFlags,
    held: Option<&mut Lease>,
) -> Result<NormalizedResult, SqlContractDbError> {
    let outcome = match QueryResultMask::new(flags) {
        Ok(mask) => run(broker, sql, params, held)
            .await
            .and_then(|rows| validate(rows, mask)),
        Err(e) => Err(e),
    };
    outcome.inspect_err(|error| report(broker, sql, error))
}

/// Execute `sql` and return the raw result set, without a contract.
///
/// # Errors
/// Returns a parameter formatting error or the pool/driver error. A locally
/// leased connection is released first.
pub async fn fetch(
    broker: &ConnectionBroker,
    sql: &str,
    params: &[RowValues],
    held: Option<&mut Lease>,
) -> Result<ResultSet, SqlContractDbError> {
    run(broker, sql, params, held)
        .await
        .inspect_err(|error| report(broker, sql, error))
}

async fn run(
    broker: &ConnectionBroker,
    sql: &str,
    params: &[RowValues],
    held: Option<&mut Lease>,
) -> Result<ResultSet, SqlContractDbError> {
    match held {
        Some(lease) => submit(broker, lease, sql, params).await,
        None => {
            let mut lease = broker.lease().await?;
            let outcome = submit(broker, &mut lease, sql, params).await;
            lease.release();
            outcome
        }
    }
}

async fn submit(
    broker: &ConnectionBroker,
    lease: &mut Lease,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlContractDbError> {
    let text = format_query(sql, params)?;
    let event = QueryEvent {
        lease: lease.id(),
        database: broker.database(),
        sql: &text,
    };
    broker.observers().emit("query", |o| o.on_query(&event));
    lease.query(&text).await
}

fn report(broker: &ConnectionBroker, sql: &str, error: &SqlContractDbError) {
    tracing::debug!(database = broker.database(), error = %error, "query failed");
    let event = ErrorEvent {
        database: broker.database(),
        sql,
        error,
    };
    broker.observers().emit("error", |o| o.on_error(&event));
}

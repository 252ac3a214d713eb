use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};

use futures_util::FutureExt;

use crate::error::SqlContractDbError;
use crate::pool::{TransactionEvent, TransactionPhase};

use super::context::{HeldConnection, TransactionContext};
use super::state::{Boundaries, TxMode, TxState};

/// How a transaction body ended, after its boundary statements ran.
pub(crate) enum TxOutcome<T> {
    Finished(Result<T, SqlContractDbError>),
    /// The body panicked; ROLLBACK was attempted before this was returned.
    Panicked(Box<dyn Any + Send>),
}

impl<T> TxOutcome<T> {
    /// Hand back the result, or continue unwinding a captured panic.
    pub(crate) fn resolve(self) -> Result<T, SqlContractDbError> {
        match self {
            TxOutcome::Finished(result) => result,
            TxOutcome::Panicked(payload) => resume_unwind(payload),
        }
    }
}

/// Run one transaction level on `held`.
///
/// Depth 0 opens a real transaction with `mode`; deeper levels use savepoints
/// and ignore `mode`. The caller owns the lease and releases it afterwards.
pub(crate) async fn run<T, F, Fut>(
    held: &HeldConnection,
    mode: &TxMode,
    depth: u32,
    body: F,
) -> TxOutcome<T>
where
    F: FnOnce(TransactionContext) -> Fut + Send,
    Fut: Future<Output = Result<T, SqlContractDbError>> + Send,
    T: Send,
{
    let bounds = Boundaries::new(mode, depth);
    let top_level = depth == 0;
    let ctx = TransactionContext::new(held.clone(), depth);

    if let Err(begin_error) = held.boundary(&bounds.begin, top_level.then_some(true)).await {
        tracing::debug!(lease = %held.id(), depth, error = %begin_error, "transaction did not start");
        let error = roll_back(&ctx, &bounds, begin_error).await;
        return TxOutcome::Finished(Err(error));
    }
    notify(&ctx, TransactionPhase::Begin);

    let scoped = ctx.clone();
    let outcome = AssertUnwindSafe(async move { body(scoped).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => {
            ctx.set_state(TxState::Committing);
            match held.boundary(&bounds.commit, top_level.then_some(false)).await {
                Ok(()) => {
                    ctx.set_state(TxState::Closed);
                    notify(&ctx, TransactionPhase::Commit);
                    TxOutcome::Finished(Ok(value))
                }
                Err(commit_error) => {
                    TxOutcome::Finished(Err(roll_back(&ctx, &bounds, commit_error).await))
                }
            }
        }
        Ok(Err(body_error)) => TxOutcome::Finished(Err(roll_back(&ctx, &bounds, body_error).await)),
        Err(payload) => {
            let reason = SqlContractDbError::TransactionError(format!(
                "transaction body panicked: {}",
                panic_message(payload.as_ref())
            ));
            let error = roll_back(&ctx, &bounds, reason).await;
            tracing::warn!(lease = %held.id(), depth, error = %error, "transaction body panicked");
            TxOutcome::Panicked(payload)
        }
    }
}

/// Best-effort ROLLBACK. Returns `reason`, or `RollbackFailed` carrying it when
/// the ROLLBACK statement fails too.
async fn roll_back(
    ctx: &TransactionContext,
    bounds: &Boundaries,
    reason: SqlContractDbError,
) -> SqlContractDbError {
    ctx.set_state(TxState::RollingBack);
    let held = ctx.held();
    let closes = (ctx.depth() == 0).then_some(false);
    let result = held.boundary(&bounds.rollback, closes).await;
    ctx.set_state(TxState::Closed);
    notify(ctx, TransactionPhase::Rollback);

    match result {
        Ok(()) => reason,
        Err(rollback_error) => {
            tracing::warn!(
                lease = %held.id(),
                depth = ctx.depth(),
                error = %rollback_error,
                "rollback failed"
            );
            reason.with_rollback_failure(rollback_error)
        }
    }
}

fn notify(ctx: &TransactionContext, phase: TransactionPhase) {
    let broker = ctx.held().broker();
    let event = TransactionEvent {
        lease: ctx.lease_id(),
        database: broker.database_label(),
        depth: ctx.depth(),
        phase,
    };
    broker
        .observers()
        .emit("transaction", |o| o.on_transaction(&event));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "non-string payload"
    }
}

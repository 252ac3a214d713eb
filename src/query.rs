use std::future::Future;

use crate::contract::NormalizedResult;
use crate::error::SqlContractDbError;
use crate::formatting::as_name;
use crate::mask::ResultFlags;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Per-query operations shared by databases, tasks, transactions and direct
/// connections.
///
/// Implementors supply [`QueryOps::query`] and [`QueryOps::result`]; the
/// shape-specific helpers bind a fixed mask on top of `query`.
///
/// ```rust,no_run
/// use sql_contract::prelude::*;
///
/// # async fn demo(db: &Database) -> Result<(), SqlContractDbError> {
/// let user = db
///     .one("SELECT * FROM users WHERE id = $1", &[RowValues::Int(1)])
///     .await?;
/// let maybe = db
///     .one_or_none("SELECT * FROM users WHERE email = $1", &["a@b.c".into()])
///     .await?;
/// db.none("DELETE FROM sessions WHERE user_id = $1", &[RowValues::Int(1)])
///     .await?;
/// # let _ = (user, maybe);
/// # Ok(()) }
/// ```
pub trait QueryOps: Sync {
    /// Run `sql` and shape the rows according to `flags`.
    fn query(
        &self,
        sql: &str,
        flags: ResultFlags,
        params: &[RowValues],
    ) -> impl Future<Output = Result<NormalizedResult, SqlContractDbError>> + Send;

    /// Run `sql` and return the raw result set, including `rows_affected`.
    fn result(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<ResultSet, SqlContractDbError>> + Send;

    /// Exactly one row.
    fn one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<CustomDbRow, SqlContractDbError>> + Send {
        async move { self.query(sql, ResultFlags::ONE, params).await?.into_single() }
    }

    /// One or more rows.
    fn many(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Vec<CustomDbRow>, SqlContractDbError>> + Send {
        async move {
            Ok(self
                .query(sql, ResultFlags::MANY, params)
                .await?
                .into_rows())
        }
    }

    /// No rows.
    fn none(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<(), SqlContractDbError>> + Send {
        async move {
            self.query(sql, ResultFlags::NONE, params).await?;
            Ok(())
        }
    }

    /// Zero or one row.
    fn one_or_none(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Option<CustomDbRow>, SqlContractDbError>> + Send {
        async move {
            self.query(sql, ResultFlags::ONE | ResultFlags::NONE, params)
                .await?
                .into_optional()
        }
    }

    /// Any number of rows.
    fn many_or_none(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Vec<CustomDbRow>, SqlContractDbError>> + Send {
        async move {
            Ok(self
                .query(sql, ResultFlags::MANY | ResultFlags::NONE, params)
                .await?
                .into_rows())
        }
    }

    /// Alias of [`QueryOps::many_or_none`].
    fn any(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Vec<CustomDbRow>, SqlContractDbError>> + Send {
        self.many_or_none(sql, params)
    }

    /// Call a set-returning or scalar function: `SELECT * FROM name(params...)`.
    fn func(
        &self,
        name: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Vec<CustomDbRow>, SqlContractDbError>> + Send {
        async move {
            Ok(self
                .func_with(name, params, ResultFlags::MANY | ResultFlags::NONE)
                .await?
                .into_rows())
        }
    }

    /// Call a function under an explicit result mask.
    fn func_with(
        &self,
        name: &str,
        params: &[RowValues],
        flags: ResultFlags,
    ) -> impl Future<Output = Result<NormalizedResult, SqlContractDbError>> + Send {
        async move {
            let sql = routine_sql("SELECT * FROM", name, params.len())?;
            self.query(&sql, flags, params).await
        }
    }

    /// Invoke a stored procedure: `CALL name(params...)`.
    ///
    /// Procedures normally return nothing; one row comes back when the
    /// procedure has `INOUT` arguments.
    fn proc(
        &self,
        name: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<Option<CustomDbRow>, SqlContractDbError>> + Send {
        async move {
            let sql = routine_sql("CALL", name, params.len())?;
            self.query(&sql, ResultFlags::ONE | ResultFlags::NONE, params)
                .await?
                .into_optional()
        }
    }
}

/// `<prefix> "name"($1,...,$n)`
fn routine_sql(prefix: &str, name: &str, arity: usize) -> Result<String, SqlContractDbError> {
    let args: Vec<String> = (1..=arity).map(|i| format!("${i}")).collect();
    Ok(format!("{prefix} {}({})", as_name(name)?, args.join(",")))
}

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::{SimpleQueryMessage, Statement};
use uuid::Uuid;

use crate::error::SqlContractDbError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, SqlContractDbError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Build a result set from a simple-query exchange, which is how
/// multi-statement text runs. Only the last statement's rows are kept and
/// every value arrives as text.
///
/// # Errors
/// Returns `ExecutionError` when the affected-row count does not fit `usize`.
pub fn build_result_set_from_simple(
    messages: &[SimpleQueryMessage],
) -> Result<ResultSet, SqlContractDbError> {
    let mut pending = Vec::new();
    let mut last = (Vec::new(), 0u64);
    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => pending.push(row),
            SimpleQueryMessage::CommandComplete(affected) => {
                last = (std::mem::take(&mut pending), *affected);
            }
            _ => {}
        }
    }

    let (rows, affected) = last;
    let affected = usize::try_from(affected).map_err(|e| {
        SqlContractDbError::ExecutionError(format!("postgres affected rows conversion error: {e}"))
    })?;
    let Some(first) = rows.first() else {
        return Ok(ResultSet::affected(affected));
    };

    let column_names: Vec<String> = first
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));
    for row in rows {
        let row_values = (0..column_count)
            .map(|idx| nullable(row.get(idx), |v| RowValues::Text(v.to_string())))
            .collect();
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

fn nullable<T>(value: Option<T>, wrap: impl FnOnce(T) -> RowValues) -> RowValues {
    value.map_or(RowValues::Null, wrap)
}

fn array<T: Into<RowValues>>(value: Option<Vec<Option<T>>>) -> RowValues {
    nullable(value, |items| {
        RowValues::Array(items.into_iter().map(RowValues::from).collect())
    })
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlContractDbError` if the column cannot be read or its type has
/// no `RowValues` counterpart.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlContractDbError> {
    let column = row.columns().get(idx).ok_or_else(|| {
        SqlContractDbError::ExecutionError(format!("column index {idx} is out of range"))
    })?;
    let type_info = column.type_();

    let value = match type_info.name() {
        "int2" => nullable(row.try_get::<_, Option<i16>>(idx)?, |v| {
            RowValues::Int(i64::from(v))
        }),
        "int4" => nullable(row.try_get::<_, Option<i32>>(idx)?, |v| {
            RowValues::Int(i64::from(v))
        }),
        "int8" => nullable(row.try_get::<_, Option<i64>>(idx)?, RowValues::Int),
        "oid" => nullable(row.try_get::<_, Option<u32>>(idx)?, |v| {
            RowValues::Int(i64::from(v))
        }),
        "float4" => nullable(row.try_get::<_, Option<f32>>(idx)?, |v| {
            RowValues::Float(f64::from(v))
        }),
        "float8" => nullable(row.try_get::<_, Option<f64>>(idx)?, RowValues::Float),
        "bool" => nullable(row.try_get::<_, Option<bool>>(idx)?, RowValues::Bool),
        // numeric keeps its exact digits as text
        "numeric" => nullable(row.try_get::<_, Option<Decimal>>(idx)?, |v| {
            RowValues::Text(v.to_string())
        }),
        "uuid" => nullable(row.try_get::<_, Option<Uuid>>(idx)?, |v| {
            RowValues::Text(v.to_string())
        }),
        "timestamp" => nullable(
            row.try_get::<_, Option<NaiveDateTime>>(idx)?,
            RowValues::Timestamp,
        ),
        // timestamptz decodes as UTC
        "timestamptz" => nullable(row.try_get::<_, Option<DateTime<Utc>>>(idx)?, |v| {
            RowValues::Timestamp(v.naive_utc())
        }),
        "date" => nullable(row.try_get::<_, Option<NaiveDate>>(idx)?, |v| {
            RowValues::Text(v.format("%Y-%m-%d").to_string())
        }),
        "json" | "jsonb" => nullable(row.try_get::<_, Option<Value>>(idx)?, RowValues::JSON),
        "bytea" => nullable(row.try_get::<_, Option<Vec<u8>>>(idx)?, RowValues::Blob),
        "_int4" => array(row.try_get::<_, Option<Vec<Option<i32>>>>(idx)?),
        "_int8" => array(row.try_get::<_, Option<Vec<Option<i64>>>>(idx)?),
        "_bool" => array(row.try_get::<_, Option<Vec<Option<bool>>>>(idx)?),
        "_float8" => array(row.try_get::<_, Option<Vec<Option<f64>>>>(idx)?),
        "_text" | "_varchar" => array(row.try_get::<_, Option<Vec<Option<String>>>>(idx)?),
        "void" => RowValues::Null,
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(text) => nullable(text, RowValues::Text),
            Err(_) => {
                return Err(SqlContractDbError::ExecutionError(format!(
                    "column \"{}\" has unsupported type {}",
                    column.name(),
                    type_info.name()
                )));
            }
        },
    };
    Ok(value)
}

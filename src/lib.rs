//! Declarative result contracts and transaction lifecycles over pooled SQL
//! connections.
//!
//! Each query states the result shapes it accepts through [`ResultFlags`];
//! the rows that come back are checked against that mask and reduced to one
//! [`NormalizedResult`]. Connections are leased per query and released on
//! every exit path, or held for the body of a [`Database::task`] or
//! [`Database::transaction`].
//!
//! ```rust,no_run
//! use sql_contract::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlContractDbError> {
//! let lib = SqlContract::new(InitOptions::default());
//! let db = lib.postgres("postgres://app@localhost/shop".parse()?)?;
//!
//! let user = db.one_or_none("SELECT * FROM users WHERE id = $1", &[RowValues::Int(42)]).await?;
//! let rows = db.query("SELECT * FROM users", ResultFlags::MANY | ResultFlags::NONE, &[]).await?;
//! # let _ = (user, rows);
//! lib.end();
//! # Ok(()) }
//! ```

pub mod config;
pub mod contract;
pub mod database;
pub mod error;
pub mod executor;
pub mod formatting;
pub mod library;
pub mod mask;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConnectionConfig, ConnectionParams, PoolExhaustion, PoolOptions};
pub use contract::{NormalizedResult, validate};
pub use database::{Database, DirectConnection};
pub use error::{ContractViolation, SqlContractDbError};
pub use library::{InitOptions, SqlContract};
pub use mask::{QueryResultMask, ResultFlags};
pub use query::QueryOps;
pub use results::{CustomDbRow, ResultSet};
pub use transaction::{IsolationLevel, TaskContext, TransactionContext, TxMode, TxState};
pub use types::RowValues;

//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConnectionConfig, ConnectionParams, PoolExhaustion, PoolOptions};
pub use crate::contract::{NormalizedResult, validate};
pub use crate::database::{Database, DirectConnection};
pub use crate::error::{ContractViolation, SqlContractDbError};
pub use crate::formatting::{as_name, format_query};
pub use crate::library::{InitOptions, SqlContract};
pub use crate::mask::{QueryResultMask, ResultFlags};
pub use crate::pool::{
    ConnectEvent, ConnectionObserver, ErrorEvent, LeaseId, PoolBackend, QueryEvent,
    TransactionEvent, TransactionPhase, WireConnection,
};
pub use crate::query::QueryOps;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::transaction::{IsolationLevel, TaskContext, TransactionContext, TxMode, TxState};
pub use crate::types::RowValues;

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresBackend;

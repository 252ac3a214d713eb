// PostgreSQL backend:
// - config: connection description to deadpool-postgres pool
// - connection: pool and client behind the backend traits
// - query: row extraction into `ResultSet`

pub mod config;
pub mod connection;
pub mod query;

pub use config::{build_pool, pg_config};
pub use connection::{PostgresBackend, PostgresConnection};
pub use query::{build_result_set_from_statement, postgres_extract_value};

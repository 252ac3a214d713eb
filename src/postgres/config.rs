use deadpool_postgres::{Config as PgConfig, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

use crate::config::{ConnectionConfig, PoolOptions};
use crate::error::SqlContractDbError;

/// Translate a connection description into a deadpool-postgres config.
///
/// # Errors
/// Returns `SqlContractDbError::ConfigError` when a required field is missing
/// or the connection string does not parse.
pub fn pg_config(
    config: &ConnectionConfig,
    options: &PoolOptions,
) -> Result<PgConfig, SqlContractDbError> {
    config.validate()?;
    options.validate()?;

    let mut pg_config = PgConfig::new();
    match config {
        ConnectionConfig::Url(url) => {
            let parsed: tokio_postgres::Config = url.parse().map_err(|e| {
                SqlContractDbError::ConfigError(format!("invalid connection string: {e}"))
            })?;
            if parsed.get_hosts().is_empty() {
                return Err(SqlContractDbError::ConfigError(
                    "host is required".to_string(),
                ));
            }
            if parsed.get_dbname().is_none() {
                return Err(SqlContractDbError::ConfigError(
                    "dbname is required".to_string(),
                ));
            }
            if parsed.get_user().is_none() {
                return Err(SqlContractDbError::ConfigError(
                    "user is required".to_string(),
                ));
            }
            pg_config.url = Some(url.clone());
        }
        ConnectionConfig::Params(params) => {
            pg_config.host = Some(params.host.clone());
            pg_config.port = Some(params.port);
            pg_config.dbname = Some(params.database.clone());
            pg_config.user = Some(params.user.clone());
            pg_config.password.clone_from(&params.password);
            pg_config.application_name.clone_from(&params.application_name);
        }
    }

    let mut pool = PoolConfig::new(options.max_size);
    pool.timeouts.wait = options.exhaustion.wait_timeout();
    pg_config.pool = Some(pool);
    Ok(pg_config)
}

/// Create the pool. No connection is opened until the first lease.
///
/// # Errors
/// Returns `SqlContractDbError::ConfigError` for bad configuration or
/// `SqlContractDbError::ConnectionError` if the pool cannot be created.
pub fn build_pool(
    config: &ConnectionConfig,
    options: &PoolOptions,
) -> Result<Pool, SqlContractDbError> {
    pg_config(config, options)?
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| {
            SqlContractDbError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
        })
}

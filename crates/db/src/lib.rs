//! Database layer for hollow-rs.
//!
//! Posts, comments and the notification tables are the system of record.
//! Everything in the fast store is derived from them.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use hollow_common::config::DatabaseConfig;
use hollow_common::AppError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing::log::LevelFilter;

/// Upper bound on opening a connection or checking one out of the pool.
const POOL_WAIT: Duration = Duration::from_secs(10);
/// Idle connections above the minimum are closed after this long.
const POOL_IDLE: Duration = Duration::from_secs(600);
/// Connections are recycled after this long regardless of use.
const POOL_LIFETIME: Duration = Duration::from_secs(1800);

/// Pool options for the configured database. Statements are logged at debug.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.url.as_str());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(POOL_WAIT)
        .acquire_timeout(POOL_WAIT)
        .idle_timeout(POOL_IDLE)
        .max_lifetime(POOL_LIFETIME)
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &DatabaseConfig) -> Result<DatabaseConnection, AppError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );
    Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !pending.is_empty() {
        info!(count = pending.len(), "Applying migrations");
    }
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_follow_config() {
        let config = DatabaseConfig {
            url: "postgres://hollow@localhost/hollow".to_string(),
            max_connections: 32,
            min_connections: 4,
        };

        let opt = connect_options(&config);
        assert_eq!(opt.get_url(), "postgres://hollow@localhost/hollow");
        assert_eq!(opt.get_max_connections(), Some(32));
        assert_eq!(opt.get_min_connections(), Some(4));
        assert_eq!(opt.get_acquire_timeout(), Some(POOL_WAIT));
        assert_eq!(opt.get_max_lifetime(), Some(POOL_LIFETIME));
    }
}

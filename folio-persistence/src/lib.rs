use folio_core::config::persistence::Persistence;
use folio_persistence_migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

pub mod interpreter_option;
pub mod job;
pub mod job_batch;
pub mod job_payload;
pub mod job_result;
pub mod schedule;

pub async fn database_connection(config: &Persistence) -> Result<DatabaseConnection, DbErr> {
    let mut connect_opts = ConnectOptions::from(&config.database_connection_string);

    if let Some(max_connections) = config.max_connections {
        connect_opts.max_connections(max_connections);
        connect_opts.min_connections(max_connections.min(1));
    }

    connect_opts.sqlx_logging(true);
    connect_opts.sqlx_logging_level(log::LevelFilter::Trace);
    connect_opts
        .sqlx_slow_statements_logging_settings(log::LevelFilter::Warn, Duration::from_millis(100));

    Database::connect(connect_opts).await
}

pub async fn apply_migrations(connection: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(connection, None).await
}

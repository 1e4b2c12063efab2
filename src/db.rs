use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::migration::Migrator;

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
///
/// SQLite gets a single pooled connection: writers serialise on it, and an
/// in-memory database lives exactly as long as that connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url);
    options
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    if database_url.starts_with("sqlite:") {
        options
            .max_connections(1)
            .min_connections(1);
    } else {
        options.max_connections(20);
    }

    let conn = Database::connect(options).await?;
    Ok(conn)
}

pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}

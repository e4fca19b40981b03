use diesel::r2d2::ConnectionManager;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{info, warn};
use thiserror::Error;

pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub const DEFAULT_DATABASE_URL: &str = "geo.sqlite";
pub const DEFAULT_DB_POOL_SIZE: u32 = 15;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to create db pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Error while running migrations: {0}")]
    Migration(String)
}

pub fn init_connection_pool(database_url: &str, pool_size: u32) -> Result<Pool, DbError> {
    // Every connection to ":memory:" opens its own empty database
    let pool_size = if database_url == ":memory:" && pool_size != 1 {
        warn!("In-memory database requested, limiting the pool to a single connection");
        1
    } else {
        pool_size
    };

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(pool_size)
        .build(manager)?;

    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), DbError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| DbError::Migration(err.to_string()))?;

    for version in applied {
        info!("Applied migration {}", version);
    }
    Ok(())
}

#[cfg(test)]
pub fn establish_test_connection() -> SqliteConnection {
    use diesel::Connection;

    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Couldn't open in-memory database");
    run_migrations(&mut conn).expect("Error while running migrations");
    conn
}

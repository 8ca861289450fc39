use anyhow::Result;
use sqlx::{
    PgPool, Postgres,
    migrate::MigrateDatabase,
    postgres::PgPoolOptions,
};
use std::sync::OnceLock;

pub mod models;
pub mod repositories;
pub mod transaction;
pub mod utils;

static POOL: OnceLock<PgPool> = OnceLock::new();

/// Create the database if needed, connect, run migrations and register the global pool.
pub async fn init_database(database_url: &str) -> Result<&'static PgPool> {
    if !Postgres::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database {}", database_url);
        Postgres::create_database(database_url).await?;
    } else {
        log::debug!("Database already exists");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Migrations completed successfully");

    Ok(POOL.get_or_init(|| pool))
}

/// Register a pool that only connects on first use. Handlers that fail before
/// touching the database never open a connection.
pub fn init_pool_lazy(database_url: &str) -> Result<&'static PgPool> {
    if let Some(pool) = POOL.get() {
        return Ok(pool);
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy(database_url)?;

    Ok(POOL.get_or_init(|| pool))
}

pub fn get_pool() -> &'static PgPool {
    POOL.get()
        .expect("database pool accessed before init_database/init_pool_lazy")
}

pub async fn ping() -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(get_pool())
        .await
        .is_ok()
}

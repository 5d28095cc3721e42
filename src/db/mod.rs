pub mod enums;
pub mod models;
pub mod repository;
pub mod services;

pub use repository::{MonitorRepository, PgRepository, RepositoryError};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connects the shared pool and brings the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

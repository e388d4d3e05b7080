use anyhow::Context;
use deadpool_redis::{Config, Pool as Redis, Runtime};
use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Build the Postgres connection pool and bring the schema up to date
pub async fn init_postgres_connection(database_url: &Secret<String>) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url.expose_secret())
        .await
        .context("Could not connect to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Could not run database migrations")?;

    Ok(pool)
}

pub fn init_redis_connection(url: &str) -> anyhow::Result<Redis> {
    Config::from_url(url)
        .create_pool(Some(Runtime::Tokio1))
        .context("Could not connect to redis")
}

use std::net::TcpListener;
use std::sync::Arc;

use tracing::info;

use article_feed::dao::articles::PgArticleStore;
use article_feed::dao::memory::{MemoryArticleStore, MemoryUserStore};
use article_feed::dao::users::PgUserStore;
use article_feed::database::{init_postgres_connection, init_redis_connection};
use article_feed::model::configuration::{ApplicationConfiguration, StorageKind};
use article_feed::observability::{get_subscriber, init_subscriber};
use article_feed::startup::{build_state, startup, AppState};
use article_feed::store::{MemoryTokenStore, RedisTokenStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init dotenv
    dotenvy::dotenv().ok();

    let configuration = ApplicationConfiguration::from_env()?;
    init_subscriber(get_subscriber(&configuration))?;

    let listener = TcpListener::bind(&configuration.listen_on)?;

    let state = build_application_state(&configuration).await?;

    info!(
        "Listening on {} with {:?} storage",
        configuration.listen_on, configuration.storage
    );
    startup(state, configuration, listener).await
}

async fn build_application_state(
    configuration: &ApplicationConfiguration,
) -> anyhow::Result<AppState> {
    Ok(match (configuration.storage, &configuration.database_url) {
        (StorageKind::Postgres, Some(database_url)) => {
            let pool = init_postgres_connection(database_url).await?;
            let redis = init_redis_connection(&configuration.redis_url)?;

            build_state(
                Arc::new(PgArticleStore::new(pool.clone())),
                Arc::new(PgUserStore::new(pool)),
                Arc::new(RedisTokenStore::new(redis)),
            )
        }
        (StorageKind::Postgres, None) => {
            anyhow::bail!("DATABASE_URL env variable should be set")
        }
        (StorageKind::Memory, _) => {
            tracing::warn!("Using in-memory storage, everything is lost on restart");

            build_state(
                Arc::new(MemoryArticleStore::new()),
                Arc::new(MemoryUserStore::new()),
                Arc::new(MemoryTokenStore::new()),
            )
        }
    })
}

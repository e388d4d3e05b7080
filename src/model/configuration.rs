use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::Duration;
use secrecy::Secret;

/// Which backend holds articles, users and refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Postgres for articles and users, redis for refresh tokens
    Postgres,
    /// Everything in memory, lost on restart. Handy for local development.
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow!("Unknown storage kind {other}")),
        }
    }
}

/// Where the spans go, besides stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingExporter {
    Stdout,
    Datadog { agent: String },
    Jaeger,
}

impl TracingExporter {
    /// Datadog wins when both exporters are enabled
    pub fn select(datadog_enabled: bool, jaeger_enabled: bool, datadog_agent: Option<String>) -> Self {
        if datadog_enabled {
            TracingExporter::Datadog {
                agent: datadog_agent.unwrap_or_else(|| "http://127.0.0.1:8126".to_owned()),
            }
        } else if jaeger_enabled {
            TracingExporter::Jaeger
        } else {
            TracingExporter::Stdout
        }
    }
}

/// # Application configuration
#[derive(Debug, Clone)]
pub struct ApplicationConfiguration {
    pub listen_on: String,
    pub storage: StorageKind,
    pub database_url: Option<Secret<String>>,
    pub redis_url: String,
    pub jwt_secret: Secret<String>,
    /// Allow user creation through the sign-up route
    pub allow_account_creation: bool,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub rate_limiting_fill_rate: u64,
    pub rate_limiting_bucket_size: u32,
    /// Origin of the web client, allowed to call the API with its cookies
    pub front_end_url: String,
    pub service_name: String,
    /// Default log filter, `RUST_LOG` takes precedence
    pub log_filter: String,
    pub tracing_exporter: TracingExporter,
}

impl ApplicationConfiguration {
    /// Configuration with default values and the given JWT secret
    pub fn new(jwt_secret: Secret<String>) -> Self {
        ApplicationConfiguration {
            listen_on: String::from("0.0.0.0:8080"),
            storage: StorageKind::Postgres,
            database_url: None,
            redis_url: String::from("redis://127.0.0.1"),
            jwt_secret,
            allow_account_creation: true,
            access_token_ttl: Duration::minutes(5),
            refresh_token_ttl: Duration::days(7),
            rate_limiting_fill_rate: 10,
            rate_limiting_bucket_size: 100,
            front_end_url: String::from("http://localhost:3000"),
            service_name: String::from("article_feed"),
            log_filter: String::from("info"),
            tracing_exporter: TracingExporter::Stdout,
        }
    }

    /// Load the configuration from the environment
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET environment variable is mandatory")?;
        let defaults = ApplicationConfiguration::new(Secret::new(jwt_secret));

        let storage = try_load("ARTICLE_FEED_STORAGE", defaults.storage_name())?;
        let database_url = env::var("DATABASE_URL").ok().map(Secret::new);
        if storage == StorageKind::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL env variable should be set"));
        }

        let rate_limiting_fill_rate = try_load("RATE_LIMITING_FILL_RATE", "10")?;
        let rate_limiting_bucket_size = try_load("RATE_LIMITING_BUCKET_SIZE", "100")?;
        if rate_limiting_fill_rate == 0 || rate_limiting_bucket_size == 0 {
            return Err(anyhow!("Rate limiting values must be greater than zero"));
        }

        Ok(ApplicationConfiguration {
            listen_on: env::var("ARTICLE_FEED_LISTEN_ON").unwrap_or(defaults.listen_on),
            storage,
            database_url,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            jwt_secret: defaults.jwt_secret,
            allow_account_creation: try_load("ARTICLE_FEED_ALLOW_ACCOUNT_CREATION", "true")?,
            access_token_ttl: Duration::minutes(try_load("ACCESS_TOKEN_TTL_MINUTES", "5")?),
            refresh_token_ttl: Duration::days(try_load("REFRESH_TOKEN_TTL_DAYS", "7")?),
            rate_limiting_fill_rate,
            rate_limiting_bucket_size,
            front_end_url: env::var("FRONT_END_URL").unwrap_or(defaults.front_end_url),
            service_name: env::var("ARTICLE_FEED_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_filter: env::var("ARTICLE_FEED_LOG_FILTER").unwrap_or(defaults.log_filter),
            tracing_exporter: TracingExporter::select(
                env::var("DD_ENABLED").is_ok(),
                env::var("JAEGER_ENABLED").is_ok(),
                env::var("DD_AGENT").ok(),
            ),
        })
    }

    fn storage_name(&self) -> &'static str {
        match self.storage {
            StorageKind::Postgres => "postgres",
            StorageKind::Memory => "memory",
        }
    }
}

fn try_load<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        tracing::debug!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {value}: {e}"))
}

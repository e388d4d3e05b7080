use anyhow::Context;
use opentelemetry_sdk::trace::{self, RandomIdGenerator, Sampler, Tracer};
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::model::configuration::{ApplicationConfiguration, TracingExporter};

/// Subscriber printing to stdout, plus the configured OpenTelemetry exporter
pub fn get_subscriber(configuration: &ApplicationConfiguration) -> impl Subscriber + Sync + Send {
    let name = configuration.service_name.as_str();
    let tracer = match &configuration.tracing_exporter {
        TracingExporter::Stdout => None,
        TracingExporter::Datadog { agent } => datadog_tracer(name, agent),
        TracingExporter::Jaeger => jaeger_tracer(name),
    };
    let telemetry = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&configuration.log_filter));

    Registry::default()
        .with(telemetry)
        .with(env_filter)
        .with(tracing_subscriber::fmt::Layer::new())
}

pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> anyhow::Result<()> {
    LogTracer::init().context("Failed to set logger")?;
    set_global_default(subscriber).context("Failed to set subscriber")?;

    Ok(())
}

// The subscriber isn't there yet when the exporters fail, hence eprintln
fn jaeger_tracer(name: &str) -> Option<Tracer> {
    opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(name)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|err| eprintln!("Jaeger exporter disabled: {:?}", err))
        .ok()
}

fn datadog_tracer(name: &str, agent: &str) -> Option<Tracer> {
    opentelemetry_datadog::new_pipeline()
        .with_service_name(name)
        .with_agent_endpoint(agent)
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default()),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|err| eprintln!("Datadog exporter disabled: {:?}", err))
        .ok()
}

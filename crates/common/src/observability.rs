use std::borrow::Cow;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Flushes the global tracer provider when dropped.
pub struct OtelGuard {
    _private: (),
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

struct ErrorCounterLayer;

impl<S> Layer<S> for ErrorCounterLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            metrics::counter!("tracing_error_events").increment(1);
        }
    }
}

fn base_layers<S>(default_level: &str) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .json();

    env_filter.and_then(fmt_layer).and_then(ErrorCounterLayer)
}

/// Build the process-wide `tracing` dispatcher:
/// - JSON logs to stdout, filtered by `RUST_LOG` or `default_level`
/// - `tracing_error_events` counter for ERROR events
/// - OTLP trace export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set
pub fn build_dispatch(
    service_name: impl Into<Cow<'static, str>>,
    default_level: &str,
) -> (tracing::Dispatch, Option<OtelGuard>) {
    let registry = tracing_subscriber::registry().with(base_layers(default_level));

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return (tracing::Dispatch::new(registry), None);
    };

    let Ok(exporter) = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    else {
        return (tracing::Dispatch::new(registry), None);
    };

    let service_name: Cow<'static, str> = service_name.into();
    let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]);

    // Batch export needs a running Tokio runtime.
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("wallet_leaderboard");
    let _ = opentelemetry::global::set_tracer_provider(provider);

    let subscriber = registry.with(tracing_opentelemetry::layer().with_tracer(tracer));
    (
        tracing::Dispatch::new(subscriber),
        Some(OtelGuard { _private: () }),
    )
}

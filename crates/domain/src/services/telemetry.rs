use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use metrics::gauge;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use metrics_process::Collector;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::hydrate_env_file;

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_HANDLE: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();
static PROCESS_SAMPLER: OnceCell<()> = OnceCell::new();

/// Buckets for every `*_seconds` histogram (upstream, database, cycle time).
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0];
const HTTP_DURATION_MS_BUCKETS: &[f64] = &[0.1, 5.0, 15.0, 50.0, 100.0, 500.0];
const HTTP_RESPONSE_SIZE_BUCKETS: &[f64] = &[
    100.0, 500.0, 1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0, 500_000.0,
];
/// Events per fetched page; pages hold at most 200.
const BATCH_EVENT_BUCKETS: &[f64] = &[0.0, 1.0, 10.0, 50.0, 100.0, 200.0];

const PROCESS_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Shared observability options for binaries.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<String>,
}

impl TelemetryConfig {
    /// Loads telemetry knobs from optional environment variables prefixed with
    /// `<PREFIX>_`, e.g. `MONITOR_LOG_FILTER`. Missing entries fall back to
    /// defaults so binaries do not require extra configuration to boot.
    pub fn from_env(prefix: &str) -> Self {
        let _ = hydrate_env_file();
        let upper = prefix.trim().to_ascii_uppercase();
        let log_key = format!("{}_LOG_FILTER", upper);
        let metrics_key = format!("{}_METRICS_ADDRESS", upper);

        let log_filter = env::var(log_key).unwrap_or_else(|_| "info".to_string());
        let metrics_address = env::var(metrics_key).ok().and_then(|value| {
            if value.trim().is_empty() {
                None
            } else {
                Some(value.trim().to_string())
            }
        });

        Self {
            log_filter,
            metrics_address,
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// When set, the Prometheus exporter serves scrapes on this address.
    pub fn metrics_address(&self) -> Option<&str> {
        self.metrics_address.as_deref()
    }
}

/// Guard returned after telemetry initialization.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }
}

/// Centralized helper to wire up tracing + metrics exporters once per process.
///
/// Must be called from within a Tokio runtime when a metrics address is
/// configured, since the exporter's listener is spawned onto it. Process
/// sampling only starts when a runtime is available.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config)?;
    let metrics = install_metrics(config)?;
    spawn_process_sampler();

    Ok(TelemetryGuard { metrics })
}

/// Publishes `memory_usage_bytes{type}` from the current process footprint.
pub fn record_memory_usage() {
    if let Some(usage) = memory_stats::memory_stats() {
        gauge!("memory_usage_bytes", "type" => "rss").set(usage.physical_mem as f64);
        gauge!("memory_usage_bytes", "type" => "virtual").set(usage.virtual_mem as f64);
    }
}

fn spawn_process_sampler() {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    if PROCESS_SAMPLER.set(()).is_err() {
        return;
    }

    let collector = Collector::default();
    collector.describe();
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(PROCESS_SAMPLE_INTERVAL);
        loop {
            ticker.tick().await;
            collector.collect();
            record_memory_usage();
        }
    });
}

/// Per-metric buckets; histograms matching none of them render as summaries.
fn prometheus_builder() -> Result<PrometheusBuilder, TelemetryError> {
    let bucketed = [
        (Matcher::Suffix("_seconds".into()), LATENCY_BUCKETS),
        (
            Matcher::Full("http_request_duration_ms".into()),
            HTTP_DURATION_MS_BUCKETS,
        ),
        (
            Matcher::Full("http_response_size_bytes".into()),
            HTTP_RESPONSE_SIZE_BUCKETS,
        ),
        (
            Matcher::Full("monitor_batch_events".into()),
            BATCH_EVENT_BUCKETS,
        ),
    ];

    bucketed
        .into_iter()
        .try_fold(PrometheusBuilder::new(), |builder, (matcher, buckets)| {
            builder.set_buckets_for_metric(matcher, buckets)
        })
        .map_err(|err| TelemetryError::Metrics(err.to_string()))
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn install_metrics(config: &TelemetryConfig) -> Result<Arc<PrometheusHandle>, TelemetryError> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            let builder = prometheus_builder()?;

            let Some(addr) = config.metrics_address() else {
                let recorder = builder.build_recorder();
                let handle = recorder.handle();
                metrics::set_global_recorder(recorder)
                    .map_err(|_| TelemetryError::Metrics("recorder already installed".into()))?;
                return Ok(Arc::new(handle));
            };

            let socket: SocketAddr = addr.parse().map_err(|err: std::net::AddrParseError| {
                TelemetryError::InvalidMetricsAddress(addr.to_string(), err.to_string())
            })?;
            let (recorder, exporter) = builder
                .with_http_listener(socket)
                .build()
                .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|_| TelemetryError::Metrics("recorder already installed".into()))?;
            tokio::spawn(async move {
                if let Err(err) = exporter.await {
                    tracing::error!(?err, "metrics exporter stopped");
                }
            });
            info!(%socket, "serving prometheus metrics");
            Ok(Arc::new(handle))
        })
        .cloned()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

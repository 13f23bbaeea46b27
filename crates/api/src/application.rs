use std::sync::Arc;
use std::time::Instant;

use actix_web::{
    body::{BodySize, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::{from_fn, Logger, Next},
    web, App, HttpServer,
};
use metrics::histogram;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

use tron_deposit_domain::config::{ApiConfig, ConfigError, MonitorConfig};
use tron_deposit_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use tron_deposit_domain::storage::StorageError;
use tron_deposit_monitor::{build_ingestion_loop, MonitorError, TronGridClient};
use tron_deposit_storage::SeaOrmStorage;

use crate::{
    handlers::{deposit_handler, health_handler, metrics_handler},
    state::AppState,
};

/// Boots the HTTP surface and the ingestion loop in one process. Startup
/// failures are fatal; once running, only the HTTP server's exit (ctrl-c)
/// stops the loop.
pub async fn run() -> Result<(), BootstrapError> {
    let config = ApiConfig::load_from_env()?;
    let monitor_config = MonitorConfig::load_from_env()?;

    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    let storage = SeaOrmStorage::connect(config.database_url()).await?;
    let source = TronGridClient::from_config(&monitor_config)?;
    let ingestion = Arc::new(build_ingestion_loop(&monitor_config, storage.clone(), source));
    let loop_state = ingestion.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let monitor = tokio::spawn(async move {
        ingestion
            .run_until(async move {
                let _ = stop_rx.await;
            })
            .await;
    });

    let state = AppState::new(storage, telemetry, loop_state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(from_fn(track_requests))
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind(config.api_bind_address())?
    .run();
    info!(address = config.api_bind_address(), "http server listening");

    let served = server.await;

    let _ = stop_tx.send(());
    if let Err(err) = monitor.await {
        warn!(?err, "ingestion loop task ended abnormally");
    }

    served?;
    Ok(())
}

pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/healthz", web::get().to(health_handler))
        .route("/api/v1/deposits/{tx_hash}", web::get().to(deposit_handler));
}

/// Records `http_request_duration_ms` and `http_response_size_bytes` keyed
/// by route pattern rather than raw path so transaction ids do not explode
/// label cardinality.
pub(crate) async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = req.match_pattern().unwrap_or_else(|| "unmatched".to_string());

    let res = next.call(req).await?;
    let code = res.status().as_u16().to_string();
    histogram!(
        "http_request_duration_ms",
        "method" => method.clone(),
        "route" => route.clone(),
        "code" => code.clone()
    )
    .record(started.elapsed().as_secs_f64() * 1000.0);
    // Streamed bodies have no size until they finish; they are skipped.
    if let BodySize::Sized(bytes) = res.response().body().size() {
        histogram!(
            "http_response_size_bytes",
            "method" => method,
            "route" => route,
            "code" => code
        )
        .record(bytes as f64);
    }
    Ok(res)
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

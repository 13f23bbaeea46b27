use std::future::Future;
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use tron_deposit_domain::{
    config::{ConfigError, MonitorConfig},
    model::DepositOutcome,
    services::telemetry::TelemetryError,
    storage::{AddressBook, DepositStore, StorageError},
    AuditLog, FileAuditLog, TronAddress,
};
use tron_deposit_storage::SeaOrmStorage;

use crate::{
    feed::{fetch_recent_transfers, TransferSource},
    filter::AddressMonitor,
    limiter::FetchLimiter,
    pipeline::DepositRecorder,
};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("http client error: {0}")]
    Client(String),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Published on every transition so the service can report liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub contract: TronAddress,
    pub min_fetch_spacing: Duration,
    pub poll_delay: Duration,
    pub fetch_timeout: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            contract: config.asset_contract().clone(),
            min_fetch_spacing: config.min_fetch_spacing(),
            poll_delay: config.poll_delay(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Tally of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub created: usize,
    pub already_exists: usize,
    pub unmonitored: usize,
    pub errored: usize,
}

impl CycleReport {
    fn observe(&mut self, outcome: &DepositOutcome) {
        if outcome.is_error() {
            counter!("events_errored_total").increment(1);
            self.errored += 1;
            return;
        }
        counter!("events_processed_total").increment(1);
        match outcome {
            DepositOutcome::Created(_) => self.created += 1,
            DepositOutcome::AlreadyExists => self.already_exists += 1,
            DepositOutcome::Rejected(_) => self.unmonitored += 1,
        }
    }
}

/// Drives fetch → record passes until told to stop.
///
/// A pass fetches one page through the limiter, then records each event in
/// feed order, each one finishing before the next starts. Nothing that goes
/// wrong inside a pass ends the loop.
pub struct IngestionLoop<S, D, B, L> {
    source: S,
    recorder: DepositRecorder<D, B, L>,
    limiter: FetchLimiter,
    settings: LoopSettings,
    state: watch::Sender<LoopState>,
}

impl<S, D, B, L> IngestionLoop<S, D, B, L>
where
    S: TransferSource,
    D: DepositStore,
    B: AddressBook,
    L: AuditLog,
{
    pub fn new(source: S, recorder: DepositRecorder<D, B, L>, settings: LoopSettings) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            source,
            recorder,
            limiter: FetchLimiter::new(settings.min_fetch_spacing),
            settings,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Runs a single pass, waiting on the limiter first.
    pub async fn run_cycle(&self) -> CycleReport {
        self.limiter.schedule(self.pass()).await
    }

    async fn pass(&self) -> CycleReport {
        let started = Instant::now();
        self.state.send_replace(LoopState::Fetching);

        let events = fetch_recent_transfers(
            &self.source,
            &self.settings.contract,
            self.settings.fetch_timeout,
        )
        .await;
        histogram!("monitor_batch_events").record(events.len() as f64);

        let mut report = CycleReport {
            fetched: events.len(),
            ..CycleReport::default()
        };
        for event in &events {
            let outcome = self.recorder.record(event).await;
            report.observe(&outcome);
        }

        self.state.send_replace(LoopState::Idle);
        histogram!("monitor_cycle_duration_seconds").record(started.elapsed().as_secs_f64());
        report
    }

    /// Loops until `shutdown` resolves. Shutdown is only observed between
    /// passes; a pass in progress always runs to completion.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            contract = %self.settings.contract,
            asset = self.recorder.asset(),
            "deposit monitor started"
        );

        loop {
            let report = self.run_cycle().await;
            if report.created > 0 || report.errored > 0 {
                info!(?report, "cycle finished");
            } else {
                debug!(?report, "cycle finished");
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.settings.poll_delay) => {}
            }
        }

        info!("deposit monitor stopped");
    }
}

pub type SeaOrmIngestionLoop<S> = IngestionLoop<S, SeaOrmStorage, SeaOrmStorage, FileAuditLog>;

/// Wires the production recorder around a shared storage handle.
pub fn build_ingestion_loop<S>(
    config: &MonitorConfig,
    storage: SeaOrmStorage,
    source: S,
) -> SeaOrmIngestionLoop<S>
where
    S: TransferSource,
{
    let recorder = DepositRecorder::new(
        storage.clone(),
        AddressMonitor::new(storage),
        FileAuditLog::new(config.audit_log_path()),
        config.asset_symbol(),
    );
    IngestionLoop::new(source, recorder, LoopSettings::from_config(config))
}

pub async fn run_monitor<S, F>(
    config: &MonitorConfig,
    storage: SeaOrmStorage,
    source: S,
    shutdown: F,
) -> Result<(), MonitorError>
where
    S: TransferSource,
    F: Future<Output = ()>,
{
    build_ingestion_loop(config, storage, source)
        .run_until(shutdown)
        .await;
    Ok(())
}

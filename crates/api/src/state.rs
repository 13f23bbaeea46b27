use tokio::sync::watch;
use tron_deposit_domain::services::telemetry::TelemetryGuard;
use tron_deposit_monitor::LoopState;
use tron_deposit_storage::SeaOrmStorage;

#[derive(Clone)]
pub struct AppState {
    storage: SeaOrmStorage,
    telemetry: TelemetryGuard,
    loop_state: watch::Receiver<LoopState>,
}

impl AppState {
    pub fn new(
        storage: SeaOrmStorage,
        telemetry: TelemetryGuard,
        loop_state: watch::Receiver<LoopState>,
    ) -> Self {
        Self {
            storage,
            telemetry,
            loop_state,
        }
    }

    pub fn storage(&self) -> &SeaOrmStorage {
        &self.storage
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }

    /// Last state published by the ingestion loop.
    pub fn loop_state(&self) -> LoopState {
        *self.loop_state.borrow()
    }
}

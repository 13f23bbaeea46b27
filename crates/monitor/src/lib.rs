//! Library entrypoint for embedding the deposit monitor inside other binaries
//! (e.g., the API process, which reports the loop state on `/healthz`). The
//! binary in `main.rs` runs the same loop standalone.

pub mod feed;
pub mod filter;
pub mod limiter;
pub mod pipeline;
pub mod worker;

#[cfg(test)]
mod testing;

pub use feed::{fetch_recent_transfers, FeedError, TransferEvent, TransferSource, TronGridClient};
pub use filter::AddressMonitor;
pub use limiter::FetchLimiter;
pub use pipeline::{validate_event, DepositRecorder, InvalidEvent};
pub use worker::{
    build_ingestion_loop, run_monitor, CycleReport, IngestionLoop, LoopSettings, LoopState,
    MonitorError, SeaOrmIngestionLoop,
};

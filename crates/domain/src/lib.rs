//! Domain-level building blocks shared across the service, monitor, and
//! storage crates: configuration, deposit models, storage contracts, the
//! audit trail, and telemetry wiring.

pub mod address;
pub mod audit;
pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use address::{AddressFormatError, TronAddress};
pub use audit::{AuditError, AuditLog, FileAuditLog};
pub use model::*;
pub use storage::*;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tron_deposit_domain::model::{
    DepositOutcome, DepositRecord, NewDeposit, RejectReason, TxHash, TxHashError,
    INITIAL_CONFIRMATIONS,
};
use tron_deposit_domain::storage::{
    AddressBook, DepositStore, DepositTransaction, StorageError, StorageResult,
};
use tron_deposit_domain::{AddressFormatError, AuditLog, TronAddress};

use crate::feed::TransferEvent;
use crate::filter::AddressMonitor;

/// Why an event failed validation before any storage access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidEvent {
    #[error("invalid transaction id: {0}")]
    TxHash(#[from] TxHashError),
    #[error("destination address is missing")]
    MissingDestination,
    #[error("destination address is invalid: {0}")]
    Destination(#[from] AddressFormatError),
    #[error("amount is zero")]
    ZeroAmount,
    #[error("amount {0} exceeds the storable range")]
    AmountOverflow(u64),
}

/// Turns a raw event into the deposit it would create, without touching storage.
pub fn validate_event(event: &TransferEvent, asset: &str) -> Result<NewDeposit, InvalidEvent> {
    let tx_hash = TxHash::parse(&event.tx_hash)?;
    let raw_to = event
        .to_address
        .as_deref()
        .ok_or(InvalidEvent::MissingDestination)?;
    if event.amount == 0 {
        return Err(InvalidEvent::ZeroAmount);
    }
    let amount =
        i64::try_from(event.amount).map_err(|_| InvalidEvent::AmountOverflow(event.amount))?;
    let to_address = TronAddress::from_hex(raw_to)?;

    Ok(NewDeposit {
        tx_hash,
        to_address,
        asset: asset.to_string(),
        amount,
        confirmations: INITIAL_CONFIRMATIONS,
    })
}

/// Persists each qualifying transfer at most once.
///
/// The existence check and the insert share one transaction, so as long as
/// calls for the same transaction id are not run concurrently no duplicate row
/// can appear. The primary key on `tx_hash` backs this up when more than one
/// instance writes to the same database.
pub struct DepositRecorder<S, B, L> {
    store: S,
    monitor: AddressMonitor<B>,
    audit: L,
    asset: String,
}

impl<S, B, L> DepositRecorder<S, B, L>
where
    S: DepositStore,
    B: AddressBook,
    L: AuditLog,
{
    pub fn new(store: S, monitor: AddressMonitor<B>, audit: L, asset: impl Into<String>) -> Self {
        Self {
            store,
            monitor,
            audit,
            asset: asset.into(),
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub async fn record(&self, event: &TransferEvent) -> DepositOutcome {
        let outcome = self.record_inner(event).await;
        counter!("monitor_deposit_outcomes_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn record_inner(&self, event: &TransferEvent) -> DepositOutcome {
        let deposit = match validate_event(event, &self.asset) {
            Ok(deposit) => deposit,
            Err(err) => {
                warn!(tx_hash = %event.tx_hash, error = %err, "invalid transaction data");
                return DepositOutcome::Rejected(RejectReason::InvalidData);
            }
        };

        if !self.monitor.is_monitored(&deposit.to_address).await {
            debug!(
                tx_hash = deposit.tx_hash.as_str(),
                address = %deposit.to_address,
                "destination is not a monitored address"
            );
            return DepositOutcome::Rejected(RejectReason::Unmonitored);
        }

        match self.persist(&deposit).await {
            Ok(Some(record)) => {
                info!(
                    tx_hash = record.tx_hash.as_str(),
                    address = %record.to_address,
                    amount = record.amount,
                    asset = %record.asset,
                    "new deposit added"
                );
                self.append_audit(&record).await;
                DepositOutcome::Created(record)
            }
            Ok(None) => {
                debug!(tx_hash = deposit.tx_hash.as_str(), "deposit already exists");
                DepositOutcome::AlreadyExists
            }
            Err(StorageError::Conflict(detail)) => {
                info!(
                    tx_hash = deposit.tx_hash.as_str(),
                    detail, "deposit inserted concurrently; treating as existing"
                );
                DepositOutcome::AlreadyExists
            }
            Err(err) => {
                error!(
                    tx_hash = deposit.tx_hash.as_str(),
                    error = %err,
                    "failed to record deposit"
                );
                DepositOutcome::Rejected(RejectReason::StorageError)
            }
        }
    }

    /// `Ok(None)` when the transaction id is already recorded.
    async fn persist(&self, deposit: &NewDeposit) -> StorageResult<Option<DepositRecord>> {
        let mut tx = self.store.begin().await?;

        let existing = match tx.find_deposit(&deposit.tx_hash).await {
            Ok(existing) => existing,
            Err(err) => {
                release(tx, &deposit.tx_hash).await;
                return Err(err);
            }
        };
        if existing.is_some() {
            release(tx, &deposit.tx_hash).await;
            return Ok(None);
        }

        let record = match tx.insert_deposit(deposit).await {
            Ok(record) => record,
            Err(err) => {
                release(tx, &deposit.tx_hash).await;
                return Err(err);
            }
        };
        tx.commit().await?;
        Ok(Some(record))
    }

    async fn append_audit(&self, record: &DepositRecord) {
        if let Err(err) = self.audit.append(record).await {
            counter!("monitor_audit_failures_total").increment(1);
            warn!(tx_hash = record.tx_hash.as_str(), error = %err, "failed to append audit log");
        }
    }
}

/// Rolls back without letting a rollback failure replace the caller's result.
async fn release<T>(tx: T, tx_hash: &TxHash)
where
    T: DepositTransaction,
{
    if let Err(err) = tx.rollback().await {
        warn!(tx_hash = tx_hash.as_str(), error = %err, "rollback failed");
    }
}

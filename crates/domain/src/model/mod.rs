//! Data structures shared across the service, monitor, and storage crates.

use chrono::{DateTime, Utc};
use strum_macros::IntoStaticStr;
use thiserror::Error;

use crate::address::TronAddress;

/// Confirmation count written on every new deposit. Events are fetched with
/// `only_confirmed`, so the row starts out past the solidity threshold.
pub const INITIAL_CONFIRMATIONS: i32 = 4;

/// Longest transaction identifier accepted (TRON txids are 64 hex chars).
pub const MAX_TX_HASH_LEN: usize = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxHashError {
    #[error("transaction hash is empty")]
    Empty,
    #[error("transaction hash exceeds {MAX_TX_HASH_LEN} characters")]
    TooLong,
}

/// Opaque ledger transaction identifier; unique per ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(raw: &str) -> Result<Self, TxHashError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TxHashError::Empty);
        }
        if trimmed.len() > MAX_TX_HASH_LEN {
            return Err(TxHashError::TooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Deposit about to be written by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeposit {
    pub tx_hash: TxHash,
    pub to_address: TronAddress,
    pub asset: String,
    pub amount: i64,
    pub confirmations: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRecord {
    pub tx_hash: TxHash,
    pub to_address: TronAddress,
    pub asset: String,
    pub amount: i64,
    pub confirmations: i32,
    pub created_at: DateTime<Utc>,
}

/// Why an event did not produce a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Missing/undecodable destination or a non-positive amount.
    InvalidData,
    Unmonitored,
    StorageError,
}

/// Terminal result of recording one transfer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    Created(DepositRecord),
    /// Idempotent no-op: the transaction was credited on an earlier sighting.
    AlreadyExists,
    Rejected(RejectReason),
}

impl DepositOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DepositOutcome::Created(_) => "created",
            DepositOutcome::AlreadyExists => "already_exists",
            DepositOutcome::Rejected(reason) => (*reason).into(),
        }
    }

    /// Outcomes that count against `events_errored_total`.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DepositOutcome::Rejected(RejectReason::InvalidData | RejectReason::StorageError)
        )
    }
}

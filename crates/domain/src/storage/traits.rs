use async_trait::async_trait;
use thiserror::Error;

use crate::address::TronAddress;
use crate::model::{DepositRecord, NewDeposit, TxHash};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Read-only view over the externally owned monitored-address table.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// `true` when the address is active and assigned to an account.
    async fn is_active_address(&self, address: &TronAddress) -> StorageResult<bool>;
}

#[async_trait]
pub trait DepositStore: Send + Sync {
    type Tx: DepositTransaction;

    /// Opens a transaction owned exclusively by the caller.
    async fn begin(&self) -> StorageResult<Self::Tx>;

    /// Point lookup outside of any transaction.
    async fn find_deposit(&self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>>;
}

/// Scoped unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait DepositTransaction: Send {
    async fn find_deposit(&mut self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>>;
    async fn insert_deposit(&mut self, deposit: &NewDeposit) -> StorageResult<DepositRecord>;
    async fn commit(self) -> StorageResult<()>;
    async fn rollback(self) -> StorageResult<()>;
}

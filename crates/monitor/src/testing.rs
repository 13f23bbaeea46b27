//! Test doubles shared by the pipeline and loop tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tron_deposit_domain::model::{DepositRecord, NewDeposit, TxHash};
use tron_deposit_domain::storage::{
    AddressBook, DepositStore, DepositTransaction, StorageError, StorageResult,
};
use tron_deposit_domain::{AuditError, AuditLog, TronAddress};

use crate::feed::TransferEvent;

pub(crate) const MONITORED_HEX: &str = "0xa614f803b6fd780986a42c78ec9c7f77e6ded13c";
pub(crate) const MONITORED_BASE58: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// In-memory deposit table with transactional staging.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    pub(crate) rows: Arc<Mutex<HashMap<String, DepositRecord>>>,
    pub(crate) begins: Arc<AtomicUsize>,
    pub(crate) commits: Arc<AtomicUsize>,
    pub(crate) rollbacks: Arc<AtomicUsize>,
    pub(crate) fail_insert: bool,
    pub(crate) fail_rollback: bool,
    /// Fails inserts with a unique-key violation, as SQLite and Postgres do
    /// when another writer already holds the row.
    pub(crate) conflict_on_insert: bool,
    /// Hides committed rows from in-transaction reads, as a concurrent
    /// writer that has not yet committed would.
    pub(crate) stale_reads: bool,
}

impl MemoryStore {
    pub(crate) fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

pub(crate) struct MemoryTx {
    store: MemoryStore,
    staged: Vec<DepositRecord>,
}

#[async_trait]
impl DepositStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StorageResult<MemoryTx> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTx {
            store: self.clone(),
            staged: Vec::new(),
        })
    }

    async fn find_deposit(&self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>> {
        Ok(self.rows.lock().unwrap().get(tx_hash.as_str()).cloned())
    }
}

#[async_trait]
impl DepositTransaction for MemoryTx {
    async fn find_deposit(&mut self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>> {
        if self.store.stale_reads {
            return Ok(None);
        }
        self.store.find_deposit(tx_hash).await
    }

    async fn insert_deposit(&mut self, deposit: &NewDeposit) -> StorageResult<DepositRecord> {
        if self.store.fail_insert {
            return Err(StorageError::Database("disk full".into()));
        }
        if self.store.conflict_on_insert {
            return Err(StorageError::Conflict(deposit.tx_hash.as_str().to_string()));
        }
        let record = DepositRecord {
            tx_hash: deposit.tx_hash.clone(),
            to_address: deposit.to_address.clone(),
            asset: deposit.asset.clone(),
            amount: deposit.amount,
            confirmations: deposit.confirmations,
            created_at: Utc::now(),
        };
        self.staged.push(record.clone());
        Ok(record)
    }

    async fn commit(self) -> StorageResult<()> {
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.store.rows.lock().unwrap();
        for record in self.staged {
            if rows.contains_key(record.tx_hash.as_str()) {
                return Err(StorageError::Conflict(record.tx_hash.into_inner()));
            }
            rows.insert(record.tx_hash.as_str().to_string(), record);
        }
        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.store.fail_rollback {
            return Err(StorageError::Database("connection lost".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct StaticBook {
    pub(crate) active: Vec<String>,
    pub(crate) lookups: Arc<AtomicUsize>,
}

impl StaticBook {
    pub(crate) fn with(active: &[&str]) -> Self {
        Self {
            active: active.iter().map(|a| a.to_string()).collect(),
            lookups: Arc::default(),
        }
    }
}

#[async_trait]
impl AddressBook for StaticBook {
    async fn is_active_address(&self, address: &TronAddress) -> StorageResult<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.active.iter().any(|a| a == address.as_str()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingAudit {
    pub(crate) entries: Arc<Mutex<Vec<String>>>,
    pub(crate) fail: bool,
}

#[async_trait]
impl AuditLog for RecordingAudit {
    async fn append(&self, deposit: &DepositRecord) -> Result<(), AuditError> {
        if self.fail {
            return Err(AuditError::Io {
                path: "deposits-log.txt".into(),
                source: std::io::Error::other("read-only filesystem"),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .push(deposit.tx_hash.as_str().to_string());
        Ok(())
    }
}

pub(crate) fn event(tx: &str, to: Option<&str>, amount: u64) -> TransferEvent {
    TransferEvent {
        tx_hash: tx.to_string(),
        to_address: to.map(str::to_string),
        amount,
        block_number: Some(1),
        block_timestamp: None,
    }
}

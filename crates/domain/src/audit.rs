//! Append-only record of credited deposits, kept apart from the database so
//! operators have an independent trail to reconcile against.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::model::DepositRecord;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit log `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Receives finalized deposits. Callers treat failures as best-effort.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, deposit: &DepositRecord) -> Result<(), AuditError>;
}

/// Appends one line per deposit to a plain text file.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

pub fn format_audit_line(deposit: &DepositRecord) -> String {
    format!(
        "{} - New deposit: Tx Hash {}, Address {}, Amount {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        deposit.tx_hash.as_str(),
        deposit.to_address,
        deposit.amount,
    )
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append(&self, deposit: &DepositRecord) -> Result<(), AuditError> {
        let line = format_audit_line(deposit);
        let io_err = |source| AuditError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }
}

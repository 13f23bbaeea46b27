//! SeaORM-backed storage adapters that satisfy the domain storage traits while
//! keeping the database backend swappable (SQLite by default, PostgreSQL or
//! MySQL via feature flag).

mod address_store;
mod builder;
mod deposit_store;
mod entity;
mod errors;
mod migration;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use tron_deposit_domain::storage::StorageResult;

pub use builder::StorageBuilder;
pub use deposit_store::SeaOrmDepositTx;

/// Shared storage handle used by the HTTP service and the monitor.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStorage {
    /// Connects to the provided database URL and ensures the schema is present.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::builder().database_url(database_url).build().await
    }

    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    pub(crate) fn from_connection(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}

pub(crate) fn observe_query<T>(started: Instant, result: &StorageResult<T>) {
    histogram!("db_query_duration_seconds").record(started.elapsed().as_secs_f64());
    counter!("db_query_count_total").increment(1);
    if result.is_err() {
        counter!("db_query_errors_total").increment(1);
    }
}

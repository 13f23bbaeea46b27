use sea_orm::{ConnectOptions, Database};
use tron_deposit_domain::storage::StorageResult;

use crate::{errors::StorageError, migration::run_migrations, SeaOrmStorage};

#[derive(Default)]
pub struct StorageBuilder {
    database_url: Option<String>,
}

impl StorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub async fn build(self) -> StorageResult<SeaOrmStorage> {
        let url = self
            .database_url
            .ok_or_else(|| StorageError::Database("missing database url".into()))?;
        // Every pooled connection to `:memory:` would see its own database.
        let in_memory = url.contains(":memory:");
        let mut options = ConnectOptions::new(url);
        options.sqlx_logging(false);
        if in_memory {
            options.max_connections(1).min_connections(1);
        }
        let db = Database::connect(options)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(SeaOrmStorage::from_connection(db))
    }
}

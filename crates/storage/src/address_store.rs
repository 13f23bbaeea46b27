use std::time::Instant;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tron_deposit_domain::storage::{AddressBook, StorageResult};
use tron_deposit_domain::TronAddress;

use crate::entity::monitored_address;
use crate::errors::map_db_err;
use crate::{observe_query, SeaOrmStorage};

#[async_trait::async_trait]
impl AddressBook for SeaOrmStorage {
    async fn is_active_address(&self, address: &TronAddress) -> StorageResult<bool> {
        let started = Instant::now();
        // account_id 0 marks a pooled address not yet handed to anyone.
        let result = monitored_address::Entity::find()
            .filter(monitored_address::Column::Address.eq(address.as_str()))
            .filter(monitored_address::Column::Active.eq(true))
            .filter(monitored_address::Column::AccountId.is_not_null())
            .filter(monitored_address::Column::AccountId.ne(0i64))
            .count(self.connection())
            .await
            .map(|count| count > 0)
            .map_err(map_db_err);
        observe_query(started, &result);
        result
    }
}

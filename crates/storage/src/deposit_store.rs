use std::time::Instant;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseTransaction, EntityTrait, Set, TransactionTrait};
use tron_deposit_domain::model::{DepositRecord, NewDeposit, TxHash};
use tron_deposit_domain::storage::{DepositStore, DepositTransaction, StorageResult};
use tron_deposit_domain::TronAddress;

use crate::entity::deposits;
use crate::errors::{map_db_err, StorageError};
use crate::{observe_query, SeaOrmStorage};

/// Transaction handle for one `record` call. sea-orm rolls the underlying
/// transaction back if this is dropped before `commit`.
pub struct SeaOrmDepositTx {
    txn: DatabaseTransaction,
}

#[async_trait::async_trait]
impl DepositStore for SeaOrmStorage {
    type Tx = SeaOrmDepositTx;

    async fn begin(&self) -> StorageResult<SeaOrmDepositTx> {
        let txn = self.connection().begin().await.map_err(map_db_err)?;
        Ok(SeaOrmDepositTx { txn })
    }

    async fn find_deposit(&self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>> {
        find_by_tx_hash(self.connection(), tx_hash).await
    }
}

#[async_trait::async_trait]
impl DepositTransaction for SeaOrmDepositTx {
    async fn find_deposit(&mut self, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>> {
        find_by_tx_hash(&self.txn, tx_hash).await
    }

    async fn insert_deposit(&mut self, deposit: &NewDeposit) -> StorageResult<DepositRecord> {
        let created_at = Utc::now();
        let model = deposits::ActiveModel {
            tx_hash: Set(deposit.tx_hash.as_str().to_owned()),
            to_address: Set(deposit.to_address.as_str().to_owned()),
            asset: Set(deposit.asset.clone()),
            amount: Set(deposit.amount),
            confirmations: Set(deposit.confirmations),
            created_at: Set(created_at),
        };

        let started = Instant::now();
        let result = deposits::Entity::insert(model)
            .exec_without_returning(&self.txn)
            .await
            .map(|_| ())
            .map_err(map_db_err);
        observe_query(started, &result);
        result?;

        Ok(DepositRecord {
            tx_hash: deposit.tx_hash.clone(),
            to_address: deposit.to_address.clone(),
            asset: deposit.asset.clone(),
            amount: deposit.amount,
            confirmations: deposit.confirmations,
            created_at,
        })
    }

    async fn commit(self) -> StorageResult<()> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> StorageResult<()> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

async fn find_by_tx_hash<C>(conn: &C, tx_hash: &TxHash) -> StorageResult<Option<DepositRecord>>
where
    C: ConnectionTrait,
{
    let started = Instant::now();
    let result = deposits::Entity::find_by_id(tx_hash.as_str().to_owned())
        .one(conn)
        .await
        .map_err(map_db_err)
        .and_then(|maybe| maybe.map(deposit_to_record).transpose());
    observe_query(started, &result);
    result
}

fn deposit_to_record(model: deposits::Model) -> StorageResult<DepositRecord> {
    let tx_hash =
        TxHash::parse(&model.tx_hash).map_err(|err| StorageError::Database(err.to_string()))?;
    let to_address = TronAddress::parse(&model.to_address)
        .map_err(|err| StorageError::Database(err.to_string()))?;

    Ok(DepositRecord {
        tx_hash,
        to_address,
        asset: model.asset,
        amount: model.amount,
        confirmations: model.confirmations,
        created_at: model.created_at,
    })
}

use sea_orm::sea_query::{ColumnDef, Expr, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::entity::{deposits, monitored_address};
use crate::errors::StorageError;
use tron_deposit_domain::storage::StorageResult;

pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    let backend = db.get_database_backend();

    // Normally provisioned by the account system; created here so a fresh
    // database (tests, local runs) has the columns the lookup relies on.
    let address_table = Table::create()
        .if_not_exists()
        .table(monitored_address::Entity)
        .col(
            ColumnDef::new(monitored_address::Column::Address)
                .string_len(64)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(monitored_address::Column::AccountId)
                .big_integer()
                .null(),
        )
        .col(
            ColumnDef::new(monitored_address::Column::Active)
                .boolean()
                .not_null()
                .default(true),
        )
        .to_owned();
    create_table(db, backend, address_table).await?;

    let deposits_table = Table::create()
        .if_not_exists()
        .table(deposits::Entity)
        .col(
            ColumnDef::new(deposits::Column::TxHash)
                .string_len(128)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(deposits::Column::ToAddress)
                .string_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new(deposits::Column::Asset)
                .string_len(32)
                .not_null(),
        )
        .col(
            ColumnDef::new(deposits::Column::Amount)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(deposits::Column::Confirmations)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(deposits::Column::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned();
    create_table(db, backend, deposits_table).await?;

    Ok(())
}

async fn create_table(
    db: &DatabaseConnection,
    backend: DatabaseBackend,
    statement: TableCreateStatement,
) -> StorageResult<()> {
    db.execute(backend.build(&statement))
        .await
        .map_err(StorageError::from_source)?;
    Ok(())
}

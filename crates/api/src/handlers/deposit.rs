use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tron_deposit_domain::model::{DepositRecord, TxHash};
use tron_deposit_domain::storage::DepositStore;

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositResponse {
    pub tx_hash: String,
    pub to_address: String,
    pub asset: String,
    pub amount: i64,
    pub confirmations: i32,
    pub created_at: DateTime<Utc>,
}

impl From<DepositRecord> for DepositResponse {
    fn from(record: DepositRecord) -> Self {
        Self {
            tx_hash: record.tx_hash.into_inner(),
            to_address: record.to_address.into_inner(),
            asset: record.asset,
            amount: record.amount,
            confirmations: record.confirmations,
            created_at: record.created_at,
        }
    }
}

pub async fn deposit_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tx_hash = TxHash::parse(&path.into_inner())?;
    let Some(record) = state.storage().find_deposit(&tx_hash).await? else {
        counter!("api_deposit_lookups_total", "status" => "not_found").increment(1);
        return Err(ApiError::NotFound);
    };
    counter!("api_deposit_lookups_total", "status" => "found").increment(1);
    Ok(HttpResponse::Ok().json(DepositResponse::from(record)))
}

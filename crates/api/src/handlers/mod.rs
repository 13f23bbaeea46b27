pub mod deposit;
pub mod ops;

pub use deposit::deposit_handler;
pub use ops::{health_handler, metrics_handler};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use tron_deposit_domain::model::TxHashError;
use tron_deposit_domain::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(#[from] TxHashError),
    #[error("deposit not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidTxHash(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

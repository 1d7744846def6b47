pub mod attendance;
pub mod health;
pub mod qr_codes;
pub mod users;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use thiserror::Error;

use crate::ledger::error::{LedgerError, StoreError};

/// Request-level failures. Each kind carries a stable `code` in the JSON body
/// so clients can tell "already checked in" apart from a system error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("QR code is not registered or not active")]
    InvalidQrCode,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("record store unavailable")]
    Storage(#[from] StoreError),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(LedgerError::InvalidInput(_)) => "INVALID_INPUT",
            ApiError::Ledger(LedgerError::DuplicateCheckIn) => "DUPLICATE_CHECK_IN",
            ApiError::Ledger(LedgerError::NoOpenCheckIn) => "NO_OPEN_CHECK_IN",
            ApiError::Ledger(LedgerError::StorageUnavailable(_)) => "STORAGE_UNAVAILABLE",
            ApiError::InvalidQrCode => "INVALID_QR_CODE",
            ApiError::BadRequest(_) => "INVALID_INPUT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Storage(_) => "STORAGE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(LedgerError::InvalidInput(_))
            | ApiError::InvalidQrCode
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::DuplicateCheckIn | LedgerError::NoOpenCheckIn)
            | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Ledger(LedgerError::StorageUnavailable(_)) | ApiError::Storage(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Ledger(LedgerError::StorageUnavailable(e)) | ApiError::Storage(e) => {
                tracing::error!(error = %e, "Record store request failed");
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string(),
        }))
    }
}

/// Malformed JSON bodies get the same envelope as any other bad input.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("invalid request body: {err}")).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("invalid query string: {err}")).into()
    })
}

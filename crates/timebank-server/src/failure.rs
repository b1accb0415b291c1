// SPDX-License-Identifier: Apache-2.0

//! Bridges domain errors to the wire contract. Handlers return
//! `Result<_, ApiFailure>`; the `From` impls pick the `ApiErrorCode` and
//! `map_error` picks the status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use timebank_api::{map_error, ApiError};
use timebank_ledger::LedgerError;
use timebank_store::{StoreError, StoreErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure(pub ApiError);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mapping = map_error(&self.0);
        let status = StatusCode::from_u16(mapping.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

impl From<ApiError> for ApiFailure {
    fn from(error: ApiError) -> Self {
        Self(error)
    }
}

impl From<StoreError> for ApiFailure {
    fn from(error: StoreError) -> Self {
        let api = match error.code {
            StoreErrorCode::NotFound => ApiError::not_found(&error.message),
            StoreErrorCode::Validation => ApiError::invalid_body(&error.message),
            StoreErrorCode::Conflict => ApiError::conflict(error.message),
            StoreErrorCode::Busy => ApiError::unavailable(&error.message),
            _ => {
                tracing::error!(error = %error, "store failure");
                ApiError::internal()
            }
        };
        Self(api)
    }
}

impl From<LedgerError> for ApiFailure {
    fn from(error: LedgerError) -> Self {
        let api = match error {
            LedgerError::NonPositiveHours(_) => {
                ApiError::invalid_param("hours", "must be positive")
            }
            LedgerError::NoAllocatableBanks => {
                ApiError::conflict("client has no allocatable timebanks")
            }
            _ => {
                tracing::error!(error = %error, "allocation planning failure");
                ApiError::internal()
            }
        };
        Self(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timebank_model::Hours;

    #[test]
    fn store_codes_map_to_api_codes() {
        let failure = ApiFailure::from(StoreError::not_found("client x"));
        assert_eq!(failure.0.code, timebank_api::ApiErrorCode::NotFound);
        let failure = ApiFailure::from(StoreError::conflict("stale balance"));
        assert_eq!(failure.0.code, timebank_api::ApiErrorCode::Conflict);
        let failure = ApiFailure::from(StoreError::validation("bad note"));
        assert_eq!(failure.0.code, timebank_api::ApiErrorCode::InvalidParameter);
    }

    #[test]
    fn ledger_errors_name_the_hours_parameter() {
        let failure = ApiFailure::from(LedgerError::NonPositiveHours(Hours::ZERO));
        assert_eq!(failure.0.details["parameter"], "hours");
    }
}

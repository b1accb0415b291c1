// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    pub schema_ref: &'static str,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidParameter => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::RateLimited => 429,
        ApiErrorCode::Unavailable => 503,
        _ => 500,
    };

    ApiErrorMapping {
        status_code,
        schema_ref: API_ERROR_SCHEMA_REF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_maps_to_its_status() {
        let cases = [
            (ApiError::invalid_param("limit", "bad"), 400),
            (ApiError::unauthorized(), 401),
            (ApiError::forbidden("close timebank"), 403),
            (ApiError::not_found("entry"), 404),
            (ApiError::conflict("balance changed"), 409),
            (ApiError::payload_too_large(65_536), 413),
            (ApiError::rate_limited(), 429),
            (ApiError::internal(), 500),
            (ApiError::unavailable("storage offline"), 503),
        ];
        for (error, status) in cases {
            let mapping = map_error(&error);
            assert_eq!(mapping.status_code, status, "{:?}", error.code);
            assert_eq!(mapping.schema_ref, API_ERROR_SCHEMA_REF);
        }
    }
}

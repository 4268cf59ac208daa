//! HTTP-boundary error taxonomy: one enum, one `IntoResponse` impl, one JSON
//! envelope shape for every terminal error response the Gate, Admin Surface, or
//! Catalogue Builder can produce.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::store::ReadIntError;

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    NoToken,
    InvalidToken,
    TokenParseFailed,
    NoUserId,

    Unauthorized,
    StarRequired,
    TotalQuotaError(String),
    UsedQuotaError(String),
    InsufficientQuota { required: i64, available: i64 },

    InvalidParams(String),
    InvalidTotalQuota,
    InvalidUsedQuota,
    InvalidQuotaFormat(String),
    InvalidQuotaValue(String),

    DeductionFailed(String),
    DeductionInconsistent,
    BuildModelsFailed(String),

    /// Generic store-boundary failure not covered by a more specific phase-level code.
    StoreError(String),
}

impl GatewayError {
    fn code(&self) -> &'static str {
        match self {
            GatewayError::NoToken => "ai-gateway.no_token",
            GatewayError::InvalidToken => "ai-gateway.invalid_token",
            GatewayError::TokenParseFailed => "ai-gateway.token_parse_failed",
            GatewayError::NoUserId => "ai-gateway.no_userid",
            GatewayError::Unauthorized => "admin.unauthorized",
            GatewayError::StarRequired => "quota-check.star_required",
            GatewayError::TotalQuotaError(_) => "quota-check.total_quota_error",
            GatewayError::UsedQuotaError(_) => "quota-check.used_quota_error",
            GatewayError::InsufficientQuota { .. } => "quota-check.insufficient_quota",
            GatewayError::InvalidParams(_) => "admin.invalid_params",
            GatewayError::InvalidTotalQuota => "quota-check.invalid_total_quota",
            GatewayError::InvalidUsedQuota => "quota-check.invalid_used_quota",
            GatewayError::InvalidQuotaFormat(_) => "admin.invalid_quota_format",
            GatewayError::InvalidQuotaValue(_) => "admin.invalid_quota_value",
            GatewayError::DeductionFailed(_) => "quota-check.deduction_failed",
            GatewayError::DeductionInconsistent => "quota-check.deduction_inconsistent",
            GatewayError::BuildModelsFailed(_) => "catalogue.build_models_failed",
            GatewayError::StoreError(_) => "store.error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoToken
            | GatewayError::InvalidToken
            | GatewayError::TokenParseFailed
            | GatewayError::NoUserId => StatusCode::UNAUTHORIZED,

            GatewayError::Unauthorized
            | GatewayError::StarRequired
            | GatewayError::TotalQuotaError(_)
            | GatewayError::UsedQuotaError(_)
            | GatewayError::InsufficientQuota { .. } => StatusCode::FORBIDDEN,

            GatewayError::InvalidParams(_)
            | GatewayError::InvalidQuotaFormat(_)
            | GatewayError::InvalidQuotaValue(_) => StatusCode::BAD_REQUEST,

            GatewayError::InvalidTotalQuota
            | GatewayError::InvalidUsedQuota
            | GatewayError::DeductionFailed(_)
            | GatewayError::DeductionInconsistent
            | GatewayError::BuildModelsFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,

            GatewayError::StoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            GatewayError::NoToken => "no authorization header present".to_string(),
            GatewayError::InvalidToken => "authorization header is empty".to_string(),
            GatewayError::TokenParseFailed => "failed to parse bearer token".to_string(),
            GatewayError::NoUserId => "token contains no usable identity claim".to_string(),
            GatewayError::Unauthorized => "admin key mismatch".to_string(),
            GatewayError::StarRequired => "gate flag not set for this identity".to_string(),
            GatewayError::TotalQuotaError(detail) => format!("total quota read failed: {detail}"),
            GatewayError::UsedQuotaError(detail) => format!("used quota read failed: {detail}"),
            GatewayError::InsufficientQuota {
                required,
                available,
            } => format!("Required: {required}, Available: {available}"),
            GatewayError::InvalidParams(detail) => detail.clone(),
            GatewayError::InvalidTotalQuota => "stored total quota value is malformed".to_string(),
            GatewayError::InvalidUsedQuota => "stored used quota value is malformed".to_string(),
            GatewayError::InvalidQuotaFormat(detail) => detail.clone(),
            GatewayError::InvalidQuotaValue(detail) => detail.clone(),
            GatewayError::DeductionFailed(detail) => format!("quota deduction failed: {detail}"),
            GatewayError::DeductionInconsistent => {
                "quota deduction produced an inconsistent counter value".to_string()
            }
            GatewayError::BuildModelsFailed(detail) => detail.clone(),
            GatewayError::StoreError(detail) => detail.clone(),
        }
    }

    /// Convert a total-quota read failure, applying the phase-specific error code
    /// rather than a single blanket conversion.
    pub fn from_total_read(err: ReadIntError) -> Self {
        match err {
            ReadIntError::Store(e) => GatewayError::TotalQuotaError(e.to_string()),
            ReadIntError::Malformed(_) => GatewayError::InvalidTotalQuota,
        }
    }

    pub fn from_used_read(err: ReadIntError) -> Self {
        match err {
            ReadIntError::Store(e) => GatewayError::UsedQuotaError(e.to_string()),
            ReadIntError::Malformed(_) => GatewayError::InvalidUsedQuota,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    code: &'static str,
    message: String,
    success: bool,
    data: Option<()>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            code: self.code(),
            message: self.message(),
            success: false,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_contract_table() {
        assert_eq!(GatewayError::NoToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatewayError::InsufficientQuota {
                required: 2,
                available: 1
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::InvalidTotalQuota.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::StoreError("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn insufficient_quota_message_matches_literal_format() {
        let err = GatewayError::InsufficientQuota {
            required: 2,
            available: 1,
        };
        assert_eq!(err.message(), "Required: 2, Available: 1");
    }
}

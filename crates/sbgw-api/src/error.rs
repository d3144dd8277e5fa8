//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sbgw_core::{CanonicalValue, GatewayError};
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    /// Device-reported error payload
    detail: Option<CanonicalValue>,
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<CanonicalValue>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log errors at appropriate levels
        if self.status.is_server_error() {
            tracing::error!(error = self.kind, message = %self.message, "API error");
        } else if self.status.is_client_error() {
            tracing::debug!(error = self.kind, message = %self.message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: self.kind,
            message: self.message,
            detail: self.detail,
        });

        (self.status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = err.kind();
        let message = err.to_string();
        let detail = match err {
            GatewayError::Protocol { detail, .. } => detail,
            _ => None,
        };

        Self {
            status,
            kind,
            message,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gateway_error_status_mapping() {
        let cases = [
            (GatewayError::NotFound("r1".into()), StatusCode::NOT_FOUND),
            (GatewayError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                GatewayError::InvalidConfig("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (GatewayError::Unavailable("x".into()), StatusCode::BAD_GATEWAY),
            (GatewayError::protocol("x"), StatusCode::BAD_GATEWAY),
            (
                GatewayError::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                GatewayError::UnsupportedFormat("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_protocol_detail_is_kept() {
        let err = ApiError::from(GatewayError::Protocol {
            message: "rejected".into(),
            detail: Some(CanonicalValue::from("invalid-value")),
        });
        assert_eq!(err.kind, "protocol_error");
        assert_eq!(err.detail, Some(CanonicalValue::from("invalid-value")));
    }
}

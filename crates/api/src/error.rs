//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Fulfillment error.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        FulfillmentError::Validation(_)
        | FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::InvalidStateTransition { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        FulfillmentError::CompensationFailed { .. } => {
            // Already logged under the reconciliation target.
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        FulfillmentError::Store(_) => {
            tracing::error!(error = %err, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Fulfillment(FulfillmentError::Store(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderId, OrderStatus};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_fulfillment_status_codes() {
        assert_eq!(
            status_of(FulfillmentError::not_found("order", OrderId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(FulfillmentError::Validation("cart is empty".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                FulfillmentError::InsufficientStock {
                    title: "Dune".into(),
                    available: 0,
                    requested: 1
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                FulfillmentError::InvalidStateTransition {
                    current: OrderStatus::Delivered,
                    action: "cancel"
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                FulfillmentError::CompensationFailed {
                    order_id: OrderId::new(),
                    reason: "ledger".into()
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_hide_details() {
        let err: ApiError = StoreError::Corrupt("bad status text".into()).into();
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized() {
        assert_eq!(
            status_of(ApiError::Unauthorized("missing x-user-id".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}

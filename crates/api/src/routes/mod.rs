//! HTTP route handlers.

pub mod admin;
pub mod cart;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, mapping failures to `400 Bad Request`.
pub(crate) fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {kind} id: {raw}")))
}

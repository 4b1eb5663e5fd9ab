//! Utility functions and extractors for REST API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use super::error::{validation_error, ApiError, ErrorCode};
use crate::domain::{Address, Role, RoleId};

/// JSON body extractor whose rejections use the structured error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
    }
}

/// Parse a `0x`-prefixed address taken from a path segment.
pub fn parse_address(raw: &str, field: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| validation_error(field, format!("invalid {field} {raw}: {e}")))
}

/// Parse a role given by name (`farmer`, `FARMER_ROLE`) or hex id.
pub fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse::<Role>()
        .map_err(|e| validation_error("role", e))
}

/// Resolve a role reference to a raw [`RoleId`].
///
/// Hex ids pass through unchecked so the registry can reject unrecognized
/// ones itself. Names must be one of the six roles.
pub fn parse_role_id(raw: &str) -> Result<RoleId, ApiError> {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") {
        trimmed
            .parse::<RoleId>()
            .map_err(|e| validation_error("role", format!("invalid role id {trimmed}: {e}")))
    } else {
        parse_role(trimmed).map(|role| role.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address = Address::random();
        assert_eq!(
            parse_address(&address.to_string(), "address").unwrap(),
            address
        );
        let err = parse_address("0x12", "address").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn test_parse_role_id_accepts_names_and_hex() {
        assert_eq!(parse_role_id("retailer").unwrap(), Role::Retailer.id());

        let unknown = RoleId::from_name("GARDENER_ROLE");
        assert_eq!(parse_role_id(&unknown.to_string()).unwrap(), unknown);

        assert!(parse_role_id("gardener").is_err());
        assert!(parse_role_id("0xzz").is_err());
    }
}

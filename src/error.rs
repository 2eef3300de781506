use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;

/// Machine readable code of an authorization failure.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingHeader,
    MalformedHeader,
    InvalidHeader,
    KeyFetchError,
    KeyNotFound,
    InvalidClaims,
    TokenExpired,
    UnparseableToken,
    PermissionsClaimMissing,
    PermissionDenied,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingHeader => "missing_header",
            ErrorCode::MalformedHeader => "malformed_header",
            ErrorCode::InvalidHeader => "invalid_header",
            ErrorCode::KeyFetchError => "key_fetch_error",
            ErrorCode::KeyNotFound => "key_not_found",
            ErrorCode::InvalidClaims => "invalid_claims",
            ErrorCode::TokenExpired => "token_expired",
            ErrorCode::UnparseableToken => "unparseable_token",
            ErrorCode::PermissionsClaimMissing => "permissions_claim_missing",
            ErrorCode::PermissionDenied => "permission_denied",
        }
    }
}

/// Reasons why the issuer's JWK set could not be obtained.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum KeyFetchError {
    #[error("request for JWK set failed")]
    Request(#[from] reqwest::Error),
    #[error("received error response when fetching JWK set: {status_code}")]
    ErrorResponse { status_code: StatusCode },
    #[error("JWK set is not valid JSON")]
    Malformed(#[from] serde_json::Error),
    #[error("JWK set publishes more than one key with kid `{kid}`")]
    DuplicateKeyId { kid: String },
    #[error("JWK set request was dropped by the rate limiter")]
    RateLimited,
    #[error("JWK set fetch shared with concurrent requests failed")]
    Shared(#[source] Arc<Error>),
}

/// An authorization failure.
///
/// The `Display` output is meant for logs and may contain details of the underlying cause. Responses only ever carry
/// [`Error::code`], [`Error::description`] and [`Error::status_code`].
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authorization header is missing")]
    MissingHeader,
    #[error("malformed authorization header: {0}")]
    MalformedHeader(&'static str),
    #[error("missing kid in token header")]
    InvalidHeader,
    #[error("failed to fetch JWK set")]
    KeyFetch(#[from] KeyFetchError),
    #[error("no JWK matches the kid of the token header")]
    KeyNotFound,
    #[error("token claims rejected")]
    InvalidClaims(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    TokenExpired,
    #[error("JWT validation failed")]
    UnparseableToken(#[source] jsonwebtoken::errors::Error),
    #[error("permissions claim missing from token")]
    PermissionsClaimMissing,
    #[error("token lacks permission `{0}`")]
    PermissionDenied(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::MissingHeader => ErrorCode::MissingHeader,
            Error::MalformedHeader(_) => ErrorCode::MalformedHeader,
            Error::InvalidHeader => ErrorCode::InvalidHeader,
            Error::KeyFetch(_) => ErrorCode::KeyFetchError,
            Error::KeyNotFound => ErrorCode::KeyNotFound,
            Error::InvalidClaims(_) => ErrorCode::InvalidClaims,
            Error::TokenExpired => ErrorCode::TokenExpired,
            Error::UnparseableToken(_) => ErrorCode::UnparseableToken,
            Error::PermissionsClaimMissing => ErrorCode::PermissionsClaimMissing,
            Error::PermissionDenied(_) => ErrorCode::PermissionDenied,
        }
    }

    /// User facing description of the failure.
    pub fn description(&self) -> &'static str {
        match self {
            Error::MissingHeader => "Authorization header is expected.",
            Error::MalformedHeader(description) => *description,
            Error::InvalidHeader => "Authorization malformed.",
            Error::KeyFetch(_) => "Unable to fetch the signing keys.",
            Error::KeyNotFound => "Unable to find the appropriate key.",
            Error::InvalidClaims(_) => "Incorrect claims. Please, check the audience and issuer.",
            Error::TokenExpired => "Token expired.",
            Error::UnparseableToken(_) => "Unable to parse authentication token.",
            Error::PermissionsClaimMissing => "Permissions not included in JWT.",
            Error::PermissionDenied(_) => "Permission not found.",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingHeader
            | Error::MalformedHeader(_)
            | Error::InvalidHeader
            | Error::InvalidClaims(_)
            | Error::TokenExpired => StatusCode::UNAUTHORIZED,
            Error::KeyNotFound | Error::UnparseableToken(_) | Error::PermissionsClaimMissing => {
                StatusCode::BAD_REQUEST
            }
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::KeyFetch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": status_code.as_u16(),
            "code": self.code(),
            "message": self.description(),
        }));
        (status_code, body).into_response()
    }
}

#[cfg(test)]
mod test {
    use axum::response::IntoResponse;
    use http::StatusCode;

    use super::{Error, ErrorCode, KeyFetchError};

    #[test]
    fn test_status_codes_follow_error_family() {
        assert_eq!(Error::MissingHeader.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::MalformedHeader("Token not found.").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::InvalidHeader.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::KeyNotFound.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::PermissionsClaimMissing.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::PermissionDenied("post:articles".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::from(KeyFetchError::RateLimited).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_codes_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorCode::PermissionsClaimMissing).unwrap(),
            serde_json::json!("permissions_claim_missing")
        );
        assert_eq!(ErrorCode::KeyFetchError.as_str(), "key_fetch_error");
    }

    #[tokio::test]
    async fn test_response_body_carries_code_and_description_only() {
        let error = Error::from(KeyFetchError::DuplicateKeyId {
            kid: "42".to_string(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": 502,
                "code": "key_fetch_error",
                "message": "Unable to fetch the signing keys.",
            })
        );
    }
}

use std::fmt;

use http::{header::AUTHORIZATION, HeaderMap};

use crate::Error;

const BEARER_SCHEME: &str = "bearer";

/// Credential taken verbatim from an `Authorization: Bearer <token>` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Extracts the bearer token from the `Authorization` header of a request.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<BearerToken, Error> {
    let header = headers.get(AUTHORIZATION).ok_or(Error::MissingHeader)?;
    let header = header.to_str().map_err(|_| {
        Error::MalformedHeader("Authorization header must be bearer token.")
    })?;
    parse_authorization(header)
}

/// Parses the value of an `Authorization` header.
///
/// The value has to consist of exactly two parts separated by a single space: the scheme `Bearer` (compared case
/// insensitively) and a non-empty credential.
pub fn parse_authorization(header: &str) -> Result<BearerToken, Error> {
    let parts: Vec<&str> = header.split(' ').collect();

    if !parts[0].eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(Error::MalformedHeader(
            "Authorization header must start with \"Bearer\".",
        ));
    }

    match parts.as_slice() {
        [_] => Err(Error::MalformedHeader("Token not found.")),
        [_, token] if token.is_empty() => Err(Error::MalformedHeader("Token not found.")),
        [_, token] => Ok(BearerToken(token.to_string())),
        _ => Err(Error::MalformedHeader(
            "Authorization header must be bearer token.",
        )),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verified claim set of a token.
///
/// Only produced by [`crate::TokenVerifier::verify`]; holds the payload exactly as it was signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.0.get("iss").and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// The `aud` claim, which is either a single string or an array of strings.
    pub fn audience(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(audience)) => vec![audience.as_str()],
            Some(Value::Array(audiences)) => audiences.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Expiry as seconds since the unix epoch.
    pub fn expiry(&self) -> Option<u64> {
        self.0.get("exp").and_then(Value::as_u64)
    }

    /// The `permissions` claim, `None` if the token carries no permission list.
    ///
    /// Entries that are not strings are skipped.
    pub fn permissions(&self) -> Option<Vec<&str>> {
        match self.0.get("permissions") {
            Some(Value::Array(permissions)) => {
                Some(permissions.iter().filter_map(Value::as_str).collect())
            }
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::KeyFetchError, remote_key_set::RemoteKeySet, Error};

/// Public RSA key as published in the issuer's JWK set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    #[serde(rename = "kid")]
    pub key_id: String,
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "use", default)]
    pub usage: String,
    #[serde(rename = "n")]
    pub modulus: String,
    #[serde(rename = "e")]
    pub exponent: String,
}

/// JWK set document, i.e. the body of `.well-known/jwks.json`.
///
/// Entries that are not RSA signing keys (no `kid`, `n` or `e`) are skipped when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawKeySet")]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

impl From<RawKeySet> for KeySet {
    fn from(raw: RawKeySet) -> Self {
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SigningKey>(entry) {
                Ok(key) => Some(key),
                Err(err) => {
                    debug!(error = %err, "skipping unusable JWK");
                    None
                }
            })
            .collect();
        KeySet { keys }
    }
}

impl KeySet {
    /// Finds the key with the given kid.
    ///
    /// A set publishing the kid more than once is rejected instead of trusting either key.
    pub fn find(&self, kid: &str) -> Result<Option<&SigningKey>, Error> {
        let mut matching = self.keys.iter().filter(|key| key.key_id == kid);
        let key = matching.next();
        if matching.next().is_some() {
            return Err(KeyFetchError::DuplicateKeyId {
                kid: kid.to_string(),
            }
            .into());
        }
        Ok(key)
    }
}

/// Where signing keys come from: either a [`RemoteKeySet`] or a local [`KeySet`].
#[derive(Clone)]
pub enum KeySource {
    Local(KeySet),
    Remote(RemoteKeySet),
}

impl KeySource {
    /// Resolves the key for `kid`, fetching the remote set if necessary.
    pub async fn find(&self, kid: &str) -> Result<Option<SigningKey>, Error> {
        match self {
            KeySource::Local(key_set) => Ok(key_set.find(kid)?.cloned()),
            KeySource::Remote(remote_key_set) => {
                let key_set = remote_key_set.key_set().await?;
                Ok(key_set.find(kid)?.cloned())
            }
        }
    }
}

impl From<KeySet> for KeySource {
    fn from(key_set: KeySet) -> Self {
        KeySource::Local(key_set)
    }
}

impl From<RemoteKeySet> for KeySource {
    fn from(remote_key_set: RemoteKeySet) -> Self {
        KeySource::Remote(remote_key_set)
    }
}

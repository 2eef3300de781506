use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    bearer::BearerToken,
    claims::Claims,
    config::AuthConfig,
    key_set::{KeySource, SigningKey},
    Error,
};

const RSA_KEY_TYPE: &str = "RSA";

/// Verifies bearer tokens against the issuer's signing keys.
///
/// Every call resolves the signing key anew; results are never cached.
#[derive(Clone)]
pub struct TokenVerifier {
    key_source: KeySource,
    config: AuthConfig,
}

impl TokenVerifier {
    pub fn new(key_source: impl Into<KeySource>, config: AuthConfig) -> Self {
        Self {
            key_source: key_source.into(),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Checks the token's signature, audience, issuer, expiry and not-before time and returns its claims.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &BearerToken) -> Result<Claims, Error> {
        let token = token.as_str();

        // First, just decode the header part of the token, without validating the token, to get the kid.
        let header = decode_header(token).map_err(Error::UnparseableToken)?;
        let kid = header.kid.ok_or(Error::InvalidHeader)?;

        let signing_key = self
            .key_source
            .find(&kid)
            .await?
            .ok_or(Error::KeyNotFound)?;
        debug!(kid = %kid, "resolved signing key");

        let decoding_key = decoding_key(&signing_key)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = self.config.algorithms().to_vec();
        validation.leeway = self.config.leeway();
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.set_audience(&[self.config.audience()]);
        validation.set_issuer(&[self.config.issuer().as_str()]);

        let token_data =
            decode::<Map<String, Value>>(token, &decoding_key, &validation).map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => Error::TokenExpired,
                    ErrorKind::InvalidAudience
                    | ErrorKind::InvalidIssuer
                    | ErrorKind::ImmatureSignature
                    | ErrorKind::MissingRequiredClaim(_) => Error::InvalidClaims(err),
                    _ => Error::UnparseableToken(err),
                }
            })?;
        Ok(Claims(token_data.claims))
    }
}

fn decoding_key(signing_key: &SigningKey) -> Result<DecodingKey, Error> {
    if signing_key.key_type != RSA_KEY_TYPE {
        return Err(Error::UnparseableToken(ErrorKind::InvalidKeyFormat.into()));
    }
    DecodingKey::from_rsa_components(&signing_key.modulus, &signing_key.exponent)
        .map_err(Error::UnparseableToken)
}

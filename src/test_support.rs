//! Mock issuer shared by the unit tests: serves a JWK set and mints tokens signed with its key.

use std::time::{Duration, SystemTime};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use openssl::rsa::Rsa;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{config::AuthConfig, key_set::KeySet, key_set::SigningKey};

pub const KID: &str = "42";
pub const AUDIENCE: &str = "my-blog";

pub struct MockAuthServer {
    _inner_server: MockServer,
    issuer: Url,
    signing_key: SigningKey,
    encoding_key: EncodingKey,
}

/// Generates an RSA key pair and returns its public JWK together with the private signing key.
pub fn generate_key(kid: &str) -> (SigningKey, EncodingKey) {
    let rsa_private_key = Rsa::generate(2048).unwrap();
    let signing_key = SigningKey {
        key_id: kid.to_string(),
        key_type: "RSA".to_string(),
        usage: "sig".to_string(),
        modulus: base64_url::encode(&rsa_private_key.n().to_vec()),
        exponent: base64_url::encode(&rsa_private_key.e().to_vec()),
    };
    let encoding_key = EncodingKey::from_rsa_der(&rsa_private_key.private_key_to_der().unwrap());
    (signing_key, encoding_key)
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn sign(kid: Option<&str>, claims: &serde_json::Value, encoding_key: &EncodingKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    jsonwebtoken::encode(&header, claims, encoding_key).unwrap()
}

impl MockAuthServer {
    pub async fn new() -> MockAuthServer {
        let (signing_key, encoding_key) = generate_key(KID);
        let jwks = KeySet {
            keys: vec![signing_key.clone()],
        };

        let mock_auth_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(".well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .mount(&mock_auth_server)
            .await;

        let issuer = Url::parse(&mock_auth_server.uri()).unwrap();

        MockAuthServer {
            _inner_server: mock_auth_server,
            issuer,
            signing_key,
            encoding_key,
        }
    }

    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    pub fn jwks_url(&self) -> Url {
        self.issuer.join(".well-known/jwks.json").unwrap()
    }

    pub fn config(&self) -> AuthConfig {
        AuthConfig::new(self.issuer.clone(), AUDIENCE)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Claims of a valid token for this issuer, expiring in an hour.
    pub fn claims(&self, permissions: &[&str]) -> serde_json::Value {
        let issued_at = unix_now();
        let expires_at = issued_at + Duration::from_secs(3600).as_secs();
        serde_json::json!({
            "sub": "auth0|1234567890",
            "aud": AUDIENCE,
            "iss": self.issuer,
            "iat": issued_at,
            "exp": expires_at,
            "permissions": permissions,
        })
    }

    /// Signs arbitrary claims with the server's key.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        sign(Some(KID), claims, &self.encoding_key)
    }

    pub fn token(&self, permissions: &[&str]) -> String {
        self.sign(&self.claims(permissions))
    }
}

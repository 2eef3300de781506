use config::{Config, Environment};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use url::Url;

/// Path under the issuer where the JWK set is published.
pub const JWKS_ENDPOINT: &str = ".well-known/jwks.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load authorization settings")]
    Load(#[from] config::ConfigError),
    #[error("invalid issuer url")]
    InvalidIssuer(#[from] url::ParseError),
    #[error("at least one signature algorithm must be allowed")]
    NoAlgorithms,
    #[error("signature algorithm {0:?} is not supported, only RSA algorithms are")]
    UnsupportedAlgorithm(Algorithm),
}

/// Static settings of the token verifier, supplied once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    issuer: Url,
    audience: String,
    algorithms: Vec<Algorithm>,
    leeway: u64,
}

#[derive(Deserialize)]
struct Settings {
    domain: String,
    audience: String,
    #[serde(default = "default_algorithms")]
    algorithms: Vec<Algorithm>,
    #[serde(default)]
    leeway: u64,
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

fn is_rsa(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

impl AuthConfig {
    /// Accepts tokens issued by `issuer` for `audience`, signed with RS256.
    ///
    /// The issuer is compared verbatim with the `iss` claim, so a trailing slash is significant.
    pub fn new(issuer: Url, audience: impl Into<String>) -> Self {
        Self {
            issuer,
            audience: audience.into(),
            algorithms: default_algorithms(),
            leeway: 0,
        }
    }

    /// Configuration for an issuer identified by its domain, e.g. `my-tenant.eu.auth0.com`, which results in the
    /// issuer `https://my-tenant.eu.auth0.com/`.
    pub fn for_domain(domain: &str, audience: impl Into<String>) -> Result<Self, ConfigError> {
        let issuer = Url::parse(&format!("https://{domain}/"))?;
        Ok(Self::new(issuer, audience))
    }

    /// Reads `AUTH_DOMAIN`, `AUTH_AUDIENCE` and the optional `AUTH_LEEWAY` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("AUTH"))
            .build()?;
        Self::from_config(config)
    }

    /// Builds the configuration from the `domain`, `audience`, `algorithms` and `leeway` keys of `config`.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        Self::for_domain(&settings.domain, settings.audience)?
            .with_algorithms(settings.algorithms)
            .map(|config| config.with_leeway(settings.leeway))
    }

    /// Replaces the allow-list of signature algorithms. Only RSA based algorithms are accepted.
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Result<Self, ConfigError> {
        if algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        if let Some(algorithm) = algorithms.iter().find(|algorithm| !is_rsa(**algorithm)) {
            return Err(ConfigError::UnsupportedAlgorithm(*algorithm));
        }
        self.algorithms = algorithms;
        Ok(self)
    }

    /// Clock skew in seconds tolerated when checking the expiry of a token.
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    pub fn leeway(&self) -> u64 {
        self.leeway
    }

    /// Location of the issuer's published JWK set.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        Ok(self.issuer.join(JWKS_ENDPOINT)?)
    }
}

#[cfg(test)]
mod test {
    use config::Config;
    use jsonwebtoken::Algorithm;

    use super::{AuthConfig, ConfigError};

    #[test]
    fn test_issuer_and_jwks_url_for_domain() {
        let config = AuthConfig::for_domain("tenant.us.auth0.com", "my-blog").unwrap();
        assert_eq!(config.issuer().as_str(), "https://tenant.us.auth0.com/");
        assert_eq!(
            config.jwks_url().unwrap().as_str(),
            "https://tenant.us.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(config.audience(), "my-blog");
        assert_eq!(config.algorithms(), &[Algorithm::RS256]);
        assert_eq!(config.leeway(), 0);
    }

    #[test]
    fn test_from_config() {
        let config = Config::builder()
            .set_override("domain", "tenant.us.auth0.com")
            .unwrap()
            .set_override("audience", "my-blog")
            .unwrap()
            .set_override("leeway", 5_i64)
            .unwrap()
            .build()
            .unwrap();

        let config = AuthConfig::from_config(config).unwrap();
        assert_eq!(config.issuer().as_str(), "https://tenant.us.auth0.com/");
        assert_eq!(config.audience(), "my-blog");
        assert_eq!(config.algorithms(), &[Algorithm::RS256]);
        assert_eq!(config.leeway(), 5);
    }

    #[test]
    fn test_from_config_requires_audience() {
        let config = Config::builder()
            .set_override("domain", "tenant.us.auth0.com")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            AuthConfig::from_config(config),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_rejects_non_rsa_algorithms() {
        let config = AuthConfig::for_domain("tenant.us.auth0.com", "my-blog").unwrap();
        assert!(matches!(
            config.clone().with_algorithms(vec![Algorithm::HS256]),
            Err(ConfigError::UnsupportedAlgorithm(Algorithm::HS256))
        ));
        assert!(matches!(
            config.clone().with_algorithms(vec![]),
            Err(ConfigError::NoAlgorithms)
        ));
        assert!(config
            .with_algorithms(vec![Algorithm::RS256, Algorithm::RS512])
            .is_ok());
    }
}

use std::{
    task::{Context, Poll},
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::Client;
use tower::{
    buffer::BufferLayer, util::BoxCloneSyncService, BoxError, Layer, ServiceBuilder, ServiceExt,
};
use tower_layer::layer_fn;
use tower_service::Service;
use tracing::debug;
use url::Url;

use crate::{error::KeyFetchError, key_cache::KeyCacheLayer, key_set::KeySet, Error};

struct CacheConfig {
    time_to_live: Duration,
}

struct RateLimitConfig {
    num: u64,
    per: Duration,
}

/// Builder for configuring a `RemoteKeySet` with optional caching, rate limiting and a request timeout.
///
/// Without any options every lookup fetches the key set anew.
pub struct RemoteKeySetBuilder {
    url: Url,
    cache_config: Option<CacheConfig>,
    rate_limit_config: Option<RateLimitConfig>,
    timeout: Option<Duration>,
}

impl RemoteKeySetBuilder {
    /// Creates a new builder with the given JWKS URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            cache_config: None,
            rate_limit_config: None,
            timeout: None,
        }
    }

    /// Enables caching to avoid re-fetching the remote key set on every authentication request.
    pub fn with_cache(mut self, time_to_live: Duration) -> Self {
        self.cache_config = Some(CacheConfig { time_to_live });
        self
    }

    /// Allows at most `num` requests to the JWKS endpoint per `per`.
    pub fn with_rate_limit(mut self, num: u64, per: Duration) -> Self {
        self.rate_limit_config = Some(RateLimitConfig { num, per });
        self
    }

    /// Deadline for a single request to the JWKS endpoint.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `RemoteKeySet` with the configured options.
    ///
    /// Rate limiting spawns a buffer worker and therefore has to be configured from within a tokio runtime.
    pub fn build(self) -> RemoteKeySet {
        let request_service = KeySetRequestService {
            http_client: Client::new(),
            url: self.url,
            timeout: self.timeout,
        };

        let cache_layer = self
            .cache_config
            .map(|cache_config| KeyCacheLayer::new(cache_config.time_to_live));

        let rate_limit_layer = self.rate_limit_config.map(|rate_limit_config| {
            layer_fn(move |inner: KeySetRequestService| {
                let rate_limit =
                    tower::limit::RateLimitLayer::new(rate_limit_config.num, rate_limit_config.per);
                let rate_limited_service = rate_limit.layer(inner);

                // The rate limiter is not `Clone`, the buffer in front of it is.
                let buffered_service = BufferLayer::<()>::new(1024).layer(rate_limited_service);

                buffered_service.map_err(|err: BoxError| match err.downcast::<Error>() {
                    Ok(err) => *err,
                    Err(_) => KeyFetchError::RateLimited.into(),
                })
            })
        });

        let service_tower = ServiceBuilder::new()
            .option_layer(cache_layer)
            .option_layer(rate_limit_layer)
            .service(request_service);

        RemoteKeySet {
            service_tower: BoxCloneSyncService::new(service_tower),
        }
    }
}

/// Key set published by the issuer, fetched over HTTP.
#[derive(Clone)]
pub struct RemoteKeySet {
    service_tower: BoxCloneSyncService<(), KeySet, Error>,
}

impl RemoteKeySet {
    /// Creates a builder for configuring a `RemoteKeySet`.
    pub fn builder(url: Url) -> RemoteKeySetBuilder {
        RemoteKeySetBuilder::new(url)
    }

    /// Returns the current key set, served from the cache if one is configured.
    pub async fn key_set(&self) -> Result<KeySet, Error> {
        self.service_tower.clone().oneshot(()).await
    }
}

/// Helper service wrapping a `reqwest::Client` to fetch a key set from a given URL.
#[derive(Clone)]
struct KeySetRequestService {
    http_client: Client,
    url: Url,
    timeout: Option<Duration>,
}

impl Service<()> for KeySetRequestService {
    type Response = KeySet;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        let http_client = self.http_client.clone();
        let url = self.url.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            debug!(%url, "fetching JWK set");
            let mut request = http_client.get(url);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            let response = request.send().await.map_err(KeyFetchError::from)?;

            if !response.status().is_success() {
                return Err(KeyFetchError::ErrorResponse {
                    status_code: response.status(),
                }
                .into());
            }

            let body = response.bytes().await.map_err(KeyFetchError::from)?;
            let key_set: KeySet = serde_json::from_slice(&body).map_err(KeyFetchError::from)?;
            debug!(keys = key_set.keys.len(), "fetched JWK set");
            Ok(key_set)
        })
    }
}

use std::{
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::future::BoxFuture;
use moka::future::Cache;
use tower::{Layer, Service, ServiceExt};
use tracing::debug;

use crate::{error::KeyFetchError, key_set::KeySet, Error};

const CACHE_KEY: &str = "jwk_set";

/// Caches the key set returned by the inner service for a fixed time-to-live.
#[derive(Clone)]
pub struct KeyCacheLayer {
    cache: Cache<String, KeySet>,
}

impl KeyCacheLayer {
    pub fn new(time_to_live: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(time_to_live)
            .build();
        KeyCacheLayer { cache }
    }
}

impl<S> Layer<S> for KeyCacheLayer {
    type Service = KeyCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        KeyCacheService {
            inner,
            cache: self.cache.clone(),
        }
    }
}

/// Can safely be cloned and shared across threads since moka internally uses an Arc.
#[derive(Clone)]
pub struct KeyCacheService<S> {
    inner: S,
    cache: Cache<String, KeySet>,
}

impl<S> Service<()> for KeyCacheService<S>
where
    S: Service<(), Response = KeySet, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = KeySet;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is only driven on a cache miss, see `call`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        let cache = self.cache.clone();
        let inner = self.inner.clone();
        Box::pin(async move {
            // Concurrent misses wait for a single fetch.
            cache
                .try_get_with(CACHE_KEY.to_string(), async move {
                    debug!("JWK set cache miss");
                    inner.oneshot(()).await
                })
                .await
                .map_err(|err| match Arc::try_unwrap(err) {
                    Ok(err) => err,
                    Err(shared) => KeyFetchError::Shared(shared).into(),
                })
        })
    }
}

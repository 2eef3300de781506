use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use http::HeaderMap;
use tower::Layer;
use tower_service::Service;
use tracing::{debug, instrument, warn};

use crate::{
    bearer::{extract_bearer_token, BearerToken},
    claims::Claims,
    permissions::check_permission,
    verifier::TokenVerifier,
    Error,
};

/// Guard run before every protected operation: extracts the bearer token, verifies it and checks the required
/// permission, stopping at the first failure.
#[derive(Clone)]
pub struct Authorizer {
    verifier: Arc<TokenVerifier>,
}

impl Authorizer {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    /// Authorizes a request given its headers. Pass an empty `permission` for operations that only need a valid
    /// token.
    pub async fn authorize(&self, headers: &HeaderMap, permission: &str) -> Result<Claims, Error> {
        let token = extract_bearer_token(headers).inspect_err(|err| log_rejection(permission, err))?;
        self.authorize_token(&token, permission).await
    }

    #[instrument(skip(self, token))]
    pub async fn authorize_token(
        &self,
        token: &BearerToken,
        permission: &str,
    ) -> Result<Claims, Error> {
        let result = match self.verifier.verify(token).await {
            Ok(claims) => check_permission(permission, &claims).map(|()| claims),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            log_rejection(permission, err);
        }
        result
    }

    /// Layer protecting a route with `permission`.
    pub fn require(&self, permission: &str) -> AuthorizationLayer {
        AuthorizationLayer {
            authorizer: self.clone(),
            permission: Arc::from(permission),
        }
    }
}

fn log_rejection(permission: &str, err: &Error) {
    if err.status_code().is_server_error() {
        warn!(permission, code = err.code().as_str(), error = %err, "authorization failed");
    } else {
        debug!(permission, code = err.code().as_str(), error = %err, "request rejected");
    }
}

/// `tower` layer that runs the [`Authorizer`] for a fixed permission and makes the verified [`Claims`] available to
/// the handler as a request extension.
#[derive(Clone)]
pub struct AuthorizationLayer {
    authorizer: Authorizer,
    permission: Arc<str>,
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService {
            inner,
            authorizer: self.authorizer.clone(),
            permission: self.permission.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    authorizer: Authorizer,
    permission: Arc<str>,
}

impl<S> Service<Request> for AuthorizationService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // Move the original service into the closure instead of its clone. This makes sure that the original service is
        // `call`ed instead of the cloned one, which might not be ready yet (`poll_ready` hasn't been called on the
        // clone yet).
        // See [docs](https://docs.rs/tower/latest/tower/trait.Service.html#be-careful-when-cloning-inner-services).
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);

        let authorizer = self.authorizer.clone();
        let permission = self.permission.clone();
        Box::pin(async move {
            let authorize_result = authorizer.authorize(req.headers(), &permission).await;
            match authorize_result {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    inner.call(req).await
                }
                Err(auth_error) => Ok(auth_error.into_response()),
            }
        })
    }
}

//! Bearer token authorization for the blog API.
//!
//! ## Overview
//!
//! Every protected operation of the blog API (creating, updating or deleting articles and collections) is guarded by
//! a [JSON Web Token (JWT)](https://datatracker.ietf.org/doc/html/rfc7519) issued by an OAuth2 authorization server.
//! This crate is the gate the API consults for each request:
//!
//! 1. the token is taken from the `Authorization: Bearer <token>` header,
//! 2. the key it was signed with is looked up by its `kid` in the issuer's published
//!    [JWK set](https://datatracker.ietf.org/doc/html/rfc7517),
//! 3. signature, audience, issuer and expiry are verified,
//! 4. the token's `permissions` claim must contain the permission the operation requires.
//!
//! Failures are reported as an [`Error`] carrying a code, a user facing description and an HTTP status. The
//! [`AuthorizationLayer`] renders them as JSON responses for `axum` routes.
//!
//! ## Key set caching
//!
//! By default the JWK set is fetched on every verification. [`RemoteKeySetBuilder`] can put a cache with a
//! time-to-live and a rate limit in front of the issuer's endpoint.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use axum::{routing::post, Extension, Router};
//! use blog_auth::{permissions, AuthConfig, Authorizer, Claims, RemoteKeySet, TokenVerifier};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::for_domain("your-tenant.us.auth0.com", "my-blog")?;
//!     let remote_key_set = RemoteKeySet::builder(config.jwks_url()?)
//!         .with_cache(Duration::from_secs(300))
//!         .with_timeout(Duration::from_secs(5))
//!         .build();
//!     let authorizer = Authorizer::new(TokenVerifier::new(remote_key_set, config));
//!
//!     let router = Router::new().route(
//!         "/api/articles",
//!         post(|Extension(claims): Extension<Claims>| async move {
//!             format!("created by {}", claims.subject().unwrap_or("unknown"))
//!         })
//!         .layer(authorizer.require(permissions::POST_ARTICLES)),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod authorization;
pub mod bearer;
pub mod config;
pub mod permissions;

pub use authorization::{AuthorizationLayer, Authorizer};
pub use bearer::BearerToken;
pub use claims::Claims;
pub use config::AuthConfig;
pub use error::{Error, ErrorCode, KeyFetchError};
pub use key_set::{KeySet, KeySource, SigningKey};
pub use remote_key_set::{RemoteKeySet, RemoteKeySetBuilder};
pub use verifier::TokenVerifier;

mod claims;
mod error;
mod key_cache;
mod key_set;
mod remote_key_set;
#[cfg(test)]
mod test_support;
mod verifier;

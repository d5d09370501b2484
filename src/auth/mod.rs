//! # Authentication
//!
//! Every remote call needs a bearer token for some [`Scope`]. An
//! [`Authenticator`] produces one on demand:
//!
//! ```text
//!                      ┌──────────────────────┐
//!  authenticate(scope) │   Authenticator      │
//! ───────────────────► │                      │
//!                      │  AccessToken         │  static token, fails once expired
//!                      │  CachingAuthenticator│  memoizes + refreshes via a TokenFactory
//!                      └──────────┬───────────┘
//!                                 │ fetch_token(scope)
//!                                 ▼
//!                      ┌──────────────────────┐
//!                      │   TokenFactory       │
//!                      │  RefreshTokenFactory │  OAuth2 refresh-token grant
//!                      │  ServiceAccount      │  JWT-bearer grant (RS256)
//!                      └──────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`scope`]: OAuth scopes and scope matching
//! - [`token`]: [`AccessToken`] and the token endpoint response
//! - [`cache`]: [`TokenFactory`] and the memoizing [`CachingAuthenticator`]
//! - [`oauth`]: authorization-code and refresh-token flows
//! - [`service_account`]: service-account key files and the JWT-bearer flow

use async_trait::async_trait;

use crate::error::Result;

pub mod cache;
pub mod oauth;
pub mod scope;
pub mod service_account;
pub mod token;

pub use cache::{CachingAuthenticator, TokenFactory};
pub use oauth::{OAuthClient, OAuthClientSecret, RefreshTokenFactory};
pub use scope::Scope;
pub use service_account::{ServiceAccount, ServiceAccountKey};
pub use token::AccessToken;

/// Supplies a valid access token for a requested scope.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns a token valid for `scope`.
    ///
    /// Fails with [`Error::Authentication`](crate::Error::Authentication)
    /// when no such token can be produced.
    async fn authenticate(&self, scope: &Scope) -> Result<AccessToken>;

    /// Headers authorizing a request for `scope`.
    async fn authorization_header(&self, scope: &Scope) -> Result<Vec<(String, String)>> {
        let token = self.authenticate(scope).await?;
        Ok(vec![(
            "Authorization".to_string(),
            format!("Bearer {}", token.access_token),
        )])
    }
}

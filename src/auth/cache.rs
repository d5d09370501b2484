//! # Token Memoization
//!
//! Minting a token costs a round trip to the token endpoint, so callers
//! wrap a [`TokenFactory`] in a [`CachingAuthenticator`] that keeps the last
//! token until it expires.
//!
//! ```text
//! authenticate(scope)
//!     │
//!     ▼
//! lock slot ──► Some((token, expires_at)) and fresh and scope covered?
//!     │               │ yes ──► clone token
//!     │               │ no
//!     │               ▼
//!     │         factory.fetch_token(scope).await   (lock still held)
//!     │               │
//!     ▼               ▼
//! unlock        store (token, expires_at)
//! ```
//!
//! ## Rust Pattern: Async Mutex as a Single-Flight Gate
//!
//! The slot is a `tokio::sync::Mutex`, held across the refresh `.await`.
//! Concurrent callers queue on the lock instead of each starting their own
//! refresh; when they get it the fresh token is already there.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::auth::{AccessToken, Authenticator, Scope};
use crate::error::Result;

/// Tokens are treated as expired this long before their real expiry.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Mints a new access token for a scope.
#[async_trait]
pub trait TokenFactory: Send + Sync {
    async fn fetch_token(&self, scope: &Scope) -> Result<AccessToken>;
}

/// An [`Authenticator`] that memoizes tokens from a [`TokenFactory`].
pub struct CachingAuthenticator<F> {
    factory: F,
    slot: Mutex<Option<(AccessToken, Instant)>>,
}

impl<F: TokenFactory> CachingAuthenticator<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            slot: Mutex::new(None),
        }
    }

    /// Starts from a token obtained elsewhere (for example a saved one).
    pub fn with_token(factory: F, token: AccessToken) -> Self {
        let expires_at = expiry_instant(&token);
        Self {
            factory,
            slot: Mutex::new(Some((token, expires_at))),
        }
    }

    /// Drops the memoized token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// The wrapped factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }
}

fn expiry_instant(token: &AccessToken) -> Instant {
    let now = Instant::now();
    now + token.remaining().saturating_sub(EXPIRY_SKEW)
}

#[async_trait]
impl<F: TokenFactory> Authenticator for CachingAuthenticator<F> {
    async fn authenticate(&self, scope: &Scope) -> Result<AccessToken> {
        let mut slot = self.slot.lock().await;

        if let Some((token, expires_at)) = slot.as_ref() {
            if Instant::now() < *expires_at && token.scope.contains_any(scope) {
                return Ok(token.clone());
            }
        }

        let token = self.factory.fetch_token(scope).await?;
        token.validate_for(scope)?;
        info!(scope = %scope, expires_in = ?token.remaining(), "access token refreshed");

        *slot = Some((token.clone(), expiry_instant(&token)));
        Ok(token)
    }
}

// =============================================================================
// Tests
// =============================================================================

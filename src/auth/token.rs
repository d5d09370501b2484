//! # Access Tokens
//!
//! An [`AccessToken`] is a bearer credential with a scope and an absolute
//! expiry. Token endpoints answer with a relative lifetime (`expires_in`);
//! [`TokenResponse::into_access_token`] turns that into an absolute
//! timestamp at the moment the response is received.
//!
//! ## Wire Format
//!
//! Tokens serialize with snake_case fields and the expiry as seconds since
//! the Unix epoch, so a token saved by one process can be loaded by another:
//!
//! ```text
//! { "access_token": "ya29...", "token_type": "Bearer",
//!   "scope": "https://www.googleapis.com/auth/spreadsheets",
//!   "refresh_token": "1//0g...", "expiry_date": 1767225600 }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, Scope};
use crate::error::{Error, Result};

// =============================================================================
// Access Token
// =============================================================================

/// A bearer token valid for a scope until an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The bearer credential.
    pub access_token: String,
    /// HTTP token type, normally `Bearer`.
    pub token_type: String,
    /// Scope the token was granted for.
    pub scope: Scope,
    /// Present for tokens obtained through the authorization-code flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Instant after which the token is rejected.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expiry_date: DateTime<Utc>,
}

impl AccessToken {
    /// True once the expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True if the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> std::time::Duration {
        (self.expiry_date - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Checks expiry and scope, returning the error [`Authenticator`] reports.
    pub fn validate_for(&self, scope: &Scope) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Authentication("token expired".to_string()));
        }
        if !self.scope.contains_any(scope) {
            return Err(Error::Authentication(format!(
                "token scope '{}' does not cover '{}'",
                self.scope, scope
            )));
        }
        Ok(())
    }
}

/// A fixed token authenticates as itself until it expires.
#[async_trait]
impl Authenticator for AccessToken {
    async fn authenticate(&self, scope: &Scope) -> Result<AccessToken> {
        self.validate_for(scope)?;
        Ok(self.clone())
    }
}

// =============================================================================
// Token Endpoint Response
// =============================================================================

/// Successful response of an OAuth2 token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds from now.
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Converts to an [`AccessToken`] expiring `expires_in` seconds from now.
    ///
    /// The granted scope from the response wins over `requested` when present.
    pub fn into_access_token(self, requested: &Scope) -> AccessToken {
        AccessToken {
            access_token: self.access_token,
            token_type: self.token_type,
            scope: self.scope.map(Scope::new).unwrap_or_else(|| requested.clone()),
            refresh_token: self.refresh_token,
            expiry_date: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # Service-Account JWT-Bearer Flow
//!
//! A service account authenticates as itself, without a user. For every
//! token it signs a short-lived JWT with its private key and trades that
//! assertion for an access token:
//!
//! ```text
//! claims { iss: client_email, aud: token_uri, scope, iat, exp: iat + 1h }
//!     │  RS256, header.kid = private_key_id
//!     ▼
//! POST token_uri { grant_type: "urn:ietf:params:oauth:grant-type:jwt-bearer",
//!                  assertion: <jwt> }
//!     │
//!     ▼
//! { access_token, expires_in, token_type }
//! ```
//!
//! Keys are the JSON files the cloud console issues for a service account.
//! [`ServiceAccount::from_env`] follows the usual convention of reading the
//! path from `GOOGLE_APPLICATION_CREDENTIALS`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::auth::token::TokenResponse;
use crate::auth::{AccessToken, CachingAuthenticator, Scope, TokenFactory};
use crate::error::{Error, Result};
use crate::transport::{execute, HttpRequest, Transport};

/// Environment variable holding the path of a service-account key file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Grant type for exchanging a signed assertion.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 60 * 60;

/// A service-account key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    /// Always `service_account`.
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub private_key_id: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    pub token_uri: String,
    #[serde(default)]
    pub client_x509_cert_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
    scope: String,
}

#[derive(Serialize)]
struct AssertionGrant<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

/// A service account ready to mint tokens.
#[derive(Clone)]
pub struct ServiceAccount {
    key: ServiceAccountKey,
    transport: Arc<dyn Transport>,
}

impl ServiceAccount {
    pub fn new(key: ServiceAccountKey, transport: Arc<dyn Transport>) -> Self {
        Self { key, transport }
    }

    /// Parses a key from its JSON text.
    pub fn from_json(json: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;
        if key.key_type != "service_account" {
            return Err(Error::Config(format!(
                "expected a service_account key, got '{}'",
                key.key_type
            )));
        }
        Ok(Self::new(key, transport))
    }

    /// Reads a key file.
    pub fn from_file(path: impl AsRef<Path>, transport: Arc<dyn Transport>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw, transport)
    }

    /// Reads the key file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env(transport: Arc<dyn Transport>) -> Result<Self> {
        let path = std::env::var(CREDENTIALS_ENV)
            .map_err(|_| Error::Config(format!("{CREDENTIALS_ENV} is not set")))?;
        Self::from_file(path, transport)
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// Signs the JWT assertion for `scope`.
    pub fn assertion(&self, scope: &Scope) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            aud: self.key.token_uri.clone(),
            exp: iat + ASSERTION_LIFETIME_SECS,
            iat,
            scope: scope.as_str().to_string(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.private_key_id.clone());

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }

    /// Wraps this account in a memoizing authenticator.
    pub fn into_authenticator(self) -> CachingAuthenticator<ServiceAccount> {
        CachingAuthenticator::new(self)
    }
}

#[async_trait]
impl TokenFactory for ServiceAccount {
    async fn fetch_token(&self, scope: &Scope) -> Result<AccessToken> {
        let assertion = self.assertion(scope)?;
        let request = HttpRequest::post(&self.key.token_uri)
            .header("Content-Type", "application/json")
            .json(&AssertionGrant {
                grant_type: JWT_BEARER_GRANT,
                assertion: &assertion,
            })?;

        let response: TokenResponse = execute(self.transport.as_ref(), request)
            .await
            .map_err(|e| match e {
                Error::Api { status, message } => {
                    Error::Authentication(format!("token endpoint returned {status}: {message}"))
                }
                other => other,
            })?;

        // The endpoint echoes no scope; the token covers what was asserted.
        let mut token = response.into_access_token(scope);
        token.scope = scope.clone();
        Ok(token)
    }
}

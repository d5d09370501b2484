//! # OAuth2 Authorization-Code Flow
//!
//! For acting on behalf of a user:
//!
//! 1. Send the user to [`OAuthClient::auth_url`]; they consent and are
//!    redirected back with a one-time `code`.
//! 2. Exchange it with [`OAuthClient::fetch_token_from_code`]. Because the
//!    URL asks for `access_type=offline`, the token carries a refresh token.
//! 3. Hand that token to [`OAuthClient::factory`] to get an authenticator
//!    that refreshes itself through the `refresh_token` grant.
//!
//! Client credentials come from the JSON file the cloud console issues:
//!
//! ```text
//! { "web": { "client_id": "...", "client_secret": "...",
//!            "redirect_uris": ["https://app.example/callback"],
//!            "auth_uri": "https://accounts.google.com/o/oauth2/auth" } }
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::token::TokenResponse;
use crate::auth::{AccessToken, CachingAuthenticator, Scope, TokenFactory};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::transport::{execute, HttpRequest, Transport};

// =============================================================================
// Client Secret File
// =============================================================================

/// Contents of a downloaded OAuth client secret file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClientSecret {
    pub web: OAuthClientDetails,
}

/// The `web` section of a client secret file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClientDetails {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
    pub auth_uri: String,
}

impl OAuthClientSecret {
    /// Reads and parses a client secret file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn redirect_uri(&self) -> Result<&str> {
        self.web
            .redirect_uris
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::Config("client secret has no redirect_uris".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

/// Body posted to the token endpoint.
#[derive(Debug, Serialize)]
struct OAuthRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: GrantType,
}

// =============================================================================
// OAuth Client
// =============================================================================

/// Runs the authorization-code and refresh-token grants for one client.
#[derive(Clone)]
pub struct OAuthClient {
    secret: OAuthClientSecret,
    transport: Arc<dyn Transport>,
    token_url: String,
}

impl OAuthClient {
    pub fn new(secret: OAuthClientSecret, transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            secret,
            transport,
            token_url: config.token_url.clone(),
        }
    }

    /// Loads the client secret from `path`.
    pub fn from_file(
        path: impl AsRef<Path>,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Result<Self> {
        Ok(Self::new(OAuthClientSecret::from_file(path)?, transport, config))
    }

    pub fn secret(&self) -> &OAuthClientSecret {
        &self.secret
    }

    /// The consent URL a user must visit to grant `scope`.
    pub fn auth_url(&self, scope: &Scope, login_hint: Option<&str>) -> Result<Url> {
        let redirect_uri = self.secret.redirect_uri()?;
        let mut url = Url::parse(&self.secret.web.auth_uri)
            .map_err(|e| Error::Config(format!("invalid auth_uri: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.secret.web.client_id)
                .append_pair("scope", scope.as_str())
                .append_pair("access_type", "offline")
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", redirect_uri);
            if let Some(hint) = login_hint {
                query.append_pair("login_hint", hint);
            }
        }
        Ok(url)
    }

    /// Exchanges an authorization code for a token (with refresh token).
    pub async fn fetch_token_from_code(&self, code: &str, scope: &Scope) -> Result<AccessToken> {
        let body = OAuthRequest {
            code: Some(code),
            refresh_token: None,
            client_id: &self.secret.web.client_id,
            client_secret: &self.secret.web.client_secret,
            redirect_uri: self.secret.redirect_uri()?,
            grant_type: GrantType::AuthorizationCode,
        };
        let response = self.post_token(&body).await?;
        Ok(response.into_access_token(scope))
    }

    /// Mints a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str, scope: &Scope) -> Result<AccessToken> {
        let body = OAuthRequest {
            code: None,
            refresh_token: Some(refresh_token),
            client_id: &self.secret.web.client_id,
            client_secret: &self.secret.web.client_secret,
            redirect_uri: self.secret.redirect_uri()?,
            grant_type: GrantType::RefreshToken,
        };
        let mut token = self.post_token(&body).await?.into_access_token(scope);
        // The refresh grant does not return the refresh token again.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    /// An authenticator seeded with `token` that refreshes through this client.
    ///
    /// Fails if `token` has no refresh token.
    pub fn factory(&self, token: AccessToken) -> Result<CachingAuthenticator<RefreshTokenFactory>> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| Error::Authentication("refresh token absent".to_string()))?;
        let factory = RefreshTokenFactory {
            client: self.clone(),
            refresh_token,
        };
        Ok(CachingAuthenticator::with_token(factory, token))
    }

    async fn post_token(&self, body: &OAuthRequest<'_>) -> Result<TokenResponse> {
        let request = HttpRequest::post(&self.token_url).json(body)?;
        execute(self.transport.as_ref(), request)
            .await
            .map_err(|e| match e {
                Error::Api { status, message } => {
                    Error::Authentication(format!("token endpoint returned {status}: {message}"))
                }
                other => other,
            })
    }
}

/// [`TokenFactory`] backed by the refresh-token grant.
#[derive(Clone)]
pub struct RefreshTokenFactory {
    client: OAuthClient,
    refresh_token: String,
}

#[async_trait]
impl TokenFactory for RefreshTokenFactory {
    async fn fetch_token(&self, scope: &Scope) -> Result<AccessToken> {
        self.client.refresh(&self.refresh_token, scope).await
    }
}

// =============================================================================
// Tests
// =============================================================================

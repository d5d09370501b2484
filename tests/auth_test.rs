//! Credential files, token grants, and token caching end to end.

mod common;

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use simplesheet::auth::service_account::{CREDENTIALS_ENV, JWT_BEARER_GRANT};
use simplesheet::auth::{AccessToken, Authenticator, OAuthClient, Scope, ServiceAccount};
use simplesheet::transport::{HttpRequest, HttpResponse, Transport};
use simplesheet::{ClientConfig, Error, Result, SheetsClient};

const PRIVATE_KEY: &str = include_str!("fixtures/service_account_private.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/service_account_public.pem");
const TOKEN_URI: &str = "https://oauth2.example/token";

/// A token endpoint issuing `ya29.<n>` tokens, or rejecting every grant.
#[derive(Default)]
struct TokenEndpoint {
    requests: Mutex<Vec<HttpRequest>>,
    issued: AtomicUsize,
    reject: bool,
}

impl TokenEndpoint {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn bodies(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.body.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for TokenEndpoint {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        if self.reject {
            return Ok(HttpResponse::json(
                400,
                &json!({ "error": { "code": 400, "message": "invalid_grant" } }),
            ));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(HttpResponse::json(
            200,
            &json!({
                "access_token": format!("ya29.{n}"),
                "expires_in": 3600,
                "token_type": "Bearer"
            }),
        ))
    }
}

fn key_file() -> NamedTempFile {
    let key = json!({
        "type": "service_account",
        "project_id": "budget-app",
        "private_key_id": "key-1",
        "private_key": PRIVATE_KEY,
        "client_email": "uploader@budget-app.iam.example",
        "client_id": "1234567890",
        "token_uri": TOKEN_URI
    });
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(key.to_string().as_bytes()).unwrap();
    file
}

fn client_secret_file() -> NamedTempFile {
    let secret = json!({
        "web": {
            "client_id": "client-1.apps.example",
            "client_secret": "s3cret",
            "redirect_uris": ["http://localhost:8080/callback"],
            "auth_uri": "https://accounts.example/o/oauth2/auth"
        }
    });
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(secret.to_string().as_bytes()).unwrap();
    file
}

// =============================================================================
// Service Account
// =============================================================================

#[tokio::test]
async fn test_service_account_posts_signed_assertion() {
    let file = key_file();
    let endpoint = Arc::new(TokenEndpoint::default());
    let account = ServiceAccount::from_file(file.path(), endpoint.clone()).unwrap();
    assert_eq!(account.key().client_email, "uploader@budget-app.iam.example");

    let auth = account.into_authenticator();
    let token = auth.authenticate(&Scope::sheets()).await.unwrap();
    assert_eq!(token.access_token, "ya29.1");
    assert_eq!(token.scope, Scope::sheets());

    let requests = endpoint.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, TOKEN_URI);

    let body = requests[0].body.clone().unwrap();
    assert_eq!(body["grant_type"], JWT_BEARER_GRANT);

    let assertion = body["assertion"].as_str().unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[TOKEN_URI]);
    let decoded = jsonwebtoken::decode::<Value>(
        assertion,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap();

    assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
    assert_eq!(decoded.claims["iss"], "uploader@budget-app.iam.example");
    assert_eq!(decoded.claims["scope"], Scope::sheets().as_str());
    let lifetime = decoded.claims["exp"].as_i64().unwrap() - decoded.claims["iat"].as_i64().unwrap();
    assert_eq!(lifetime, 3600);
}

#[tokio::test]
async fn test_service_account_token_is_reused() {
    let file = key_file();
    let endpoint = Arc::new(TokenEndpoint::default());
    let auth = ServiceAccount::from_file(file.path(), endpoint.clone())
        .unwrap()
        .into_authenticator();

    for _ in 0..3 {
        let headers = auth.authorization_header(&Scope::sheets()).await.unwrap();
        assert_eq!(headers, vec![("Authorization".to_string(), "Bearer ya29.1".to_string())]);
    }
    assert_eq!(endpoint.issued.load(Ordering::SeqCst), 1);

    // A disjoint scope needs a new grant.
    let token = auth.authenticate(&Scope::drive_readonly()).await.unwrap();
    assert_eq!(token.access_token, "ya29.2");
    assert_eq!(token.scope, Scope::drive_readonly());
}

#[tokio::test]
async fn test_service_account_from_env() {
    let file = key_file();
    std::env::set_var(CREDENTIALS_ENV, file.path());
    let account = ServiceAccount::from_env(Arc::new(TokenEndpoint::default())).unwrap();
    std::env::remove_var(CREDENTIALS_ENV);

    assert_eq!(account.key().private_key_id, "key-1");
    assert_eq!(account.key().project_id.as_deref(), Some("budget-app"));
}

#[tokio::test]
async fn test_rejected_grant_is_authentication_error() {
    let file = key_file();
    let endpoint = Arc::new(TokenEndpoint::rejecting());
    let auth = ServiceAccount::from_file(file.path(), endpoint)
        .unwrap()
        .into_authenticator();

    let err = auth.authenticate(&Scope::sheets()).await.unwrap_err();
    assert!(matches!(err, Error::Authentication(ref m) if m.contains("invalid_grant")));
}

#[tokio::test]
async fn test_sheets_client_sends_service_account_token() {
    let file = key_file();
    let endpoint = Arc::new(TokenEndpoint::default());
    let auth = ServiceAccount::from_file(file.path(), endpoint.clone())
        .unwrap()
        .into_authenticator();

    let sheets = common::MockTransport::new().with_sheet("Log", 7, 1, 1, &[]);
    let client = SheetsClient::new(
        common::SPREADSHEET_ID,
        Arc::new(auth),
        sheets.clone(),
        ClientConfig::default(),
    );
    client.fetch_spreadsheet().await.unwrap();
    client.load_sheet("Log").await.unwrap();

    for request in sheets.requests() {
        assert_eq!(request.header_value("Authorization"), Some("Bearer ya29.1"));
    }
    assert_eq!(endpoint.issued.load(Ordering::SeqCst), 1);
}

// =============================================================================
// OAuth Client
// =============================================================================

#[tokio::test]
async fn test_oauth_code_exchange_and_refresh() {
    let file = client_secret_file();
    let endpoint = Arc::new(TokenEndpoint::default());
    let config = ClientConfig::default();
    let oauth = OAuthClient::from_file(file.path(), endpoint.clone(), &config).unwrap();

    let url = oauth.auth_url(&Scope::sheets(), Some("ana@example.com")).unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(query.contains(&("client_id".to_string(), "client-1.apps.example".to_string())));
    assert!(query.contains(&("access_type".to_string(), "offline".to_string())));
    assert!(query.contains(&("login_hint".to_string(), "ana@example.com".to_string())));
    assert!(query.contains(&(
        "redirect_uri".to_string(),
        "http://localhost:8080/callback".to_string()
    )));

    let token = oauth.fetch_token_from_code("code-xyz", &Scope::sheets()).await.unwrap();
    assert_eq!(token.access_token, "ya29.1");

    let requests = endpoint.requests.lock().unwrap().clone();
    assert_eq!(requests[0].url, config.token_url);
    let body = &endpoint.bodies()[0];
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "code-xyz");
    assert_eq!(body["client_secret"], "s3cret");

    // An expired token with a refresh token refreshes on first use.
    let expired = AccessToken {
        refresh_token: Some("refresh-1".to_string()),
        expiry_date: chrono::Utc::now() - chrono::Duration::minutes(5),
        ..token
    };
    let auth = oauth.factory(expired).unwrap();
    let fresh = auth.authenticate(&Scope::sheets()).await.unwrap();
    assert_eq!(fresh.access_token, "ya29.2");
    assert_eq!(fresh.refresh_token.as_deref(), Some("refresh-1"));

    let body = &endpoint.bodies()[1];
    assert_eq!(body["grant_type"], "refresh_token");
    assert_eq!(body["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn test_oauth_factory_requires_refresh_token() {
    let file = client_secret_file();
    let oauth = OAuthClient::from_file(
        file.path(),
        Arc::new(TokenEndpoint::default()),
        &ClientConfig::default(),
    )
    .unwrap();
    let token = AccessToken {
        access_token: "t".to_string(),
        token_type: "Bearer".to_string(),
        scope: Scope::sheets(),
        refresh_token: None,
        expiry_date: chrono::Utc::now(),
    };
    assert!(matches!(oauth.factory(token), Err(Error::Authentication(_))));
}

#[tokio::test]
async fn test_static_token_rejects_other_scope() {
    let token = AccessToken {
        access_token: "t".to_string(),
        token_type: "Bearer".to_string(),
        scope: Scope::sheets_readonly(),
        refresh_token: None,
        expiry_date: chrono::Utc::now() + chrono::Duration::hours(1),
    };
    assert!(token.authenticate(&Scope::sheets_readonly()).await.is_ok());
    assert!(matches!(
        token.authenticate(&Scope::sheets()).await,
        Err(Error::Authentication(_))
    ));
}

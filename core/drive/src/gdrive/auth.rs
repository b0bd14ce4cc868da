//! OAuth2 authentication and token management for Google Drive.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use pirkit_common::{Error, Result};

use super::code_provider::AuthorizationRequest;
use super::token_cache::TokenCache;

/// OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
/// OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Redirect URL used when the client secret lists none.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: std::time::Duration = std::time::Duration::from_secs(3600);

/// OAuth2 token as persisted in `token.json`.
///
/// Field names follow the files written by Go's oauth2 package, so caches
/// produced by earlier tooling load unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Token {
    /// Access token for API requests.
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Bearer token with no refresh token and no expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            expiry: None,
        }
    }

    /// Check if the access token is expired or about to expire.
    ///
    /// Tokens without an expiry, or with Go's zero time, never expire.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            // Consider expired if less than 5 minutes remaining
            Some(expiry) if expiry.timestamp() > 0 => expiry < Utc::now() + Duration::minutes(5),
            _ => false,
        }
    }

    /// Whether the token can be refreshed.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn from_response<R: TokenResponse>(response: &R, previous_refresh: Option<&str>) -> Self {
        let lifetime = response.expires_in().unwrap_or(DEFAULT_EXPIRES_IN);
        let expiry = expiry_after(Duration::from_std(lifetime).ok());

        // Refresh tokens may or may not be returned in refresh response
        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| previous_refresh.map(str::to_string));

        Self {
            access_token: response.access_token().secret().clone(),
            token_type: default_token_type(),
            refresh_token,
            expiry: Some(expiry),
        }
    }
}

/// Expiry for a token issued now with the given lifetime.
///
/// Lifetimes that do not fit a timestamp fall back to one hour.
pub(crate) fn expiry_after(lifetime: Option<Duration>) -> DateTime<Utc> {
    let now = Utc::now();
    lifetime
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| now + Duration::hours(1))
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Anything that can hand out a bearer access token.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Get a valid access token, refreshing if the source supports it.
    async fn access_token(&self) -> Result<String>;
}

/// A token used exactly as loaded. Expiry is fatal.
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_expired() {
            return Err(Error::Authentication(
                "Cached token has expired and this auth mode does not refresh".to_string(),
            ));
        }
        Ok(self.token.access_token.clone())
    }
}

/// Configuration for OAuth2 authentication.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    /// Redirect URL for OAuth2 callback.
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl AuthConfig {
    /// Google endpoints with the given client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

type OAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// OAuth2 authentication manager for Google Drive.
pub struct AuthManager {
    client: OAuthClient,
    http: oauth2::reqwest::Client,
    config: AuthConfig,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - Malformed endpoint or redirect URLs
    /// - HTTP client construction failure
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
            );

        // No redirects on the token endpoint.
        let http = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            config,
        })
    }

    /// Generate the authorization URL for the user to visit.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            csrf_state: csrf_token.secret().clone(),
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// - Invalid authorization code
    /// - Network errors
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        let token = Token::from_response(&response, None);
        if !token.can_refresh() {
            tracing::warn!(
                "No refresh token received; the cached token will need re-authorization once it expires"
            );
        }

        Ok(token)
    }

    /// Refresh an access token using the refresh token.
    ///
    /// # Errors
    /// - Invalid or revoked refresh token
    /// - Network errors
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Token> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token refresh failed: {}", e)))?;

        Ok(Token::from_response(&response, Some(refresh_token)))
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Token manager that refreshes expired tokens and writes them back to the
/// cache.
pub struct TokenManager {
    auth_manager: AuthManager,
    token: RwLock<Token>,
    cache: Option<TokenCache>,
}

impl TokenManager {
    /// Create a new token manager with an initial token.
    pub fn new(auth_manager: AuthManager, token: Token, cache: Option<TokenCache>) -> Self {
        Self {
            auth_manager,
            token: RwLock::new(token),
            cache,
        }
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// # Errors
    /// - Token expired without a refresh token
    /// - Token refresh failed
    /// - Refreshed token could not be persisted
    pub async fn get_access_token(&self) -> Result<String> {
        let token = self.token.read().await;

        if !token.is_expired() {
            return Ok(token.access_token.clone());
        }

        drop(token);

        let mut token = self.token.write().await;

        // Double-check after acquiring write lock
        if !token.is_expired() {
            return Ok(token.access_token.clone());
        }

        let refresh = token.refresh_token.clone().ok_or_else(|| {
            Error::Authentication("Access token expired and no refresh token is available".to_string())
        })?;

        tracing::info!("Refreshing expired access token");
        let new_token = self.auth_manager.refresh_token(&refresh).await?;

        if let Some(cache) = &self.cache {
            cache.save(&new_token).await?;
        }

        *token = new_token;

        Ok(token.access_token.clone())
    }
}

#[async_trait]
impl AccessTokenSource for TokenManager {
    async fn access_token(&self) -> Result<String> {
        self.get_access_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> AuthConfig {
        AuthConfig::new("test_id", "test_secret").with_scopes(vec![
            "https://www.googleapis.com/auth/drive".to_string(),
            "https://www.googleapis.com/auth/drive.file".to_string(),
        ])
    }

    fn token_expiring_in(delta: Duration) -> Token {
        Token {
            access_token: "test".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Some(Utc::now() + delta),
        }
    }

    #[test]
    fn test_token_expiration() {
        assert!(token_expiring_in(Duration::hours(-1)).is_expired());
        assert!(!token_expiring_in(Duration::hours(1)).is_expired());
    }

    #[test]
    fn test_token_near_expiration() {
        // Token expiring in 4 minutes should be considered expired (5 min buffer)
        assert!(token_expiring_in(Duration::minutes(4)).is_expired());
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        assert!(!Token::bearer("abc").is_expired());
    }

    #[test]
    fn test_go_token_file_loads() {
        let json = r#"{
            "access_token": "ya29.a0Af",
            "token_type": "Bearer",
            "refresh_token": "1//0g",
            "expiry": "2021-03-04T15:16:17.123456789+01:00"
        }"#;

        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.a0Af");
        assert!(token.can_refresh());
        assert!(token.is_expired());
    }

    #[test]
    fn test_go_zero_expiry_never_expires() {
        let json = r#"{"access_token": "abc", "expiry": "0001-01-01T00:00:00Z"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert!(!token.can_refresh());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiry_after_clamps_unrepresentable_lifetimes() {
        let now = Utc::now();

        let normal = expiry_after(Some(Duration::minutes(30)));
        assert!(normal > now + Duration::minutes(29));

        for lifetime in [None, Duration::try_days(365 * 1_000_000)] {
            let expiry = expiry_after(lifetime);
            assert!(expiry > now + Duration::minutes(59));
            assert!(expiry <= Utc::now() + Duration::hours(1));
        }
    }

    #[test]
    fn test_token_debug_redacts_secrets() {
        let debug = format!("{:?}", token_expiring_in(Duration::hours(1)));
        assert!(!debug.contains("test\""));
        assert!(!debug.contains("refresh\""));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let debug = format!("{:?}", test_config());
        assert!(debug.contains("test_id"));
        assert!(!debug.contains("test_secret"));
    }

    #[test]
    fn test_auth_manager_creation() {
        let manager = AuthManager::new(test_config()).unwrap();
        assert_eq!(manager.config().client_id, "test_id");
    }

    #[test]
    fn test_auth_manager_rejects_bad_redirect() {
        let mut config = test_config();
        config.redirect_url = "not a url".to_string();
        assert!(matches!(AuthManager::new(config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_authorization_url_generation() {
        let manager = AuthManager::new(test_config()).unwrap();
        let request = manager.authorization_request();

        assert!(request.url.contains("accounts.google.com"));
        assert!(request.url.contains("client_id=test_id"));
        assert!(request.url.contains("scope="));
        assert!(request.url.contains("drive.file"));
        assert!(request.url.contains("access_type=offline"));
        assert!(request.url.contains("prompt=consent"));
        assert!(!request.csrf_state.is_empty());
    }

    #[tokio::test]
    async fn test_static_source_rejects_expired_token() {
        let source = StaticTokenSource::new(token_expiring_in(Duration::hours(-1)));
        assert!(matches!(
            source.access_token().await,
            Err(Error::Authentication(_))
        ));

        let source = StaticTokenSource::new(Token::bearer("abc"));
        assert_eq!(source.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_token_manager_returns_fresh_token() {
        let temp = TempDir::new().unwrap();
        let cache = TokenCache::new(temp.path().join("token.json"));
        let manager = TokenManager::new(
            AuthManager::new(test_config()).unwrap(),
            token_expiring_in(Duration::hours(1)),
            Some(cache),
        );

        assert_eq!(manager.get_access_token().await.unwrap(), "test");
        // Nothing was refreshed, so nothing was written.
        assert!(!temp.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn test_token_manager_expired_without_refresh_fails() {
        let mut token = token_expiring_in(Duration::hours(-1));
        token.refresh_token = None;
        let manager = TokenManager::new(AuthManager::new(test_config()).unwrap(), token, None);

        assert!(matches!(
            manager.get_access_token().await,
            Err(Error::Authentication(_))
        ));
    }
}

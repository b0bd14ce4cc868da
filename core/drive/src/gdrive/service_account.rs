//! Service-account authentication (JWT bearer grant).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use pirkit_common::{Error, Result};

use super::auth::{expiry_after, AccessTokenSource, Token};
use super::credentials::ServiceAccountKey;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the assertion exchanged for an access token.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    /// Issuer (service account email).
    pub iss: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Audience (token endpoint).
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Access tokens minted from a service-account key, cached in memory.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    http: Client,
    cached: RwLock<Option<Token>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, scopes: Vec<String>, http: Client) -> Self {
        Self {
            key,
            scopes,
            http,
            cached: RwLock::new(None),
        }
    }

    /// Service account email.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Claims for an assertion issued now.
    pub fn claims(&self) -> JwtClaims {
        let now = Utc::now().timestamp();
        JwtClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign a fresh RS256 assertion.
    ///
    /// # Errors
    /// - Private key is not a valid RSA PEM
    pub fn assertion(&self) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid service account private key: {}", e)))?;

        encode(&header, &self.claims(), &key)
            .map_err(|e| Error::Authentication(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch_token(&self) -> Result<Token> {
        let assertion = self.assertion()?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;

        let expires_in = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        let mut token = Token::bearer(body.access_token);
        token.expiry = Some(expiry_after(Duration::try_seconds(expires_in)));

        Ok(token)
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!(account = %self.key.client_email, "Requesting service account token");
        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);

        Ok(access_token)
    }
}

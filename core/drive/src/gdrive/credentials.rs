//! Credential files downloaded from the Google Cloud console.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use pirkit_common::{Error, Result};

use super::auth::{AuthConfig, DEFAULT_REDIRECT_URL, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

async fn read_credential_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Unable to read credential file {}: {}", path.display(), e),
        ))
    })
}

/// OAuth2 client secret (`oauth.json`).
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// The console wraps the secret in an `installed` or `web` object.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parse a client secret file's content.
    ///
    /// # Errors
    /// - Not JSON, or neither an `installed` nor a `web` client
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            Error::Config(format!("Unable to parse client secret file to config: {}", e))
        })?;

        file.installed.or(file.web).ok_or_else(|| {
            Error::Config(
                "Client secret file has neither an 'installed' nor a 'web' client".to_string(),
            )
        })
    }

    /// Read and parse a client secret file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = read_credential_file(path).await?;
        Self::from_json(&json)
    }

    /// Redirect URL to register the authorization request with.
    pub fn redirect_url(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URL)
    }

    /// OAuth2 configuration for this client and the given scopes.
    pub fn auth_config(&self, scopes: &[String]) -> AuthConfig {
        AuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: self.auth_uri.clone(),
            token_url: self.token_uri.clone(),
            redirect_url: self.redirect_url().to_string(),
            scopes: scopes.to_vec(),
        }
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

/// Service-account key (`credentials.json`).
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parse a service-account key file's content.
    ///
    /// # Errors
    /// - Not JSON, missing fields, or a `type` other than `service_account`
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Unable to retrieve credentials: {}", e)))?;

        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(Error::Config(format!(
                "Expected a service_account key, found '{}'",
                other
            ))),
        }
    }

    /// Read and parse a service-account key file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = read_credential_file(path).await?;
        Self::from_json(&json)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

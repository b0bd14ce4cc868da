//! Sources of OAuth2 authorization codes.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use pirkit_common::{Error, Result};

/// An authorization URL the user must visit, with its CSRF state.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_state: String,
}

/// Supplies the authorization code for an [`AuthorizationRequest`].
#[async_trait]
pub trait CodeProvider: Send + Sync {
    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String>;
}

/// Prints the URL and reads the code from standard input.
#[derive(Debug, Clone, Default)]
pub struct StdinCodeProvider {
    open_browser: bool,
}

impl StdinCodeProvider {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

#[async_trait]
impl CodeProvider for StdinCodeProvider {
    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        println!(
            "Go to the following link in your browser then type the authorization code \
             (or paste the full redirect URL):\n{}",
            request.url
        );

        if self.open_browser {
            if let Err(e) = open::that(&request.url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| {
                Error::Authentication(format!("Unable to read authorization code: {}", e))
            })?;

        if read == 0 {
            return Err(Error::Authentication(
                "No authorization code provided".to_string(),
            ));
        }

        extract_code(&line, &request.csrf_state)
    }
}

/// Returns a code supplied up front, for non-interactive runs.
#[derive(Debug, Clone)]
pub struct StaticCodeProvider {
    code: String,
}

impl StaticCodeProvider {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl CodeProvider for StaticCodeProvider {
    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        extract_code(&self.code, &request.csrf_state)
    }
}

/// Turn user input into an authorization code.
///
/// Accepts either the bare code or the redirect URL the browser landed on.
/// For URLs, a `state` parameter must match `expected_state`.
pub fn extract_code(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("Authorization code is empty".to_string()));
    }

    let url = match Url::parse(input) {
        Ok(url) if url.has_host() => url,
        _ => return Ok(input.to_string()),
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(Error::Authentication(format!(
                    "Authorization was denied: {}",
                    value
                )))
            }
            _ => {}
        }
    }

    if let Some(state) = state {
        if state != expected_state {
            return Err(Error::Authentication(
                "Authorization state does not match the request".to_string(),
            ));
        }
    }

    code.ok_or_else(|| {
        Error::InvalidInput("Redirect URL does not carry an authorization code".to_string())
    })
}

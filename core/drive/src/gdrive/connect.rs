//! Turning settings into an authenticated Drive client.

use std::sync::Arc;

use pirkit_common::{Error, Result};

use crate::settings::{AuthMode, AuthSettings, Settings};

use super::auth::{AccessTokenSource, AuthManager, StaticTokenSource, Token, TokenManager};
use super::client::DriveClient;
use super::code_provider::CodeProvider;
use super::credentials::{ClientSecret, ServiceAccountKey};
use super::service_account::ServiceAccountAuth;
use super::token_cache::TokenCache;

/// Run the interactive authorization-code flow and persist the result.
pub async fn authorize_interactively(
    auth_manager: &AuthManager,
    cache: &TokenCache,
    code_provider: &dyn CodeProvider,
) -> Result<Token> {
    let request = auth_manager.authorization_request();
    let code = code_provider.authorization_code(&request).await?;
    let token = auth_manager.exchange_code(&code).await?;
    cache.save(&token).await?;
    Ok(token)
}

/// Obtain a usable user token: cached, refreshed, or freshly authorized.
///
/// With `force`, the cache is ignored and the interactive flow always runs.
pub async fn obtain_user_token(
    auth_manager: &AuthManager,
    cache: &TokenCache,
    code_provider: &dyn CodeProvider,
    force: bool,
) -> Result<Token> {
    if force {
        return authorize_interactively(auth_manager, cache, code_provider).await;
    }

    let cached = match cache.load().await {
        Ok(cached) => cached,
        Err(Error::Serialization(e)) => {
            tracing::warn!("Ignoring unreadable token cache: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    match cached {
        Some(token) if !token.is_expired() => {
            tracing::debug!("Using cached token from {}", cache.path().display());
            Ok(token)
        }
        Some(token) if token.can_refresh() => {
            let refresh = token.refresh_token.clone().unwrap_or_default();
            match auth_manager.refresh_token(&refresh).await {
                Ok(refreshed) => {
                    cache.save(&refreshed).await?;
                    Ok(refreshed)
                }
                Err(e) => {
                    tracing::warn!("{}; starting a new authorization", e);
                    authorize_interactively(auth_manager, cache, code_provider).await
                }
            }
        }
        _ => authorize_interactively(auth_manager, cache, code_provider).await,
    }
}

/// Build the token manager for installed-app OAuth.
pub async fn user_token_manager(
    auth: &AuthSettings,
    code_provider: &dyn CodeProvider,
    force: bool,
) -> Result<TokenManager> {
    let secret = ClientSecret::from_file(&auth.client_secret_path).await?;
    let auth_manager = AuthManager::new(secret.auth_config(&auth.scopes))?;
    let cache = TokenCache::new(&auth.token_path);

    let token = obtain_user_token(&auth_manager, &cache, code_provider, force).await?;
    Ok(TokenManager::new(auth_manager, token, Some(cache)))
}

/// Build the token source the configured auth mode calls for.
pub async fn token_source(
    auth: &AuthSettings,
    code_provider: &dyn CodeProvider,
) -> Result<Arc<dyn AccessTokenSource>> {
    match auth.mode {
        AuthMode::Oauth => Ok(Arc::new(
            user_token_manager(auth, code_provider, false).await?,
        )),
        AuthMode::Token => {
            let token = TokenCache::new(&auth.token_path).load_required().await?;
            Ok(Arc::new(StaticTokenSource::new(token)))
        }
        AuthMode::ServiceAccount => {
            let key = ServiceAccountKey::from_file(&auth.credentials_path).await?;
            tracing::debug!(account = %key.client_email, "Using service account");
            Ok(Arc::new(ServiceAccountAuth::new(
                key,
                auth.scopes.clone(),
                reqwest::Client::new(),
            )))
        }
    }
}

/// Authenticate and build a Drive client from settings.
pub async fn connect(settings: &Settings, code_provider: &dyn CodeProvider) -> Result<DriveClient> {
    let tokens = token_source(&settings.auth, code_provider).await?;
    DriveClient::new(
        tokens,
        settings.drive.drive_id.clone(),
        &settings.drive.user_agent,
    )
}

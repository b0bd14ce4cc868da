//! Google Drive backend for pirkit.
//!
//! This module provides:
//! - OAuth2 installed-app authentication with a refreshable on-disk token cache
//! - Static-token and service-account authentication
//! - A pluggable source of authorization codes
//! - An HTTP client implementing [`crate::api::DriveApi`]

pub mod auth;
pub mod client;
pub mod code_provider;
pub mod connect;
pub mod credentials;
pub mod service_account;
pub mod token_cache;

#[cfg(test)]
mod test_server;

pub use auth::{AccessTokenSource, AuthConfig, AuthManager, StaticTokenSource, Token, TokenManager};
pub use client::DriveClient;
pub use code_provider::{extract_code, AuthorizationRequest, CodeProvider, StaticCodeProvider, StdinCodeProvider};
pub use connect::{connect, obtain_user_token, token_source, user_token_manager};
pub use credentials::{ClientSecret, ServiceAccountKey};
pub use service_account::ServiceAccountAuth;
pub use token_cache::TokenCache;

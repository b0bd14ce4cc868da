//! On-disk token cache (`token.json`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use pirkit_common::{Error, Result};

use super::auth::Token;

/// Reads and writes a single token file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token.
    ///
    /// # Returns
    /// - `Ok(None)` if the file does not exist
    ///
    /// # Errors
    /// - File unreadable or not a token
    pub async fn load(&self) -> Result<Option<Token>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let token = serde_json::from_str(&json).map_err(|e| {
            Error::Serialization(format!(
                "Unable to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Some(token))
    }

    /// Load the cached token, failing if it is absent.
    pub async fn load_required(&self) -> Result<Token> {
        self.load().await?.ok_or_else(|| {
            Error::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("Unable to retrieve token file {}", self.path.display()),
            ))
        })
    }

    /// Persist a token, replacing any previous content.
    ///
    /// The file is created with mode 0600 on Unix.
    pub async fn save(&self, token: &Token) -> Result<()> {
        tracing::info!("Saving credential file to: {}", self.path.display());

        let json = serde_json::to_string_pretty(token)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Unable to cache oauth token at {}: {}", self.path.display(), e),
            ))
        })?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }
}

//! Runtime settings.
//!
//! Values that would otherwise be hard-coded (file names, scopes, shared
//! drive id, folder layout) live here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use pirkit_common::{Error, Result, ResourceId};

/// Default settings file name looked up in the working directory.
pub const SETTINGS_FILENAME: &str = "pirkit.json";

/// Default OAuth2 scopes.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.appdata",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.file",
];

/// How the tool authenticates against the Drive API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Installed-app OAuth2 with a cached, refreshable user token.
    #[default]
    Oauth,
    /// Cached token used as-is, never refreshed.
    Token,
    /// Service-account key signed into a JWT bearer assertion.
    ServiceAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub mode: AuthMode,
    /// OAuth2 client secret file.
    pub client_secret_path: PathBuf,
    /// Service-account key file.
    pub credentials_path: PathBuf,
    /// Cached user token.
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
    /// Try to open the authorization URL in a browser.
    pub open_browser: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            client_secret_path: PathBuf::from("oauth.json"),
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            open_browser: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Shared drive to scope queries to. `None` searches the user's corpora.
    pub drive_id: Option<String>,
    /// Parent of the review folder. Defaults to the shared drive root, or
    /// `root` (My Drive) when no shared drive is configured.
    pub root_parent_id: Option<String>,
    pub user_agent: String,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            drive_id: None,
            root_parent_id: None,
            user_agent: concat!("pirkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DriveSettings {
    /// Parent folder under which the review folder is looked up.
    pub fn root_parent(&self) -> Result<ResourceId> {
        let id = self
            .root_parent_id
            .as_deref()
            .or(self.drive_id.as_deref())
            .unwrap_or("root");
        ResourceId::new(id)
    }
}

/// Names used by the incident layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub root_folder: String,
    pub template_name: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            root_folder: "Post Incident Review".to_string(),
            template_name: "TEMPLATE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auth: AuthSettings,
    pub drive: DriveSettings,
    pub layout: LayoutSettings,
}

impl Settings {
    /// Deserialize settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid settings: {}", e)))
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a file.
    ///
    /// Relative credential and token paths stay relative to the working
    /// directory, matching how the files are usually dropped next to the
    /// binary.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read settings {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Self::from_json(&json)
    }

    /// Locate a settings file: explicit path first, then `./pirkit.json`,
    /// then `<config dir>/pirkit/config.json`.
    pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(SETTINGS_FILENAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("pirkit").join("config.json"))
            .filter(|path| path.is_file())
    }

    /// Load discovered settings, or defaults when no file exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match Self::discover(explicit) {
            Some(path) => Self::load(&path),
            None => {
                tracing::debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

//! Common types used throughout pirkit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MIME type Google Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
/// MIME type Google Drive uses for Google Docs documents.
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

/// Identifier of a folder or document in the remote store.
///
/// Ids are inlined into Drive query strings, so quotes and backslashes
/// are rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new ResourceId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty or contains `'` or `\`
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "ResourceId cannot be empty".to_string(),
            ));
        }
        if id.contains('\'') || id.contains('\\') {
            return Err(crate::Error::InvalidInput(format!(
                "ResourceId cannot contain quotes or backslashes: {}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl FromStr for ResourceId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}

/// Kind of resource the resolver and materializer deal with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Folder,
    Document,
}

impl ResourceKind {
    /// Drive MIME type for this kind.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResourceKind::Folder => FOLDER_MIME_TYPE,
            ResourceKind::Document => DOCUMENT_MIME_TYPE,
        }
    }

    /// Map a Drive MIME type back to a kind, if it is one we handle.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            FOLDER_MIME_TYPE => Some(ResourceKind::Folder),
            DOCUMENT_MIME_TYPE => Some(ResourceKind::Document),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Folder => write!(f, "folder"),
            ResourceKind::Document => write!(f, "document"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "folder" => Ok(ResourceKind::Folder),
            "document" | "doc" => Ok(ResourceKind::Document),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown resource kind '{}'. Use: folder or document",
                other
            ))),
        }
    }
}

//! Drive API abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pirkit_common::{Result, ResourceId, ResourceKind, FOLDER_MIME_TYPE};

/// File metadata as returned by the Drive API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Link to open the file in a browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Kind of this file, if it is a folder or a Google Docs document.
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_mime_type(&self.mime_type)
    }

    /// Typed identifier of this file.
    pub fn resource_id(&self) -> Result<ResourceId> {
        ResourceId::new(self.id.clone())
    }
}

/// A shared drive visible to the authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDrive {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One page of a file listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Set by the API when more results exist. Never followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Exact-match lookup of a named resource under one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub parent: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
}

impl FileQuery {
    pub fn new(parent: ResourceId, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            parent,
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a folder lookup.
    pub fn folder(parent: ResourceId, name: impl Into<String>) -> Self {
        Self::new(parent, name, ResourceKind::Folder)
    }

    /// Shorthand for a document lookup.
    pub fn document(parent: ResourceId, name: impl Into<String>) -> Self {
        Self::new(parent, name, ResourceKind::Document)
    }

    /// Render into the Drive `q` parameter syntax.
    pub fn to_query_string(&self) -> String {
        format!(
            "trashed = false and mimeType = '{}' and '{}' in parents and name = '{}'",
            self.kind.mime_type(),
            self.parent,
            escape_query_value(&self.name)
        )
    }

    /// Whether a file satisfies this query.
    pub fn matches(&self, file: &DriveFile) -> bool {
        !file.trashed
            && file.mime_type == self.kind.mime_type()
            && file.name == self.name
            && file.parents.iter().any(|p| p == self.parent.as_str())
    }
}

/// Escape a string literal for use inside single quotes in a Drive query.
pub fn escape_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

/// Remote operations the resolver and materializer depend on.
///
/// Implemented by the HTTP [`crate::gdrive::DriveClient`] and by
/// [`crate::memory::MemoryDrive`].
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Short backend name (e.g., "gdrive", "memory").
    fn name(&self) -> &str;

    /// List files matching the query. Only the first page is fetched.
    async fn list_files(&self, query: &FileQuery) -> Result<FileList>;

    /// Get file metadata by ID.
    ///
    /// # Errors
    /// - File not found
    async fn get_file(&self, id: &ResourceId) -> Result<DriveFile>;

    /// Create an empty folder under `parent`.
    async fn create_folder(&self, parent: &ResourceId, name: &str) -> Result<DriveFile>;

    /// Copy `source` into `parent` under `name`.
    ///
    /// # Errors
    /// - Source not found
    async fn copy_file(
        &self,
        source: &ResourceId,
        parent: &ResourceId,
        name: &str,
    ) -> Result<DriveFile>;

    /// List shared drives (first page).
    async fn list_drives(&self) -> Result<Vec<SharedDrive>>;

    /// List files without any filter (first page).
    async fn list_all_files(&self) -> Result<FileList>;
}

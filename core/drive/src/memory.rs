//! In-memory drive for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use pirkit_common::{Error, Result, ResourceId, ResourceKind};

use crate::api::{DriveApi, DriveFile, FileList, FileQuery, SharedDrive};

/// In-memory implementation of [`DriveApi`].
///
/// Useful for testing and dry runs. Counts list, create and copy calls so
/// tests can assert how many remote operations a workflow issued.
pub struct MemoryDrive {
    files: RwLock<BTreeMap<String, DriveFile>>,
    drives: Vec<SharedDrive>,
    lists: AtomicUsize,
    creates: AtomicUsize,
    copies: AtomicUsize,
}

impl MemoryDrive {
    /// Create a new empty drive.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            drives: Vec::new(),
            lists: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            copies: AtomicUsize::new(0),
        }
    }

    /// Create a drive that reports the given shared drives.
    pub fn with_drives(drives: Vec<SharedDrive>) -> Self {
        Self {
            drives,
            ..Self::new()
        }
    }

    /// Seed a file with a fixed id. Does not count as a create.
    pub async fn insert(&self, id: &str, parent: &str, name: &str, kind: ResourceKind) {
        let file = Self::make_file(id.to_string(), parent, name, kind.mime_type());
        self.files.write().await.insert(id.to_string(), file);
    }

    /// Mark a seeded file as trashed.
    pub async fn trash(&self, id: &str) -> Result<()> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", id)))?;
        file.trashed = true;
        Ok(())
    }

    /// Number of files currently stored, trashed included.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Whether the drive holds no files.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Number of filtered list calls served.
    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Number of folders created through the API.
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of copies made through the API.
    pub fn copy_calls(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn make_file(id: String, parent: &str, name: &str, mime_type: &str) -> DriveFile {
        let web_view_link = match ResourceKind::from_mime_type(mime_type) {
            Some(ResourceKind::Folder) => format!("https://drive.google.com/drive/folders/{}", id),
            Some(ResourceKind::Document) => format!("https://docs.google.com/document/d/{}/edit", id),
            None => format!("https://drive.google.com/file/d/{}/view", id),
        };

        DriveFile {
            id,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: vec![parent.to_string()],
            web_view_link: Some(web_view_link),
            trashed: false,
        }
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveApi for MemoryDrive {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_files(&self, query: &FileQuery) -> Result<FileList> {
        self.lists.fetch_add(1, Ordering::SeqCst);

        let files = self.files.read().await;
        let files = files
            .values()
            .filter(|f| query.matches(f))
            .cloned()
            .collect();

        Ok(FileList {
            files,
            next_page_token: None,
        })
    }

    async fn get_file(&self, id: &ResourceId) -> Result<DriveFile> {
        self.files
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", id)))
    }

    async fn create_folder(&self, parent: &ResourceId, name: &str) -> Result<DriveFile> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let file = Self::make_file(
            Self::new_id(),
            parent.as_str(),
            name,
            ResourceKind::Folder.mime_type(),
        );
        self.files
            .write()
            .await
            .insert(file.id.clone(), file.clone());

        Ok(file)
    }

    async fn copy_file(
        &self,
        source: &ResourceId,
        parent: &ResourceId,
        name: &str,
    ) -> Result<DriveFile> {
        self.copies.fetch_add(1, Ordering::SeqCst);

        let mut files = self.files.write().await;
        let original = files
            .get(source.as_str())
            .ok_or_else(|| Error::NotFound(format!("Source not found: {}", source)))?;

        let file = Self::make_file(Self::new_id(), parent.as_str(), name, &original.mime_type);
        files.insert(file.id.clone(), file.clone());

        Ok(file)
    }

    async fn list_drives(&self) -> Result<Vec<SharedDrive>> {
        Ok(self.drives.clone())
    }

    async fn list_all_files(&self) -> Result<FileList> {
        let files = self.files.read().await;
        Ok(FileList {
            files: files.values().filter(|f| !f.trashed).cloned().collect(),
            next_page_token: None,
        })
    }
}

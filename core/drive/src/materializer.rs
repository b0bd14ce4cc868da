//! Resource materialization: create what the resolver could not find.

use pirkit_common::{Error, Result, ResourceId};

use crate::api::{DriveApi, FileQuery};
use crate::resolver::{ambiguous_message, Resolution, Resolver};

/// A resolved resource and whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: ResourceId,
    pub created: bool,
}

/// How to bring a missing resource into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blueprint<'a> {
    /// Create an empty folder.
    EmptyFolder,
    /// Copy an existing document.
    CopyOf(&'a ResourceId),
}

/// Creates folders and copies documents. Never updates existing resources.
pub struct Materializer<'a> {
    api: &'a dyn DriveApi,
}

impl<'a> Materializer<'a> {
    pub fn new(api: &'a dyn DriveApi) -> Self {
        Self { api }
    }

    /// Create an empty folder `name` under `parent`.
    pub async fn create_folder(&self, parent: &ResourceId, name: &str) -> Result<ResourceId> {
        let folder = self.api.create_folder(parent, name).await?;
        tracing::info!(id = %folder.id, parent = %parent, "Created folder '{}'", name);
        folder.resource_id()
    }

    /// Copy `template` into `parent` under `name`.
    pub async fn copy_template(
        &self,
        template: &ResourceId,
        parent: &ResourceId,
        name: &str,
    ) -> Result<ResourceId> {
        let copy = self.api.copy_file(template, parent, name).await?;
        tracing::info!(
            id = %copy.id,
            parent = %parent,
            template = %template,
            "Copied template as '{}'",
            name
        );
        copy.resource_id()
    }

    /// Materialize `query` according to `blueprint`.
    pub async fn materialize(
        &self,
        query: &FileQuery,
        blueprint: Blueprint<'_>,
    ) -> Result<ResourceId> {
        match blueprint {
            Blueprint::EmptyFolder => self.create_folder(&query.parent, &query.name).await,
            Blueprint::CopyOf(template) => {
                self.copy_template(template, &query.parent, &query.name)
                    .await
            }
        }
    }

    /// Resolve `query`; create it from `blueprint` only when nothing matches.
    ///
    /// # Errors
    /// - `Error::Ambiguous` when more than one resource matches; nothing is created
    pub async fn get_or_create(
        &self,
        query: &FileQuery,
        blueprint: Blueprint<'_>,
    ) -> Result<Resolved> {
        match Resolver::new(self.api).resolve(query).await? {
            Resolution::Found(file) => Ok(Resolved {
                id: file.resource_id()?,
                created: false,
            }),
            Resolution::NotFound => Ok(Resolved {
                id: self.materialize(query, blueprint).await?,
                created: true,
            }),
            Resolution::Ambiguous(count) => {
                Err(Error::Ambiguous(ambiguous_message(query, count)))
            }
        }
    }

    /// Find folder `name` under `parent`, creating it if absent.
    pub async fn get_or_create_folder(&self, parent: &ResourceId, name: &str) -> Result<Resolved> {
        self.get_or_create(&FileQuery::folder(parent.clone(), name), Blueprint::EmptyFolder)
            .await
    }

    /// Find document `name` under `parent`, copying `template` if absent.
    pub async fn get_or_copy_document(
        &self,
        parent: &ResourceId,
        name: &str,
        template: &ResourceId,
    ) -> Result<Resolved> {
        self.get_or_create(
            &FileQuery::document(parent.clone(), name),
            Blueprint::CopyOf(template),
        )
        .await
    }
}

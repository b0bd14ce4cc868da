//! Resource resolution: map a (parent, name, kind) query onto zero, one or
//! many existing resources.

use pirkit_common::{Error, Result, ResourceId};

use crate::api::{DriveApi, DriveFile, FileQuery};

/// Outcome of a single lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No resource matched.
    NotFound,
    /// Exactly one resource matched.
    Found(DriveFile),
    /// More than one resource matched; carries the match count.
    Ambiguous(usize),
}

impl Resolution {
    /// Classify a result list by its length.
    pub fn classify(mut files: Vec<DriveFile>) -> Self {
        match files.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Found(files.remove(0)),
            n => Resolution::Ambiguous(n),
        }
    }
}

/// Resolves names to resource ids against a [`DriveApi`].
pub struct Resolver<'a> {
    api: &'a dyn DriveApi,
}

impl<'a> Resolver<'a> {
    pub fn new(api: &'a dyn DriveApi) -> Self {
        Self { api }
    }

    /// Issue one list query and classify the result.
    pub async fn resolve(&self, query: &FileQuery) -> Result<Resolution> {
        tracing::debug!(
            parent = %query.parent,
            name = %query.name,
            kind = %query.kind,
            "Resolving resource"
        );

        let list = self.api.list_files(query).await?;
        if list.next_page_token.is_some() {
            tracing::warn!(
                name = %query.name,
                "Listing has more pages; only the first page is considered"
            );
        }

        Ok(Resolution::classify(list.files))
    }

    /// Resolve a query that must match exactly one resource.
    ///
    /// # Errors
    /// - `Error::NotFound` when nothing matches
    /// - `Error::Ambiguous` when more than one resource matches
    pub async fn find_unique(&self, query: &FileQuery) -> Result<ResourceId> {
        match self.resolve(query).await? {
            Resolution::Found(file) => file.resource_id(),
            Resolution::NotFound => Err(Error::NotFound(not_found_message(query))),
            Resolution::Ambiguous(count) => Err(Error::Ambiguous(ambiguous_message(query, count))),
        }
    }

    /// Find the unique folder `name` under `parent`.
    pub async fn find_folder(&self, parent: &ResourceId, name: &str) -> Result<ResourceId> {
        self.find_unique(&FileQuery::folder(parent.clone(), name))
            .await
    }

    /// Find the unique document `name` under `parent`.
    pub async fn find_document(&self, parent: &ResourceId, name: &str) -> Result<ResourceId> {
        self.find_unique(&FileQuery::document(parent.clone(), name))
            .await
    }
}

pub(crate) fn not_found_message(query: &FileQuery) -> String {
    format!(
        "The {} '{}' is not present under {}",
        query.kind, query.name, query.parent
    )
}

pub(crate) fn ambiguous_message(query: &FileQuery, count: usize) -> String {
    format!(
        "The {} '{}' is present under {} {} times",
        query.kind, query.name, query.parent, count
    )
}

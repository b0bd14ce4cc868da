//! Common utilities and types shared across pirkit crates.
//!
//! This module provides the error taxonomy and the identifiers used to talk
//! about folders and documents in the remote store.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ResourceId, ResourceKind, DOCUMENT_MIME_TYPE, FOLDER_MIME_TYPE};

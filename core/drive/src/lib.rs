//! Drive access for pirkit.
//!
//! This crate provides a trait-based interface to the remote file store,
//! the Google Drive backend behind it, and the get-or-create logic that
//! runs on top.
//!
//! # Design Principles
//! - One seam: the resolver, materializer and layout only see [`DriveApi`]
//! - Explicit configuration: shared drive ids and names come from [`Settings`]
//! - Sequential: one request in flight at a time, no retries

pub mod api;
pub mod gdrive;
pub mod layout;
pub mod materializer;
pub mod memory;
pub mod resolver;
pub mod settings;

pub use api::{DriveApi, DriveFile, FileList, FileQuery, SharedDrive};
pub use layout::{prepare_incident_document, IncidentDocument};
pub use materializer::{Blueprint, Materializer, Resolved};
pub use memory::MemoryDrive;
pub use resolver::{Resolution, Resolver};
pub use settings::{AuthMode, AuthSettings, DriveSettings, LayoutSettings, Settings};

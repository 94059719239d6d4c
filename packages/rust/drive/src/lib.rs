//! Remote file store access: Drive client, tree retrieval, publishing.
//!
//! This crate provides:
//! - [`RemoteStore`] — the capability set the rest of the system relies on
//! - [`DriveClient`] — Google Drive v3 implementation
//! - [`walker`] — depth-first retrieval with inherited folder metadata
//! - [`publish`] — flat upload of generated artifacts

pub mod client;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod publish;
pub mod store;
pub mod walker;

pub use client::DriveClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use publish::{PublishReport, publish};
pub use store::{
    ChunkProgress, FOLDER_MIME_TYPE, NoProgress, NodeKind, RemoteFailure, RemoteFile, RemoteNode,
    RemoteStore, TransferProgress, UploadedFile,
};
pub use walker::{FolderContext, RetrievalReport, destination_name, download_tree};

//! The remote-store seam: node types and the [`RemoteStore`] trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use payslip_shared::Result;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by Docs/Sheets/Slides and other native files with no binary content.
pub const WORKSPACE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Whether a node is a folder or a leaf file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// A child entry returned by [`RemoteStore::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub mime_type: String,
}

impl RemoteNode {
    /// Build a node, deriving its kind from the MIME type.
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let kind = if mime_type == FOLDER_MIME_TYPE {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            mime_type,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Native Drive documents cannot be downloaded as-is.
    pub fn is_workspace_native(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(WORKSPACE_MIME_PREFIX)
    }
}

/// What the store hands back after an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    /// Browser link, when the store provides one.
    pub link: Option<String>,
}

/// Byte-level progress callback: `(bytes_done, bytes_total)`.
pub type ChunkProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Capabilities the walker and the publisher need from a hierarchical file store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Immediate children of a folder, in the store's listing order.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteNode>>;

    /// Display name of a file or folder.
    async fn get_name(&self, id: &str) -> Result<String>;

    /// Download a file's content to `dest`, overwriting it. Returns bytes written.
    async fn download(&self, file_id: &str, dest: &Path, on_chunk: ChunkProgress<'_>) -> Result<u64>;

    /// Upload a local file into `dest_folder_id`, keeping its file name.
    async fn upload(&self, local_path: &Path, dest_folder_id: &str) -> Result<RemoteFile>;
}

// ---------------------------------------------------------------------------
// Progress & failure reporting
// ---------------------------------------------------------------------------

/// Observer for per-file transfer progress.
pub trait TransferProgress: Send + Sync {
    /// Bytes transferred so far for `name`.
    fn bytes(&self, name: &str, done: u64, total: Option<u64>);
    /// `name` finished (successfully or not).
    fn finished(&self, name: &str);
}

/// No-op progress observer for headless/test usage.
pub struct NoProgress;

impl TransferProgress for NoProgress {
    fn bytes(&self, _name: &str, _done: u64, _total: Option<u64>) {}
    fn finished(&self, _name: &str) {}
}

/// A per-item remote error that was contained rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    /// File or folder name (or id when the name is unknown).
    pub target: String,
    pub error: String,
}

impl RemoteFailure {
    pub fn new(target: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            target: target.into(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a single uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub id: String,
    pub link: Option<String>,
}

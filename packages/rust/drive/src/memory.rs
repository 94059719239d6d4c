//! In-memory [`RemoteStore`] for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use payslip_shared::{PayslipError, Result};

use crate::store::{ChunkProgress, FOLDER_MIME_TYPE, RemoteFile, RemoteNode, RemoteStore};

#[derive(Debug, Clone)]
struct Entry {
    node: RemoteNode,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Child ids per folder id, in insertion (listing) order.
    children: HashMap<String, Vec<String>>,
    failing_downloads: HashSet<String>,
    failing_listings: HashSet<String>,
    failing_uploads: HashSet<String>,
    /// `(folder id, file name, content)` for every accepted upload.
    uploads: Vec<(String, String, Vec<u8>)>,
}

/// A folder tree held in memory, with switchable per-item failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Add a folder; `parent` is `None` for a root.
    pub fn add_folder(&self, parent: Option<&str>, id: &str, name: &str) {
        self.insert(parent, RemoteNode::new(id, name, FOLDER_MIME_TYPE), Vec::new());
    }

    /// Add a PDF file under `parent`.
    pub fn add_file(&self, parent: &str, id: &str, name: &str, content: &[u8]) {
        self.add_node(parent, id, name, "application/pdf", content);
    }

    /// Add a file with an explicit MIME type.
    pub fn add_node(&self, parent: &str, id: &str, name: &str, mime_type: &str, content: &[u8]) {
        self.insert(Some(parent), RemoteNode::new(id, name, mime_type), content.to_vec());
    }

    fn insert(&self, parent: Option<&str>, node: RemoteNode, content: Vec<u8>) {
        self.with_state(|state| {
            if let Some(parent) = parent {
                state
                    .children
                    .entry(parent.to_string())
                    .or_default()
                    .push(node.id.clone());
            }
            state.entries.insert(node.id.clone(), Entry { node, content });
        });
    }

    pub fn fail_download(&self, file_id: &str) {
        self.with_state(|s| s.failing_downloads.insert(file_id.to_string()));
    }

    pub fn fail_listing(&self, folder_id: &str) {
        self.with_state(|s| s.failing_listings.insert(folder_id.to_string()));
    }

    /// Make uploads of files with this name fail.
    pub fn fail_upload(&self, file_name: &str) {
        self.with_state(|s| s.failing_uploads.insert(file_name.to_string()));
    }

    /// Names of uploaded files in `folder_id`, in upload order.
    pub fn uploaded_names(&self, folder_id: &str) -> Vec<String> {
        self.with_state(|s| {
            s.uploads
                .iter()
                .filter(|(folder, _, _)| folder == folder_id)
                .map(|(_, name, _)| name.clone())
                .collect()
        })
    }
}

fn not_found(id: &str) -> PayslipError {
    PayslipError::remote(404, format!("File not found: {id}."))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteNode>> {
        self.with_state(|s| {
            if s.failing_listings.contains(folder_id) {
                return Err(PayslipError::remote(500, "listing failed"));
            }
            if !s.entries.contains_key(folder_id) {
                return Err(not_found(folder_id));
            }
            Ok(s.children
                .get(folder_id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| s.entries.get(id).map(|e| e.node.clone()))
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn get_name(&self, id: &str) -> Result<String> {
        self.with_state(|s| {
            s.entries
                .get(id)
                .map(|e| e.node.name.clone())
                .ok_or_else(|| not_found(id))
        })
    }

    async fn download(&self, file_id: &str, dest: &Path, on_chunk: ChunkProgress<'_>) -> Result<u64> {
        let content = self.with_state(|s| {
            if s.failing_downloads.contains(file_id) {
                return Err(PayslipError::Network(format!("connection reset downloading {file_id}")));
            }
            s.entries
                .get(file_id)
                .map(|e| e.content.clone())
                .ok_or_else(|| not_found(file_id))
        })?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PayslipError::io(parent, e))?;
        }
        std::fs::write(dest, &content).map_err(|e| PayslipError::io(dest, e))?;
        let len = content.len() as u64;
        on_chunk(len, Some(len));
        Ok(len)
    }

    async fn upload(&self, local_path: &Path, dest_folder_id: &str) -> Result<RemoteFile> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PayslipError::validation("upload path has no file name"))?;
        let content = std::fs::read(local_path).map_err(|e| PayslipError::io(local_path, e))?;

        self.with_state(|s| {
            if s.failing_uploads.contains(&name) {
                return Err(PayslipError::remote(403, "insufficient permissions"));
            }
            let id = format!("up{}", s.uploads.len() + 1);
            s.uploads
                .push((dest_folder_id.to_string(), name.clone(), content));
            Ok(RemoteFile {
                link: Some(format!("memory://{dest_folder_id}/{id}")),
                id,
                name,
            })
        })
    }
}

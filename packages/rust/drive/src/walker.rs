//! Depth-first retrieval of matching files from a remote folder tree.
//!
//! Each folder contributes a [`FolderContext`] (date and document type parsed
//! from its name) that flows down to every descendant. Files are filtered,
//! optionally renamed from that context, and downloaded one at a time.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use payslip_shared::{DocType, Period, WalkOptions};
use payslip_text::{detect_doc_type, extract_period_from_name, name_filter_matches};

use crate::store::{RemoteFailure, RemoteNode, RemoteStore, TransferProgress};

// ---------------------------------------------------------------------------
// FolderContext
// ---------------------------------------------------------------------------

/// Metadata inherited from ancestor folder names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderContext {
    pub date: Option<Period>,
    pub doc_type: Option<DocType>,
}

impl FolderContext {
    /// Context of a child folder: its own name wins, the parent fills the gaps.
    ///
    /// Every entered folder carries a document type; without a keyword in the
    /// chain it is [`DocType::PaySlip`].
    pub fn enter(&self, folder_name: &str) -> Self {
        Self {
            date: extract_period_from_name(folder_name).or(self.date),
            doc_type: detect_doc_type(folder_name)
                .or(self.doc_type)
                .or(Some(DocType::default())),
        }
    }

    /// Effective date and type for a file in this folder.
    ///
    /// The document type always comes from the folder chain. The file's own
    /// name only supplies a date when no ancestor provided one.
    pub fn resolve(&self, file_name: &str) -> (Option<Period>, DocType) {
        let date = self.date.or_else(|| extract_period_from_name(file_name));
        (date, self.doc_type.unwrap_or_default())
    }
}

/// Local file name for a download.
///
/// With an identity: `<date>-<doc_type>-<identity><ext>`, the date segment
/// dropped when unknown. Without one, the remote name is kept.
pub fn destination_name(file_name: &str, context: &FolderContext, identity: Option<&str>) -> String {
    let name = match identity {
        Some(identity) => {
            let (date, doc_type) = context.resolve(file_name);
            let ext = Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            match date {
                Some(date) => format!("{date}-{doc_type}-{identity}{ext}"),
                None => format!("{doc_type}-{identity}{ext}"),
            }
        }
        None => file_name.to_string(),
    };
    name.replace(['/', '\\'], "_")
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Outcome of a [`download_tree`] walk.
#[derive(Debug, Clone, Default)]
pub struct RetrievalReport {
    /// Local paths of successful downloads, in traversal order.
    pub downloaded: Vec<PathBuf>,
    /// Folders or files that could not be read; the walk went on without them.
    pub failures: Vec<RemoteFailure>,
    pub folders_visited: usize,
    /// Native Drive documents passed over.
    pub files_skipped: usize,
    /// Downloads that replaced an earlier file of the same walk.
    pub overwritten: usize,
}

struct Frame {
    folder_id: String,
    parent: FolderContext,
    depth: usize,
}

/// Walk `root_folder_id` depth-first and download every matching file.
///
/// Files of a folder are handled before its sub-folders, and sub-folders in
/// listing order. Existing local files with the same name are overwritten.
#[instrument(skip_all, fields(root = %root_folder_id, dest = %options.dest_dir.display()))]
pub async fn download_tree<S, P>(
    store: &S,
    root_folder_id: &str,
    options: &WalkOptions,
    progress: &P,
) -> RetrievalReport
where
    S: RemoteStore + ?Sized,
    P: TransferProgress + ?Sized,
{
    let mut report = RetrievalReport::default();
    let mut stack = vec![Frame {
        folder_id: root_folder_id.to_string(),
        parent: FolderContext::default(),
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        let folder_name = match store.get_name(&frame.folder_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(folder_id = %frame.folder_id, error = %e, "cannot access folder");
                report.failures.push(RemoteFailure::new(&frame.folder_id, e));
                continue;
            }
        };
        let context = frame.parent.enter(&folder_name);
        report.folders_visited += 1;

        info!(
            depth = frame.depth,
            folder = %folder_name,
            date = ?context.date.map(|d| d.to_string()),
            doc_type = ?context.doc_type,
            "searching folder"
        );

        let children = match store.list_children(&frame.folder_id).await {
            Ok(children) => children,
            Err(e) => {
                warn!(folder = %folder_name, error = %e, "cannot list folder");
                report.failures.push(RemoteFailure::new(&folder_name, e));
                continue;
            }
        };
        if children.is_empty() {
            debug!(folder = %folder_name, "empty folder");
            continue;
        }

        let (folders, files): (Vec<RemoteNode>, Vec<RemoteNode>) =
            children.into_iter().partition(RemoteNode::is_folder);

        for file in files.iter().filter(|f| is_wanted(f, options)) {
            if file.is_workspace_native() {
                debug!(file = %file.name, mime = %file.mime_type, "skipping native Drive document");
                report.files_skipped += 1;
                continue;
            }

            let local_name =
                destination_name(&file.name, &context, options.rename_identity.as_deref());
            let dest = options.dest_dir.join(&local_name);

            let on_chunk = |done: u64, total: Option<u64>| progress.bytes(&local_name, done, total);
            let outcome = store.download(&file.id, &dest, &on_chunk).await;
            progress.finished(&local_name);

            match outcome {
                Ok(bytes) => {
                    if local_name == file.name {
                        info!(file = %file.name, bytes, "downloaded");
                    } else {
                        info!(file = %file.name, renamed = %local_name, bytes, "downloaded");
                    }
                    if report.downloaded.contains(&dest) {
                        warn!(file = %file.name, local = %local_name, "replaced an earlier download with the same name");
                        report.overwritten += 1;
                    } else {
                        report.downloaded.push(dest);
                    }
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "download failed");
                    report.failures.push(RemoteFailure::new(&file.name, e));
                }
            }
        }

        // Reverse so the first listed sub-folder is popped first.
        for folder in folders.into_iter().rev() {
            stack.push(Frame {
                folder_id: folder.id,
                parent: context,
                depth: frame.depth + 1,
            });
        }
    }

    info!(
        downloaded = report.downloaded.len(),
        failures = report.failures.len(),
        folders = report.folders_visited,
        "retrieval completed"
    );

    report
}

/// Extension and name-filter check.
fn is_wanted(file: &RemoteNode, options: &WalkOptions) -> bool {
    let has_extension = file
        .name
        .to_lowercase()
        .ends_with(&options.target_extension.to_lowercase());
    has_extension
        && options
            .name_filter
            .as_deref()
            .is_none_or(|filter| name_filter_matches(&file.name, filter))
}

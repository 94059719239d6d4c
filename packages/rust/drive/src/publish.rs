//! Upload of generated artifacts to a single destination folder.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::store::{RemoteFailure, RemoteStore, UploadedFile};

/// Outcome of a [`publish`] run.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub uploaded: Vec<UploadedFile>,
    pub failures: Vec<RemoteFailure>,
}

impl PublishReport {
    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }
}

/// Upload each file into `dest_folder_id`, one call per file, no recursion.
///
/// A failed upload is logged and reported; the remaining files are still sent.
#[instrument(skip_all, fields(dest = %dest_folder_id, files = files.len()))]
pub async fn publish<S>(store: &S, files: &[PathBuf], dest_folder_id: &str) -> PublishReport
where
    S: RemoteStore + ?Sized,
{
    let mut report = PublishReport::default();

    for path in files {
        match store.upload(path, dest_folder_id).await {
            Ok(remote) => {
                info!(file = %remote.name, link = remote.link.as_deref().unwrap_or("-"), "uploaded");
                report.uploaded.push(UploadedFile {
                    path: path.clone(),
                    id: remote.id,
                    link: remote.link,
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "upload failed");
                report
                    .failures
                    .push(RemoteFailure::new(path.display().to_string(), e));
            }
        }
    }

    info!(
        uploaded = report.uploaded_count(),
        failures = report.failures.len(),
        "publish completed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn failed_upload_does_not_stop_the_rest() {
        let dir = std::env::temp_dir().join(format!("payslip-publish-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let files: Vec<PathBuf> = ["2025-09 Dupont Marie.pdf", "2025-09 Martin Paul.pdf", "2025-09 Durand Léa.pdf"]
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"%PDF-1.5").unwrap();
                path
            })
            .collect();

        let store = MemoryStore::new();
        store.fail_upload("2025-09 Martin Paul.pdf");

        let report = publish(&store, &files, "dest").await;

        assert_eq!(report.uploaded_count(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].target.ends_with("Martin Paul.pdf"));
        assert_eq!(
            store.uploaded_names("dest"),
            vec!["2025-09 Dupont Marie.pdf", "2025-09 Durand Léa.pdf"]
        );
        assert!(report.uploaded.iter().all(|u| u.link.is_some()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_local_file_is_a_failure() {
        let store = MemoryStore::new();
        let report = publish(&store, &[PathBuf::from("/nonexistent/payslip.pdf")], "dest").await;
        assert_eq!(report.uploaded_count(), 0);
        assert_eq!(report.failures.len(), 1);
    }
}

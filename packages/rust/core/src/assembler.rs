//! Per-employee document assembler.
//!
//! Takes an [`Attribution`] and the source document it was computed from,
//! then writes one PDF per attributed employee into the output directory.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use payslip_shared::{PayslipError, Period, Result};

use crate::attribution::Attribution;
use crate::source::PageWriter;

/// A PDF written for one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub full_name: String,
    pub filename: String,
    pub path: PathBuf,
    /// Source page indices, ascending.
    pub pages: Vec<usize>,
    pub sha256: String,
    pub size_bytes: usize,
}

/// `"<period> <full_name>.pdf"`, or `"<full_name>.pdf"` without a period.
pub fn artifact_filename(period: Option<&Period>, full_name: &str) -> String {
    let name = full_name.replace(['/', '\\'], "_");
    match period {
        Some(period) => format!("{period} {name}.pdf"),
        None => format!("{name}.pdf"),
    }
}

/// Write one artifact per assignment in `attribution`.
///
/// Each file is written to a hidden temp file in `output_dir` and then
/// renamed, so a reader never sees a partial PDF. An existing artifact with
/// the same name is replaced.
#[instrument(skip_all, fields(output_dir = %output_dir.display(), artifacts = attribution.assignments().len()))]
pub fn assemble<W: PageWriter + ?Sized>(
    writer: &W,
    attribution: &Attribution,
    period: Option<&Period>,
    output_dir: &Path,
) -> Result<Vec<OutputArtifact>> {
    std::fs::create_dir_all(output_dir).map_err(|e| PayslipError::io(output_dir, e))?;

    let mut artifacts = Vec::with_capacity(attribution.assignments().len());

    for assignment in attribution.assignments() {
        let filename = artifact_filename(period, &assignment.identity.full_name);
        let content = writer.render_subset(&assignment.pages)?;

        let target = output_dir.join(&filename);
        let temp = output_dir.join(format!(".{filename}.tmp"));
        write_atomic(&temp, &target, &content)?;

        let sha256 = format!("{:x}", Sha256::digest(&content));
        debug!(file = %filename, pages = assignment.pages.len(), size = content.len(), "wrote artifact");

        artifacts.push(OutputArtifact {
            full_name: assignment.identity.full_name.clone(),
            filename,
            path: target,
            pages: assignment.pages.clone(),
            sha256,
            size_bytes: content.len(),
        });
    }

    info!(count = artifacts.len(), "artifacts written");
    Ok(artifacts)
}

/// Write `content` to `temp`, then rename it over `target`.
/// The temp file is removed when either step fails.
fn write_atomic(temp: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let outcome = std::fs::write(temp, content)
        .map_err(|e| PayslipError::io(temp, e))
        .and_then(|()| std::fs::rename(temp, target).map_err(|e| PayslipError::io(target, e)));
    if outcome.is_err() {
        let _ = std::fs::remove_file(temp);
    }
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{Page, attribute};
    use crate::roster::{Identity, parse_name};
    use crate::testing::{TextPages, temp_dir};

    fn identities(raw: &[&str]) -> Vec<Identity> {
        raw.iter()
            .map(|r| Identity::from_name(&parse_name(r).unwrap()))
            .collect()
    }

    fn scan(source: &TextPages) -> Vec<Page> {
        source
            .0
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i, t.as_str()))
            .collect()
    }

    #[test]
    fn filenames() {
        let period = Period::month(2025, 9).unwrap();
        assert_eq!(artifact_filename(Some(&period), "Dupont Marie"), "2025-09 Dupont Marie.pdf");
        assert_eq!(artifact_filename(None, "Dupont Marie"), "Dupont Marie.pdf");
    }

    #[test]
    fn writes_one_file_per_attributed_identity() {
        let tmp = temp_dir("payslip-assembler-test");
        let source = TextPages::new(&["Dupont Marie p1", "Martin Paul p1", "Dupont Marie p2"]);
        let attribution = attribute(
            &scan(&source),
            &identities(&["dupont.marie", "martin.paul", "durand.lea"]),
        );
        let period = Period::month(2025, 9).unwrap();

        let artifacts = assemble(&source, &attribution, Some(&period), &tmp).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "2025-09 Dupont Marie.pdf");
        assert_eq!(artifacts[0].pages, vec![0, 2]);
        assert_eq!(
            std::fs::read_to_string(&artifacts[0].path).unwrap(),
            "Dupont Marie p1\nDupont Marie p2"
        );
        assert_eq!(artifacts[1].filename, "2025-09 Martin Paul.pdf");
        assert!(!tmp.join("2025-09 Durand Lea.pdf").exists());
        assert_eq!(artifacts[0].sha256.len(), 64);
        assert_eq!(artifacts[1].size_bytes, "Martin Paul p1".len());

        let leftovers: Vec<_> = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_period_drops_prefix() {
        let tmp = temp_dir("payslip-assembler-test");
        let source = TextPages::new(&["Dupont Marie"]);
        let attribution = attribute(&scan(&source), &identities(&["dupont.marie"]));

        let artifacts = assemble(&source, &attribution, None, &tmp).unwrap();
        assert_eq!(artifacts[0].filename, "Dupont Marie.pdf");
        assert!(tmp.join("Dupont Marie.pdf").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = temp_dir("payslip-assembler-test");
        std::fs::create_dir_all(tmp.join("Dupont Marie.pdf").join("occupied")).unwrap();
        let source = TextPages::new(&["Dupont Marie"]);
        let attribution = attribute(&scan(&source), &identities(&["dupont.marie"]));

        let result = assemble(&source, &attribution, None, &tmp);

        assert!(matches!(result, Err(PayslipError::Io { .. })));
        assert!(!tmp.join(".Dupont Marie.pdf.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rerun_replaces_existing_artifact() {
        let tmp = temp_dir("payslip-assembler-test");
        std::fs::write(tmp.join("Dupont Marie.pdf"), "stale").unwrap();
        let source = TextPages::new(&["Dupont Marie"]);
        let attribution = attribute(&scan(&source), &identities(&["dupont.marie"]));

        assemble(&source, &attribution, None, &tmp).unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.join("Dupont Marie.pdf")).unwrap(),
            "Dupont Marie"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

//! Splitting pipeline for payroll documents.
//!
//! This crate ties together roster loading, PDF page access, attribution
//! and assembly into end-to-end workflows (`split_document`,
//! `download_employee`, `process_and_publish`).

pub mod assembler;
pub mod attribution;
pub mod pipeline;
pub mod roster;
pub mod source;
pub mod workdir;

#[cfg(test)]
mod testing;

pub use assembler::{OutputArtifact, artifact_filename, assemble};
pub use attribution::{Assignment, Attribution, Page, attribute};
pub use pipeline::{
    DownloadRequest, DownloadResult, ProcessRequest, ProcessResult, ProgressReporter,
    SilentProgress, SplitResult, download_employee, process_and_publish, scan_pages, split_document,
    split_source,
};
pub use roster::{
    Identity, NameError, PersonName, build_identities, load_roster, parse_name, parse_roster,
    resolve_full_name,
};
pub use source::{PageSource, PageWriter, PdfDocument};
pub use workdir::{clean_dir, prepare_dir};

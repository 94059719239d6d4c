//! End-to-end flows: split a local PDF, download one employee's documents,
//! and the full download → split → publish run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use payslip_drive::{PublishReport, RemoteStore, RetrievalReport, TransferProgress, download_tree, publish};
use payslip_shared::{AppConfig, ExtractConfig, Period, Result, Roster, WalkOptions};
use payslip_text::PeriodExtractor;

use crate::assembler::{OutputArtifact, assemble};
use crate::attribution::{Page, attribute};
use crate::roster::{Identity, build_identities, load_roster, resolve_full_name};
use crate::source::{PageSource, PageWriter, PdfDocument};
use crate::workdir::{clean_dir, prepare_dir};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: TransferProgress {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page's text has been read.
    fn page_scanned(&self, current: usize, total: usize);
    /// Called once per written artifact.
    fn artifact_written(&self, artifact: &OutputArtifact);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl TransferProgress for SilentProgress {
    fn bytes(&self, _name: &str, _done: u64, _total: Option<u64>) {}
    fn finished(&self, _name: &str) {}
}

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_scanned(&self, _current: usize, _total: usize) {}
    fn artifact_written(&self, _artifact: &OutputArtifact) {}
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Result of splitting one source document.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub source: PathBuf,
    pub period: Option<Period>,
    pub page_count: usize,
    pub artifacts: Vec<OutputArtifact>,
    /// Pages that matched no identity.
    pub unattributed: Vec<usize>,
    pub elapsed: Duration,
}

/// Read every page, an extraction failure counting as an empty page.
pub fn scan_pages<S: PageSource + ?Sized>(source: &S, progress: &dyn ProgressReporter) -> Vec<Page> {
    let total = source.page_count();
    (0..total)
        .map(|index| {
            let text = source.page_text(index).unwrap_or_else(|e| {
                warn!(page = index + 1, error = %e, "text extraction failed, page treated as empty");
                String::new()
            });
            progress.page_scanned(index + 1, total);
            Page::new(index, text)
        })
        .collect()
}

/// Split an already opened source into one artifact per attributed identity.
#[instrument(skip_all, fields(source = %label.display(), identities = identities.len()))]
pub fn split_source<S>(
    label: &Path,
    source: &S,
    identities: &[Identity],
    extractor: &PeriodExtractor,
    output_dir: &Path,
    progress: &dyn ProgressReporter,
) -> Result<SplitResult>
where
    S: PageSource + PageWriter + ?Sized,
{
    let start = Instant::now();

    progress.phase("Scanning pages");
    let pages = scan_pages(source, progress);

    let period = extractor.extract_from_pages(pages.iter().map(|p| p.raw_text.as_str()));
    match &period {
        Some(period) => info!(%period, "pay period found"),
        None => warn!("no pay period found, artifacts are named without it"),
    }

    let attribution = attribute(&pages, identities);
    if !attribution.unattributed().is_empty() {
        info!(pages = ?attribution.unattributed(), "pages not attributed to anyone");
    }

    progress.phase("Writing employee documents");
    let artifacts = assemble(source, &attribution, period.as_ref(), output_dir)?;
    for artifact in &artifacts {
        progress.artifact_written(artifact);
    }

    let result = SplitResult {
        source: label.to_path_buf(),
        period,
        page_count: pages.len(),
        artifacts,
        unattributed: attribution.unattributed().to_vec(),
        elapsed: start.elapsed(),
    };
    info!(
        pages = result.page_count,
        artifacts = result.artifacts.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "document split"
    );
    Ok(result)
}

/// Open the PDF at `path` and split it. The document is released on return.
pub fn split_document(
    path: &Path,
    identities: &[Identity],
    extractor: &PeriodExtractor,
    output_dir: &Path,
    progress: &dyn ProgressReporter,
) -> Result<SplitResult> {
    let document = PdfDocument::open(path)?;
    split_source(path, &document, identities, extractor, output_dir, progress)
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Parameters of a single-employee download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Matched against file names and used to look up the roster name.
    pub employee_filter: String,
    pub folder_id: String,
    /// Emptied before the walk starts.
    pub dest_dir: PathBuf,
}

#[derive(Debug)]
pub struct DownloadResult {
    /// Roster name used to rename the downloads.
    pub full_name: String,
    pub report: RetrievalReport,
}

/// Download every document of one employee, renamed after their roster name.
#[instrument(skip_all, fields(filter = %request.employee_filter, folder = %request.folder_id))]
pub async fn download_employee<S>(
    store: &S,
    roster: &Roster,
    request: &DownloadRequest,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<DownloadResult>
where
    S: RemoteStore + ?Sized,
{
    let full_name = resolve_full_name(roster, &request.employee_filter);
    info!(%full_name, dest = %request.dest_dir.display(), "downloading employee documents");

    clean_dir(&request.dest_dir)?;

    let mut options = WalkOptions::new(config, &request.dest_dir);
    options.name_filter = Some(request.employee_filter.clone());
    options.rename_identity = Some(full_name.clone());

    progress.phase("Downloading documents");
    let report = download_tree(store, &request.folder_id, &options, progress).await;

    Ok(DownloadResult { full_name, report })
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// Parameters of a download → split → publish run.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub dest_folder_id: String,
    pub employee_filter: Option<String>,
    pub source_folder_id: String,
}

#[derive(Debug)]
pub struct ProcessResult {
    pub retrieval: RetrievalReport,
    pub splits: Vec<SplitResult>,
    pub publish: PublishReport,
    pub elapsed: Duration,
}

impl ProcessResult {
    pub fn downloaded(&self) -> usize {
        self.retrieval.downloaded.len()
    }

    pub fn created(&self) -> usize {
        self.splits.iter().map(|s| s.artifacts.len()).sum()
    }

    pub fn uploaded(&self) -> usize {
        self.publish.uploaded_count()
    }

    pub fn failures(&self) -> usize {
        self.retrieval.failures.len() + self.publish.failures.len()
    }
}

/// Run the full flow.
///
/// 1. Download source PDFs (original names) into `paths.input_dir`
/// 2. Load the roster and build identities
/// 3. Split every downloaded PDF into its own `paths.output_dir/<source stem>`
/// 4. Upload every artifact to the destination folder
#[instrument(skip_all, fields(source = %request.source_folder_id, dest = %request.dest_folder_id))]
pub async fn process_and_publish<S>(
    store: &S,
    request: &ProcessRequest,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<ProcessResult>
where
    S: RemoteStore + ?Sized,
{
    let start = Instant::now();
    let input_dir = PathBuf::from(&config.paths.input_dir);
    let output_dir = PathBuf::from(&config.paths.output_dir);
    prepare_dir(&input_dir)?;
    prepare_dir(&output_dir)?;

    // --- Phase 1: Download ---
    progress.phase("Downloading source documents");
    let mut options = WalkOptions::new(config, &input_dir);
    options.name_filter = request.employee_filter.clone();
    let retrieval = download_tree(store, &request.source_folder_id, &options, progress).await;

    if retrieval.downloaded.is_empty() {
        info!("no documents to process");
        return Ok(ProcessResult {
            retrieval,
            splits: Vec::new(),
            publish: PublishReport::default(),
            elapsed: start.elapsed(),
        });
    }

    // --- Phase 2: Roster ---
    progress.phase("Loading roster");
    let roster = load_roster(&config.roster.source).await?;
    let identities = build_identities(&roster);
    let extractor = PeriodExtractor::new(&ExtractConfig::from(config))?;

    // --- Phase 3: Split ---
    let mut splits = Vec::with_capacity(retrieval.downloaded.len());
    let mut source_dirs = HashSet::new();
    for path in &retrieval.downloaded {
        let dir = source_output_dir(&output_dir, path, &mut source_dirs);
        splits.push(split_document(path, &identities, &extractor, &dir, progress)?);
    }

    let files: Vec<PathBuf> = splits
        .iter()
        .flat_map(|s| &s.artifacts)
        .map(|artifact| artifact.path.clone())
        .collect();

    // --- Phase 4: Publish ---
    progress.phase("Uploading employee documents");
    let publish = publish(store, &files, &request.dest_folder_id).await;

    let result = ProcessResult {
        retrieval,
        splits,
        publish,
        elapsed: start.elapsed(),
    };
    info!(
        downloaded = result.downloaded(),
        created = result.created(),
        uploaded = result.uploaded(),
        failures = result.failures(),
        "process complete"
    );
    Ok(result)
}

/// `output_dir/<source stem>`, suffixed with a counter when two sources
/// share a stem, so artifacts of different sources never overwrite each other.
fn source_output_dir(output_dir: &Path, source: &Path, used: &mut HashSet<String>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "source".to_string());

    let mut name = stem.clone();
    let mut n = 2;
    while !used.insert(name.to_lowercase()) {
        name = format!("{stem}-{n}");
        n += 1;
    }
    output_dir.join(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

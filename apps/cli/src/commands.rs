//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tracing::{info, warn};

use payslip_core::{
    DownloadRequest, OutputArtifact, ProcessRequest, ProgressReporter, build_identities,
    download_employee, load_roster, process_and_publish, split_document,
};
use payslip_drive::{DriveClient, RemoteFailure, TransferProgress};
use payslip_shared::{
    AppConfig, ExtractConfig, Roster, access_token, config_file_path, init_config_at, load_config,
    load_config_from,
};
use payslip_text::PeriodExtractor;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// payslip — split payroll PDFs per employee and move them through Google Drive.
#[derive(Parser)]
#[command(
    name = "payslip",
    version,
    about = "Split payroll PDFs into one document per employee, with Google Drive retrieval and publishing.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.payslip/payslip.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Split a local payroll PDF into one file per employee.
    Split {
        /// Source PDF.
        input: PathBuf,

        /// Output directory (defaults to `paths.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download every document of one employee from Drive, renamed.
    Download {
        /// Employee name fragment, matched against file names and the roster.
        employee: String,

        /// Root folder to search (defaults to `drive.source_folder_id`).
        #[arg(short, long)]
        folder: Option<String>,

        /// Download directory (defaults to `<paths.output_dir>/<employee>`). Emptied first.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download source PDFs, split them, and upload the results.
    Process {
        /// Drive folder receiving the per-employee files.
        dest_folder_id: String,

        /// Only process source files whose name contains this.
        employee_filter: Option<String>,

        /// Root folder to search (defaults to `drive.source_folder_id`).
        source_folder_id: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "payslip=info",
        1 => "payslip=debug",
        _ => "payslip=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Split { input, out } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_split(&config, &input, out).await
        }
        Command::Download {
            employee,
            folder,
            out,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_download(&config, &employee, folder, out).await
        }
        Command::Process {
            dest_folder_id,
            employee_filter,
            source_folder_id,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_process(&config, dest_folder_id, employee_filter, source_folder_id).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Explicit `--config` must exist; the default location falls back to defaults.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn source_folder(config: &AppConfig, folder: Option<String>) -> Result<String> {
    folder
        .or_else(|| config.drive.source_folder_id.clone())
        .ok_or_else(|| eyre!("no source folder: pass one or set drive.source_folder_id in the config"))
}

fn drive_client(config: &AppConfig) -> Result<DriveClient> {
    let token = access_token(config)?;
    Ok(DriveClient::new(&config.drive, token)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_split(config: &AppConfig, input: &Path, out: Option<PathBuf>) -> Result<()> {
    if !input.is_file() {
        return Err(eyre!("input file '{}' not found", input.display()));
    }
    let output_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.output_dir));

    let roster = load_roster(&config.roster.source).await?;
    let identities = build_identities(&roster);
    let extractor = PeriodExtractor::new(&ExtractConfig::from(config))?;

    info!(input = %input.display(), out = %output_dir.display(), "splitting document");

    let reporter = CliProgress::new();
    let result = split_document(input, &identities, &extractor, &output_dir, &reporter);
    reporter.finish();
    let result = result?;

    println!();
    println!("  Document split!");
    println!("  Source:    {}", result.source.display());
    println!(
        "  Period:    {}",
        result.period.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("  Pages:     {}", result.page_count);
    println!("  Created:   {}", result.artifacts.len());
    if !result.unattributed.is_empty() {
        let pages: Vec<String> = result.unattributed.iter().map(|p| (p + 1).to_string()).collect();
        println!("  Unmatched: pages {}", pages.join(", "));
    }
    println!("  Output:    {}", output_dir.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_download(
    config: &AppConfig,
    employee: &str,
    folder: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let folder_id = source_folder(config, folder)?;
    let client = drive_client(config)?;

    let roster = load_roster(&config.roster.source).await.unwrap_or_else(|e| {
        warn!(error = %e, "roster unavailable, files are named after the filter");
        Roster::default()
    });

    let request = DownloadRequest {
        employee_filter: employee.to_string(),
        folder_id,
        dest_dir: out.unwrap_or_else(|| Path::new(&config.paths.output_dir).join(employee)),
    };

    let reporter = CliProgress::new();
    let result = download_employee(&client, &roster, &request, config, &reporter).await;
    reporter.finish();
    let result = result?;

    println!();
    println!("  Download complete!");
    println!("  Employee:   {}", result.full_name);
    println!("  Folders:    {}", result.report.folders_visited);
    println!("  Downloaded: {}", result.report.downloaded.len());
    if result.report.overwritten > 0 {
        println!("  Replaced:   {} (same destination name)", result.report.overwritten);
    }
    println!("  Directory:  {}", request.dest_dir.display());
    print_failures(&result.report.failures);
    println!();

    Ok(())
}

async fn cmd_process(
    config: &AppConfig,
    dest_folder_id: String,
    employee_filter: Option<String>,
    source_folder_id: Option<String>,
) -> Result<()> {
    let request = ProcessRequest {
        dest_folder_id,
        employee_filter,
        source_folder_id: source_folder(config, source_folder_id)?,
    };
    let client = drive_client(config)?;

    let reporter = CliProgress::new();
    let result = process_and_publish(&client, &request, config, &reporter).await;
    reporter.finish();
    let result = result?;

    if result.downloaded() == 0 {
        println!("No files to process.");
        return Ok(());
    }

    println!();
    println!("  Process complete!");
    println!("  Downloaded: {}", result.downloaded());
    println!("  Created:    {}", result.created());
    println!("  Uploaded:   {}", result.uploaded());
    for uploaded in &result.publish.uploaded {
        println!(
            "    {}  {}",
            uploaded.path.file_name().unwrap_or_default().to_string_lossy(),
            uploaded.link.as_deref().unwrap_or("-")
        );
    }
    let failures: Vec<RemoteFailure> = result
        .retrieval
        .failures
        .iter()
        .chain(&result.publish.failures)
        .cloned()
        .collect();
    print_failures(&failures);
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn print_failures(failures: &[RemoteFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("  Failures:   {}", failures.len());
    for failure in failures {
        println!("    {}: {}", failure.target, failure.error);
    }
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    init_config_at(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl TransferProgress for CliProgress {
    fn bytes(&self, name: &str, done: u64, total: Option<u64>) {
        let message = match total {
            Some(total) => format!("Downloading {name} [{} / {}]", HumanBytes(done), HumanBytes(total)),
            None => format!("Downloading {name} [{}]", HumanBytes(done)),
        };
        self.spinner.set_message(message);
    }

    fn finished(&self, name: &str) {
        self.spinner.set_message(format!("Downloaded {name}"));
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_scanned(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scanning page [{current}/{total}]"));
    }

    fn artifact_written(&self, artifact: &OutputArtifact) {
        self.spinner.println(format!(
            "  {} ({} page{})",
            artifact.filename,
            artifact.pages.len(),
            if artifact.pages.len() == 1 { "" } else { "s" }
        ));
    }
}

//! Application configuration for the payslip splitter.
//!
//! User config lives at `~/.payslip/payslip.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PayslipError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "payslip.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".payslip";

/// Labelled pay-period phrase, e.g. `Période de paie : du 01/09/2025 au 30/09/2025`.
/// Capture group 1 must be the `DD/MM/YYYY` start date.
pub const DEFAULT_PERIOD_PATTERN: &str =
    r"(?i)p[ée]\p{M}*riode\s*de\s*paie\s*:\s*du\s*(\d{2}/\d{2}/\d{4})";

// ---------------------------------------------------------------------------
// Config structs (matching payslip.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote store settings.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Employee roster location.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Local working directories.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Text extraction settings.
    #[serde(default)]
    pub extract: ExtractSection,
}

/// `[drive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Folder walked when no source folder is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_folder_id: Option<String>,

    /// Name of the env var holding the OAuth access token (never store the token itself).
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Drive v3 metadata endpoint.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Drive v3 upload endpoint.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,

    /// Per-request transport timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            source_folder_id: None,
            access_token_env: default_access_token_env(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_access_token_env() -> String {
    "GOOGLE_DRIVE_TOKEN".into()
}
fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".into()
}
fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".into()
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[roster]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Local path or `http(s)` URL of the `employees.yaml` roster.
    #[serde(default = "default_roster_source")]
    pub source: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            source: default_roster_source(),
        }
    }
}

fn default_roster_source() -> String {
    "employees.yaml".into()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where source PDFs are downloaded before splitting.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Where per-employee PDFs and downloads are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_input_dir() -> String {
    "input".into()
}
fn default_output_dir() -> String {
    "output".into()
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSection {
    /// Regex locating the pay period in page text.
    #[serde(default = "default_period_pattern")]
    pub period_pattern: String,

    /// Number of leading pages searched for the pay period.
    #[serde(default = "default_scan_pages")]
    pub scan_pages: usize,

    /// Extension of remote files worth downloading.
    #[serde(default = "default_target_extension")]
    pub target_extension: String,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            period_pattern: default_period_pattern(),
            scan_pages: default_scan_pages(),
            target_extension: default_target_extension(),
        }
    }
}

fn default_period_pattern() -> String {
    DEFAULT_PERIOD_PATTERN.into()
}
fn default_scan_pages() -> usize {
    5
}
fn default_target_extension() -> String {
    ".pdf".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime text-extraction configuration.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Regex with the `DD/MM/YYYY` start date in capture group 1.
    pub period_pattern: String,
    /// Number of leading pages searched for the pay period.
    pub scan_pages: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            period_pattern: config.extract.period_pattern.clone(),
            scan_pages: config.extract.scan_pages,
        }
    }
}

/// Runtime options for a remote folder walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Only files ending with this extension are considered (case-insensitive).
    pub target_extension: String,
    /// Accent- and case-insensitive substring the file name must contain.
    pub name_filter: Option<String>,
    /// When set, downloads are renamed `<date>-<doc_type>-<identity><ext>`.
    pub rename_identity: Option<String>,
    /// Local directory receiving the downloads.
    pub dest_dir: PathBuf,
}

impl WalkOptions {
    /// Walk options with the configured extension and no filter or renaming.
    pub fn new(config: &AppConfig, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_extension: config.extract.target_extension.clone(),
            name_filter: None,
            rename_identity: None,
            dest_dir: dest_dir.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.payslip/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PayslipError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.payslip/payslip.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PayslipError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PayslipError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| PayslipError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PayslipError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| PayslipError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Read the Drive access token from the env var named in the config.
pub fn access_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.drive.access_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(PayslipError::config(format!(
            "Drive access token not found. Set the {var_name} environment variable \
             to an OAuth access token with the drive scope."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("GOOGLE_DRIVE_TOKEN"));
        assert!(!toml_str.contains("source_folder_id"));
    }

    #[test]
    fn config_roundtrip_keeps_period_pattern() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.extract.period_pattern, DEFAULT_PERIOD_PATTERN);
        assert_eq!(parsed.extract.scan_pages, 5);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[drive]
source_folder_id = "1abcDEF"

[paths]
output_dir = "/tmp/payslips"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.drive.source_folder_id.as_deref(), Some("1abcDEF"));
        assert_eq!(config.drive.timeout_secs, 60);
        assert_eq!(config.paths.output_dir, "/tmp/payslips");
        assert_eq!(config.paths.input_dir, "input");
        assert_eq!(config.roster.source, "employees.yaml");
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let mut app = AppConfig::default();
        app.extract.scan_pages = 2;
        app.extract.target_extension = ".PDF".into();

        let extract = ExtractConfig::from(&app);
        assert_eq!(extract.scan_pages, 2);

        let walk = WalkOptions::new(&app, "downloads");
        assert_eq!(walk.target_extension, ".PDF");
        assert_eq!(walk.dest_dir, PathBuf::from("downloads"));
        assert!(walk.name_filter.is_none());
    }

    #[test]
    fn access_token_missing() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.drive.access_token_env = "PAYSLIP_TEST_NONEXISTENT_TOKEN_12345".into();
        let result = access_token(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("access token not found"));
    }

    #[test]
    fn init_config_at_writes_loadable_defaults() {
        let dir = std::env::temp_dir().join(format!("payslip-config-test-{}", uuid::Uuid::now_v7()));
        let path = dir.join("nested").join("payslip.toml");

        init_config_at(&path).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.paths.output_dir, "output");
        assert_eq!(loaded.drive.access_token_env, "GOOGLE_DRIVE_TOKEN");

        let _ = std::fs::remove_dir_all(&dir);
    }
}

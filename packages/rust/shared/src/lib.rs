//! Shared types, error model, and configuration for the payslip splitter.
//!
//! This crate is the foundation depended on by all other payslip crates.
//! It provides:
//! - [`PayslipError`] — the unified error type
//! - Domain types ([`Period`], [`DocType`], [`Employee`], [`Roster`])
//! - Configuration ([`AppConfig`], [`ExtractConfig`], [`WalkOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_PERIOD_PATTERN, DriveConfig, ExtractConfig, ExtractSection, PathsConfig,
    RosterConfig, WalkOptions, access_token, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from,
};
pub use error::{PayslipError, Result};
pub use types::{DocType, Employee, Period, Roster};

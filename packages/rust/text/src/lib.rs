//! Text normalization and metadata extraction.
//!
//! This crate provides:
//! - [`normalize`] — accent/case folding used for every name comparison
//! - [`PeriodExtractor`] and [`extract_period_from_name`] — billing periods
//! - [`extract_doc_type`] — pay slip vs. participation statement

pub mod doctype;
pub mod normalize;
pub mod period;

pub use doctype::{detect_doc_type, extract_doc_type};
pub use normalize::{clean_for_match, name_filter_matches, normalize};
pub use period::{PeriodExtractor, extract_period_from_name};

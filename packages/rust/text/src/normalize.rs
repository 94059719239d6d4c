//! Accent- and case-folding for name comparison.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Characters removed by [`clean_for_match`] besides whitespace.
const HYPHENS: [char; 4] = ['-', '\u{2010}', '\u{2011}', '\u{00AD}'];

/// Decompose, drop combining marks, lower-case.
///
/// Runs the decomposition twice so compatibility characters that decompose
/// to upper-case letters (`㎒` → `MHz`) still end up folded; this keeps
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Strip whitespace and hyphens so names broken across lines still match.
pub fn clean_for_match(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !HYPHENS.contains(c))
        .collect()
}

/// Accent- and case-insensitive substring test for file-name filters.
/// An empty filter matches everything.
pub fn name_filter_matches(name: &str, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    normalize(name).contains(&normalize(filter))
}

//! Roster loading and identity derivation.
//!
//! Roster names use a `last.first` token form. Each active, well-formed
//! entry becomes an [`Identity`]: a display name plus the normalized tokens
//! the attribution engine searches for.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use payslip_shared::{Employee, PayslipError, Result, Roster};
use payslip_text::{clean_for_match, normalize};

// ---------------------------------------------------------------------------
// Name parsing
// ---------------------------------------------------------------------------

/// Why a raw roster name cannot be matched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("expected `last.first`, got {0:?}")]
    TokenCount(String),
    #[error("empty last name in {0:?}")]
    EmptyLastName(String),
}

/// A parsed `last.first` name, tokens capitalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub last: String,
    /// Empty for `dupont.`; matching then relies on the last name alone.
    pub first: String,
}

impl PersonName {
    /// `Last First`, or just `Last` when there is no first name.
    pub fn full_name(&self) -> String {
        if self.first.is_empty() {
            self.last.clone()
        } else {
            format!("{} {}", self.last, self.first)
        }
    }
}

/// Parse a raw `last.first` roster name.
pub fn parse_name(raw: &str) -> std::result::Result<PersonName, NameError> {
    let tokens: Vec<&str> = raw.split('.').collect();
    let [last, first] = tokens.as_slice() else {
        return Err(NameError::TokenCount(raw.to_string()));
    };
    // A last name of only hyphens or spaces would match every page.
    if clean_for_match(&normalize(last)).is_empty() {
        return Err(NameError::EmptyLastName(raw.to_string()));
    }
    Ok(PersonName {
        last: capitalize(last.trim()),
        first: capitalize(first.trim()),
    })
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Matching tokens for one employee, built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// `Last First`, used in output file names.
    pub full_name: String,
    pub normalized_last: String,
    /// Empty when the roster entry has no first name.
    pub normalized_first: String,
}

impl Identity {
    pub fn from_name(name: &PersonName) -> Self {
        Self {
            full_name: name.full_name(),
            normalized_last: normalize(&name.last),
            normalized_first: normalize(&name.first),
        }
    }
}

impl TryFrom<&Employee> for Identity {
    type Error = NameError;

    fn try_from(employee: &Employee) -> std::result::Result<Self, Self::Error> {
        parse_name(&employee.name).map(|name| Self::from_name(&name))
    }
}

/// Identities of every active, well-formed roster entry, in roster order.
///
/// Entries resolving to an already seen full name are dropped; the first
/// one in roster order is kept.
pub fn build_identities(roster: &Roster) -> Vec<Identity> {
    let mut seen = HashSet::new();
    let identities: Vec<Identity> = roster
        .active()
        .filter_map(|employee| match Identity::try_from(employee) {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(error = %e, "excluding malformed roster name");
                None
            }
        })
        .filter(|identity| {
            let fresh = seen.insert(identity.full_name.clone());
            if !fresh {
                debug!(name = %identity.full_name, "skipping duplicate roster name");
            }
            fresh
        })
        .collect();

    info!(
        roster = roster.employees.len(),
        identities = identities.len(),
        "identities built"
    );
    identities
}

/// Roster full name matching `filter` (on the full or raw name), else the filter itself.
pub fn resolve_full_name(roster: &Roster, filter: &str) -> String {
    let wanted = normalize(filter);
    roster
        .active()
        .find_map(|employee| {
            let name = parse_name(&employee.name).ok()?.full_name();
            (normalize(&name).contains(&wanted) || normalize(&employee.name).contains(&wanted))
                .then_some(name)
        })
        .unwrap_or_else(|| {
            warn!(filter, "no roster entry matches, using the filter as the name");
            filter.to_string()
        })
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse `employees.yaml` content.
pub fn parse_roster(yaml: &str) -> Result<Roster> {
    serde_yaml::from_str(yaml).map_err(|e| PayslipError::roster(format!("invalid roster: {e}")))
}

/// Load the roster from a local path or an `http(s)` URL.
#[instrument]
pub async fn load_roster(source: &str) -> Result<Roster> {
    let content = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_roster(source).await?
    } else {
        let path = Path::new(source);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PayslipError::io(path, e))?
    };

    let roster = parse_roster(&content)?;
    info!(
        employees = roster.employees.len(),
        active = roster.active().count(),
        "roster loaded"
    );
    Ok(roster)
}

async fn fetch_roster(url: &str) -> Result<String> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| PayslipError::Network(format!("{url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PayslipError::roster(format!("{url}: HTTP {status}")));
    }
    response
        .text()
        .await
        .map_err(|e| PayslipError::Network(format!("{url}: body read failed: {e}")))
}

//! Core domain types shared by the extractor, the walker and the splitter.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// A billing period label: a full month, or a bare year when only the year is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    /// `YYYY-MM`.
    Month { year: u16, month: u8 },
    /// `YYYY`, only ever derived from file or folder names.
    Year(u16),
}

impl Period {
    /// Build a month period, rejecting months outside 1–12.
    pub fn month(year: u16, month: u8) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self::Month { year, month })
    }

    pub fn year(&self) -> u16 {
        match self {
            Self::Month { year, .. } | Self::Year(year) => *year,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Year(year) => write!(f, "{year:04}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DocType
// ---------------------------------------------------------------------------

/// Kind of payroll document, used as a file-name segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    /// Monthly pay slip.
    #[default]
    #[serde(rename = "fiche-de-paie")]
    PaySlip,
    /// Profit-sharing statement.
    Participation,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaySlip => "fiche-de-paie",
            Self::Participation => "participation",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// One roster entry as stored in `employees.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Raw `last.first` token form.
    pub name: String,
    /// Former employees stay in the roster but are never matched.
    #[serde(default = "default_current")]
    pub current_employee: bool,
}

fn default_current() -> bool {
    true
}

/// Root structure of `employees.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub employees: Vec<Employee>,
}

impl Roster {
    /// Employees still on staff, in roster order.
    pub fn active(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter().filter(|e| e.current_employee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_display_pads() {
        assert_eq!(Period::month(2024, 3).unwrap().to_string(), "2024-03");
        assert_eq!(Period::Year(2024).to_string(), "2024");
    }

    #[test]
    fn period_rejects_bad_month() {
        assert!(Period::month(2024, 0).is_none());
        assert!(Period::month(2024, 13).is_none());
        assert_eq!(Period::month(2024, 12).map(|p| p.year()), Some(2024));
    }

    #[test]
    fn doc_type_serializes_as_segment() {
        let json = serde_json::to_string(&DocType::PaySlip).expect("serialize");
        assert_eq!(json, "\"fiche-de-paie\"");
        assert_eq!(DocType::Participation.to_string(), "participation");
        assert_eq!(DocType::default(), DocType::PaySlip);
    }

    #[test]
    fn roster_defaults_to_current() {
        let yaml = r#"
employees:
  - name: dupont.marie
  - name: martin.paul
    current_employee: false
"#;
        let roster: Roster = serde_yaml::from_str(yaml).expect("parse roster");
        assert_eq!(roster.employees.len(), 2);
        let active: Vec<_> = roster.active().map(|e| e.name.as_str()).collect();
        assert_eq!(active, vec!["dupont.marie"]);
    }
}

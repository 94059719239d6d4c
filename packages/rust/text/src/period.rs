//! Billing-period extraction from page text and from file/folder names.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use payslip_shared::{ExtractConfig, PayslipError, Period, Result};

// ---------------------------------------------------------------------------
// Body text
// ---------------------------------------------------------------------------

/// Finds the labelled pay period in extracted page text.
#[derive(Debug, Clone)]
pub struct PeriodExtractor {
    pattern: Regex,
    scan_pages: usize,
}

impl PeriodExtractor {
    /// Compile the configured period pattern.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let pattern = Regex::new(&config.period_pattern).map_err(|e| {
            PayslipError::config(format!("invalid period_pattern: {e}"))
        })?;
        if pattern.captures_len() < 2 {
            return Err(PayslipError::config(
                "period_pattern must capture the DD/MM/YYYY date in group 1",
            ));
        }

        Ok(Self {
            pattern,
            scan_pages: config.scan_pages,
        })
    }

    /// Period of the first labelled date in `text`, as `YYYY-MM`.
    pub fn extract(&self, text: &str) -> Option<Period> {
        let caps = self.pattern.captures(text)?;
        let date = caps.get(1)?.as_str();
        parse_day_month_year(date)
    }

    /// First period found among the leading pages, in page order.
    pub fn extract_from_pages<'a, I>(&self, texts: I) -> Option<Period>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let found = texts
            .into_iter()
            .take(self.scan_pages)
            .enumerate()
            .find_map(|(index, text)| self.extract(text).map(|p| (index, p)));

        match found {
            Some((index, period)) => {
                debug!(page = index, %period, "pay period found");
                Some(period)
            }
            None => {
                debug!(scan_pages = self.scan_pages, "no pay period in leading pages");
                None
            }
        }
    }
}

/// `DD/MM/YYYY` → month period.
fn parse_day_month_year(date: &str) -> Option<Period> {
    let mut parts = date.split('/');
    let _day = parts.next()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let year: u16 = parts.next()?.parse().ok()?;
    Period::month(year, month)
}

// ---------------------------------------------------------------------------
// File and folder names
// ---------------------------------------------------------------------------

static YEAR_DASH_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})[-_](\d{2})").expect("valid regex"));

static MONTH_DASH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})[-_](\d{4})").expect("valid regex"));

static YEAR_MONTH_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})(\d{2})(?:\D|$)").expect("valid regex"));

static BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").expect("valid regex"));

/// Period encoded in a file or folder name.
///
/// Patterns are tried in order, each on its first match only:
/// `YYYY-MM`/`YYYY_MM`, `MM-YYYY`/`MM_YYYY`, `YYYYMM`, then a bare year in
/// 2000–2099. A month outside 1–12 rejects the pattern and moves on.
pub fn extract_period_from_name(name: &str) -> Option<Period> {
    if let Some(caps) = YEAR_DASH_MONTH.captures(name) {
        if let Some(p) = month_period(&caps[1], &caps[2]) {
            return Some(p);
        }
    }

    if let Some(caps) = MONTH_DASH_YEAR.captures(name) {
        if let Some(p) = month_period(&caps[2], &caps[1]) {
            return Some(p);
        }
    }

    if let Some(caps) = YEAR_MONTH_DIGITS.captures(name) {
        if let Some(p) = month_period(&caps[1], &caps[2]) {
            return Some(p);
        }
    }

    let caps = BARE_YEAR.captures(name)?;
    let year: u16 = caps[1].parse().ok()?;
    (2000..=2099).contains(&year).then_some(Period::Year(year))
}

fn month_period(year: &str, month: &str) -> Option<Period> {
    Period::month(year.parse().ok()?, month.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PeriodExtractor {
        PeriodExtractor::new(&ExtractConfig::default()).expect("default pattern compiles")
    }

    #[test]
    fn period_from_labelled_phrase() {
        let text = "BULLETIN DE PAIE\nPériode de paie : du 01/09/2025 au 30/09/2025\nDupont Marie";
        assert_eq!(extractor().extract(text).map(|p| p.to_string()).as_deref(), Some("2025-09"));
    }

    #[test]
    fn period_tolerates_decomposed_accent_and_spacing() {
        let text = "PE\u{301}RIODE DE PAIE:du 01/02/2024 au 29/02/2024";
        assert_eq!(extractor().extract(text), Period::month(2024, 2));
    }

    #[test]
    fn period_absent() {
        assert!(extractor().extract("Net à payer : 1 234,56").is_none());
        assert!(extractor().extract("").is_none());
    }

    #[test]
    fn first_page_with_match_wins() {
        let pages = [
            "cover page",
            "Période de paie : du 01/03/2024 au 31/03/2024",
            "Période de paie : du 01/04/2024 au 30/04/2024",
        ];
        assert_eq!(extractor().extract_from_pages(pages), Period::month(2024, 3));
    }

    #[test]
    fn only_first_five_pages_are_scanned() {
        let mut pages = vec!["nothing here"; 5];
        pages.push("Période de paie : du 01/09/2025 au 30/09/2025");
        assert!(extractor().extract_from_pages(pages).is_none());
    }

    #[test]
    fn pattern_without_group_is_rejected() {
        let config = ExtractConfig {
            period_pattern: r"\d{2}/\d{2}/\d{4}".into(),
            scan_pages: 5,
        };
        assert!(PeriodExtractor::new(&config).is_err());

        let config = ExtractConfig {
            period_pattern: "(unclosed".into(),
            scan_pages: 5,
        };
        assert!(PeriodExtractor::new(&config).is_err());
    }

    #[test]
    fn name_patterns() {
        let cases = [
            ("bulletin_2024-03.pdf", Some("2024-03")),
            ("03-2024_paie.pdf", Some("2024-03")),
            ("202403_fiche.pdf", Some("2024-03")),
            ("rapport_2024.pdf", Some("2024")),
            ("Paie 2023_11", Some("2023-11")),
            ("scan.pdf", None),
            ("facture_1999.pdf", None),
        ];
        for (name, expected) in cases {
            let got = extract_period_from_name(name).map(|p| p.to_string());
            assert_eq!(got.as_deref(), expected, "for {name}");
        }
    }

    #[test]
    fn invalid_month_falls_through_to_next_pattern() {
        // 2024-13 is not a month; MM-YYYY finds nothing; YYYYMM finds nothing;
        // the bare year still applies.
        assert_eq!(extract_period_from_name("export_2024-13.pdf"), Some(Period::Year(2024)));
    }
}

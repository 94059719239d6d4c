//! Document-type detection from file and folder names.

use payslip_shared::DocType;

/// Checked first: "part" alone is enough to classify as participation.
const PARTICIPATION_KEYWORDS: &[&str] = &["participation", "particip", "part"];

const PAYSLIP_KEYWORDS: &[&str] = &["fiche", "bulletin", "paie", "salaire", "bp", "salari"];

/// Detect the document type from a keyword, if any keyword is present.
pub fn detect_doc_type(text: &str) -> Option<DocType> {
    let lower = text.to_lowercase();

    if PARTICIPATION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(DocType::Participation);
    }
    if PAYSLIP_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(DocType::PaySlip);
    }
    None
}

/// Like [`detect_doc_type`], defaulting to a pay slip.
pub fn extract_doc_type(text: &str) -> DocType {
    detect_doc_type(text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participation_checked_before_payslip() {
        assert_eq!(extract_doc_type("Participation 2024"), DocType::Participation);
        // Contains both "bulletin" and "part"
        assert_eq!(extract_doc_type("bulletin_part_2024.pdf"), DocType::Participation);
    }

    #[test]
    fn payslip_keywords() {
        assert_eq!(detect_doc_type("BULLETIN_2024-03.pdf"), Some(DocType::PaySlip));
        assert_eq!(detect_doc_type("Salaires 2023"), Some(DocType::PaySlip));
        assert_eq!(detect_doc_type("BP mars"), Some(DocType::PaySlip));
    }

    #[test]
    fn defaults_to_payslip() {
        assert_eq!(detect_doc_type("2024-03.pdf"), None);
        assert_eq!(extract_doc_type("2024-03.pdf"), DocType::PaySlip);
        assert_eq!(extract_doc_type(""), DocType::PaySlip);
    }
}

//! Page attribution: which pages mention which employee.

use tracing::{debug, instrument};

use payslip_text::{clean_for_match, normalize};

use crate::roster::Identity;

/// One scanned page.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub raw_text: String,
    pub normalized_text: String,
}

impl Page {
    pub fn new(index: usize, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = normalize(&raw_text);
        Self {
            index,
            raw_text,
            normalized_text,
        }
    }
}

/// Pages attributed to one identity, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub identity: Identity,
    pub pages: Vec<usize>,
}

/// Result of [`attribute`]: identities with at least one page, in roster order.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    assignments: Vec<Assignment>,
    unattributed: Vec<usize>,
}

impl Attribution {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn pages_for(&self, full_name: &str) -> Option<&[usize]> {
        self.assignments
            .iter()
            .find(|a| a.identity.full_name == full_name)
            .map(|a| a.pages.as_slice())
    }

    /// Pages that matched nobody.
    pub fn unattributed(&self) -> &[usize] {
        &self.unattributed
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

struct Tokens {
    last: String,
    first: String,
}

impl Tokens {
    fn matches(&self, cleaned_page: &str) -> bool {
        cleaned_page.contains(&self.last)
            && (self.first.is_empty() || cleaned_page.contains(&self.first))
    }
}

/// Attribute every page to every identity whose last and first tokens it contains.
///
/// Every page is tested against every identity; a page may belong to several.
#[instrument(skip_all, fields(pages = pages.len(), identities = identities.len()))]
pub fn attribute(pages: &[Page], identities: &[Identity]) -> Attribution {
    let tokens: Vec<Tokens> = identities
        .iter()
        .map(|identity| Tokens {
            last: clean_for_match(&identity.normalized_last),
            first: clean_for_match(&identity.normalized_first),
        })
        .collect();

    let mut per_identity: Vec<Vec<usize>> = vec![Vec::new(); identities.len()];
    let mut unattributed = Vec::new();

    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);

    for page in ordered {
        let cleaned = clean_for_match(&page.normalized_text);
        let mut matched = false;
        for (slot, token) in per_identity.iter_mut().zip(&tokens) {
            if token.matches(&cleaned) {
                slot.push(page.index);
                matched = true;
            }
        }
        if !matched {
            debug!(page = page.index + 1, "page matches no identity");
            unattributed.push(page.index);
        }
    }

    let assignments = identities
        .iter()
        .zip(per_identity)
        .filter(|(_, pages)| !pages.is_empty())
        .map(|(identity, pages)| Assignment {
            identity: identity.clone(),
            pages,
        })
        .collect();

    Attribution {
        assignments,
        unattributed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::parse_name;

    fn identity(raw: &str) -> Identity {
        Identity::from_name(&parse_name(raw).unwrap())
    }

    fn pages(texts: &[&str]) -> Vec<Page> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i, *t))
            .collect()
    }

    #[test]
    fn requires_both_tokens() {
        let identities = vec![identity("dupont.marie")];
        let attribution = attribute(
            &pages(&["Salarié : DUPONT Jean", "Salarié : MARTIN Marie", "Mme Marie Dupont"]),
            &identities,
        );
        assert_eq!(attribution.pages_for("Dupont Marie"), Some(&[2][..]));
        assert_eq!(attribution.unattributed(), &[0, 1]);
    }

    #[test]
    fn ignores_accents_spaces_and_hyphens() {
        let identities = vec![identity("le-gall.anne-sophie"), identity("lefèvre.hélène")];
        let attribution = attribute(
            &pages(&["LE GALL ANNE SOPHIE", "Lefevre\u{00AD}Helene", "LEGALL AnneSophie"]),
            &identities,
        );
        assert_eq!(attribution.pages_for("Le-gall Anne-sophie"), Some(&[0, 2][..]));
        assert_eq!(attribution.pages_for("Lefèvre Hélène"), Some(&[1][..]));
    }

    #[test]
    fn shared_pages_go_to_everyone() {
        let identities = vec![identity("dupont.marie"), identity("martin.paul")];
        let attribution = attribute(
            &pages(&["Dupont Marie", "Récapitulatif: Dupont Marie, Martin Paul", "Martin Paul"]),
            &identities,
        );
        assert_eq!(attribution.pages_for("Dupont Marie"), Some(&[0, 1][..]));
        assert_eq!(attribution.pages_for("Martin Paul"), Some(&[1, 2][..]));
    }

    #[test]
    fn pages_are_strictly_increasing_and_empty_identities_omitted() {
        let identities = vec![
            identity("durand.lea"),
            identity("dupont.marie"),
            identity("absent.nobody"),
        ];
        let mut input = pages(&["Durand Lea", "Dupont Marie", "Durand Lea", "x", "Dupont Marie"]);
        input.reverse();

        let attribution = attribute(&input, &identities);
        let names: Vec<&str> = attribution
            .assignments()
            .iter()
            .map(|a| a.identity.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Durand Lea", "Dupont Marie"]);
        for assignment in attribution.assignments() {
            assert!(assignment.pages.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(attribution.pages_for("Durand Lea"), Some(&[0, 2][..]));
    }

    #[test]
    fn empty_first_name_matches_on_last_name() {
        let identities = vec![identity("dupont.")];
        let attribution = attribute(&pages(&["DUPONT Jean", "MARTIN Paul"]), &identities);
        assert_eq!(attribution.pages_for("Dupont"), Some(&[0][..]));
    }

    #[test]
    fn nothing_to_attribute() {
        assert!(attribute(&pages(&["a", "b"]), &[]).is_empty());
        assert!(attribute(&[], &[identity("dupont.marie")]).is_empty());
    }
}

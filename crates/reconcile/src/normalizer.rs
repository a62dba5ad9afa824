use kakeibo_core::{CategoryHierarchy, Side};
use serde::{Deserialize, Serialize};

use crate::util::{edit_distance, folded_chars};

/// Which rule resolved a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum MatchRule {
    Exact,
    /// One `&`- or `/`-separated fragment matched exactly.
    Compound,
    Substring,
    Fuzzy { distance: usize },
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The canonical name, or the input label untouched when unresolved.
    pub name: String,
    pub rule: MatchRule,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.rule != MatchRule::Unresolved
    }
}

struct Canonical {
    name: String,
    trimmed: String,
    folded: String,
    chars: Vec<char>,
}

/// Maps free-form category labels (AI suggestions, CSV imports, manual
/// entry) onto a fixed set of canonical names.
///
/// Rules are tried in order and the first hit wins: exact (case-insensitive,
/// trimmed), compound fragment, substring containment, then bounded
/// Levenshtein. A label nothing accepts comes back unchanged.
pub struct CategoryNormalizer {
    canonical: Vec<Canonical>,
}

impl CategoryNormalizer {
    /// Blank names and repeated spellings are skipped. Case variants of one
    /// name are all kept.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut canonical: Vec<Canonical> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let trimmed = name.trim();
            if trimmed.is_empty() || canonical.iter().any(|c| c.trimmed == trimmed) {
                continue;
            }
            let folded = trimmed.to_lowercase();
            canonical.push(Canonical {
                name: name.to_string(),
                trimmed: trimmed.to_string(),
                chars: folded.chars().collect(),
                folded,
            });
        }
        Self { canonical }
    }

    pub fn from_hierarchy(hierarchy: &CategoryHierarchy, side: Side) -> Self {
        Self::new(hierarchy.flat_names(side))
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn resolve(&self, label: &str) -> Resolution {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return unresolved(label);
        }
        let folded = trimmed.to_lowercase();

        if let Some(c) = self.exact(trimmed, &folded) {
            return resolved(c, MatchRule::Exact);
        }

        if trimmed.contains(is_separator) {
            let hit = trimmed
                .split(is_separator)
                .map(str::trim)
                .filter(|fragment| !fragment.is_empty())
                .find_map(|fragment| self.exact(fragment, &fragment.to_lowercase()));
            if let Some(c) = hit {
                return resolved(c, MatchRule::Compound);
            }
        }

        if let Some(c) = self
            .canonical
            .iter()
            .find(|c| folded.contains(c.folded.as_str()) || c.folded.contains(folded.as_str()))
        {
            return resolved(c, MatchRule::Substring);
        }

        let chars = folded_chars(trimmed);
        let mut best: Option<(&Canonical, usize)> = None;
        for c in &self.canonical {
            let distance = edit_distance(&chars, &c.chars);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((c, distance));
            }
        }
        match best {
            Some((c, distance)) if distance <= fuzzy_threshold(chars.len()) => {
                resolved(c, MatchRule::Fuzzy { distance })
            }
            _ => {
                tracing::debug!("Category label '{trimmed}' did not match any canonical name");
                unresolved(label)
            }
        }
    }

    /// String form of [`resolve`](Self::resolve): the canonical name, or the
    /// label unchanged when nothing matched.
    pub fn normalize(&self, label: &str) -> String {
        self.resolve(label).name
    }

    /// Resolves labels in order.
    pub fn normalize_all<S: AsRef<str>>(&self, labels: &[S]) -> Vec<Resolution> {
        let resolutions: Vec<Resolution> = labels.iter().map(|l| self.resolve(l.as_ref())).collect();
        let unresolved = resolutions.iter().filter(|r| !r.is_resolved()).count();
        if unresolved > 0 {
            tracing::debug!("{unresolved} of {} category labels unresolved", labels.len());
        }
        resolutions
    }

    /// Same spelling first, then any case variant.
    fn exact(&self, trimmed: &str, folded: &str) -> Option<&Canonical> {
        self.canonical
            .iter()
            .find(|c| c.trimmed == trimmed)
            .or_else(|| self.canonical.iter().find(|c| c.folded == folded))
    }
}

/// One-shot normalization against an ad-hoc canonical list.
pub fn normalize_category<S: AsRef<str>>(label: &str, canonical: &[S]) -> String {
    CategoryNormalizer::new(canonical).normalize(label)
}

/// Largest edit distance accepted for a label of `len` chars: 30% of the
/// length, but never below 2.
pub fn fuzzy_threshold(len: usize) -> usize {
    (len * 3 / 10).max(2)
}

fn is_separator(c: char) -> bool {
    c == '&' || c == '/'
}

fn resolved(c: &Canonical, rule: MatchRule) -> Resolution {
    Resolution {
        name: c.name.clone(),
        rule,
    }
}

fn unresolved(label: &str) -> Resolution {
    Resolution {
        name: label.to_string(),
        rule: MatchRule::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakeibo_core::{CategoryKind, CategoryNode};

    fn normalizer(names: &[&str]) -> CategoryNormalizer {
        CategoryNormalizer::new(names)
    }

    #[test]
    fn levenshtein_fallback_fixes_typo() {
        let n = normalizer(&["Dining", "Housing"]);
        let r = n.resolve("Dinning");
        assert_eq!(r.name, "Dining");
        assert_eq!(r.rule, MatchRule::Fuzzy { distance: 1 });
    }

    #[test]
    fn compound_label_matches_fragment() {
        let n = normalizer(&["Dining"]);
        let r = n.resolve("Food & Dining");
        assert_eq!(r.name, "Dining");
        assert_eq!(r.rule, MatchRule::Compound);
    }

    #[test]
    fn compound_splits_on_slash_and_takes_first_fragment() {
        let n = normalizer(&["Transport", "Fuel"]);
        assert_eq!(n.resolve("fuel/transport").name, "Fuel");
    }

    #[test]
    fn canonical_names_are_idempotent() {
        let names = ["Food", "Fast Food", "Dining", "Rent", "Gas & Fuel", "Kids/Education", "A"];
        let n = normalizer(&names);
        for name in names {
            assert_eq!(n.normalize(name), name, "{name} did not map to itself");
        }

        // Child names are only unique per parent, so case variants can coexist.
        let variants = ["Dining", "dining", "DINING"];
        let n = normalizer(&variants);
        for name in variants {
            assert_eq!(n.normalize(name), name, "{name} did not map to itself");
        }
        assert_eq!(n.resolve("DiNiNg").name, "Dining");
        assert_eq!(n.resolve("Food & dining").name, "dining");
    }

    #[test]
    fn exact_is_case_insensitive_and_trimmed() {
        let n = normalizer(&["Groceries"]);
        let r = n.resolve("  GROCERIES ");
        assert_eq!(r.name, "Groceries");
        assert_eq!(r.rule, MatchRule::Exact);
    }

    #[test]
    fn exact_wins_over_substring() {
        let n = normalizer(&["Fast Food", "Food"]);
        assert_eq!(n.normalize("food"), "Food");
    }

    #[test]
    fn compound_wins_over_substring() {
        // "food & dining extra" contains the label, but fragment "dining" hits first.
        let n = normalizer(&["Food & Dining Extra", "Dining"]);
        assert_eq!(n.resolve("Food & Dining").rule, MatchRule::Compound);
        assert_eq!(n.normalize("Food & Dining"), "Dining");
    }

    #[test]
    fn substring_in_both_directions() {
        let n = normalizer(&["Groceries", "Health Insurance"]);
        let r = n.resolve("Groceries at Market");
        assert_eq!((r.name.as_str(), r.rule), ("Groceries", MatchRule::Substring));
        let r = n.resolve("insurance");
        assert_eq!((r.name.as_str(), r.rule), ("Health Insurance", MatchRule::Substring));
    }

    #[test]
    fn fuzzy_threshold_scales_with_length() {
        assert_eq!(fuzzy_threshold(3), 2);
        assert_eq!(fuzzy_threshold(7), 2);
        assert_eq!(fuzzy_threshold(10), 3);
        assert_eq!(fuzzy_threshold(13), 3);
        assert_eq!(fuzzy_threshold(20), 6);

        let n = normalizer(&["Entertainment"]);
        assert_eq!(n.normalize("Entertainmnet"), "Entertainment");
    }

    #[test]
    fn distant_label_is_returned_unchanged() {
        let n = normalizer(&["Dining", "Housing"]);
        let r = n.resolve("Xyzzy");
        assert_eq!(r.name, "Xyzzy");
        assert!(!r.is_resolved());
        // Untrimmed input comes back exactly as given.
        assert_eq!(n.normalize("  Pets "), "  Pets ");
    }

    #[test]
    fn fuzzy_ties_go_to_first_canonical() {
        let n = normalizer(&["Bus", "Bug"]);
        assert_eq!(n.resolve("Bux").name, "Bus");
    }

    #[test]
    fn blank_label_is_unresolved() {
        let n = normalizer(&["Dining"]);
        assert_eq!(n.resolve("   ").rule, MatchRule::Unresolved);
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn empty_canonical_set_never_matches() {
        let n = normalizer(&[]);
        assert!(n.is_empty());
        assert_eq!(n.normalize("Dining"), "Dining");
    }

    #[test]
    fn builds_from_hierarchy() {
        let tree = vec![
            CategoryNode::parent("Food", CategoryKind::Expense, &["Dining", "Groceries"]),
            CategoryNode::parent("Salary", CategoryKind::Income, &[]),
        ];
        let h = CategoryHierarchy::from_tree(&tree).unwrap();
        let n = CategoryNormalizer::from_hierarchy(&h, Side::Expense);
        assert_eq!(n.normalize("grocerys"), "Groceries");
        assert_eq!(n.normalize("Salary"), "Salary"); // income side not loaded
        assert!(!n.resolve("Salary").is_resolved());
    }

    #[test]
    fn normalize_all_preserves_order() {
        let n = normalizer(&["Dining", "Rent"]);
        let out = n.normalize_all(&["rent", "Dinning", "???"]);
        let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Rent", "Dining", "???"]);
    }

    #[test]
    fn one_shot_helper() {
        assert_eq!(normalize_category("Food & Dining", &["Dining"]), "Dining");
    }
}

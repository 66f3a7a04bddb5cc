//! Title Validation - decide whether a listing title is the product being searched
//!
//! Two independent predicates must both hold for a title to qualify:
//! every query token occurs in the title (substring containment, not word
//! boundaries), and no deny-listed accessory/bundle term occurs in it.
//! Marketplaces can layer stricter rules on top (`StrictName`,
//! `MainMatchPolicy`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Accessory, bundle and spare-part terms shared by every marketplace
pub const DEFAULT_DENY_LIST: &[&str] = &[
    "case", "cover", "charger", "cable", "protector", "glass", "film", "adapter",
    "screen", "battery", "keyboard", "mouse", "headphones", "earbuds", "lot", "lots",
    "set", "bundle", "replacement", "pack", "accessories", "accessory", "screen protector",
    "shell", "housing", "tempered", "glue", "repair", "stand", "holder", "mount",
];

/// A search query and its lowercase whitespace tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    tokens: Vec<String>,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let tokens = raw.split_whitespace().map(str::to_lowercase).collect();
        Self { raw, tokens }
    }

    /// The query as typed (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lowercased whitespace tokens
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Lowercased query with single spaces between tokens
    pub fn phrase(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Deny-list configuration passed to the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceRules {
    deny_list: Vec<String>,
}

impl Default for RelevanceRules {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_LIST.iter().copied())
    }
}

impl RelevanceRules {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let deny_list = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { deny_list }
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// First deny-listed term found in the title, if any
    pub fn denied_term(&self, title: &str) -> Option<&str> {
        let lower = title.to_lowercase();
        self.deny_list
            .iter()
            .find(|term| lower.contains(term.as_str()))
            .map(String::as_str)
    }

    /// Token coverage AND not denied
    pub fn is_valid(&self, title: &str, query: &Query) -> bool {
        covers_query(title, query) && self.denied_term(title).is_none()
    }
}

/// Every query token appears somewhere in the lowercased title
pub fn covers_query(title: &str, query: &Query) -> bool {
    let lower = title.to_lowercase();
    query.tokens().iter().all(|token| lower.contains(token.as_str()))
}

/// Check a title against a raw query string with the given deny-list
pub fn is_valid_title(title: &str, query: &str, rules: &RelevanceRules) -> bool {
    rules.is_valid(title, &Query::new(query))
}

/// Split a title into lowercase alphanumeric words
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Source-specific name rule: the query phrase must appear verbatim and
/// the title must not carry a model qualifier the query did not ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictName {
    pub qualifiers: &'static [&'static str],
}

impl StrictName {
    pub fn matches(&self, title: &str, query: &Query) -> bool {
        let lower = title.to_lowercase();
        if !lower.contains(&query.phrase()) {
            return false;
        }

        let title_words: HashSet<String> = words(title).collect();
        self.qualifiers.iter().all(|q| {
            query.tokens().iter().any(|t| t == q) || !title_words.contains(*q)
        })
    }
}

/// How aggressively a marketplace narrows candidates to the main product
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainMatchPolicy {
    /// Keep every validated candidate
    #[default]
    Off,
    /// Keep only titles containing all query tokens as whole tokens, with
    /// the fewest extra tokens
    MostConcise,
}

impl MainMatchPolicy {
    /// Apply the policy. An empty selection falls back to the input.
    pub fn apply<T, F>(self, items: Vec<T>, query: &Query, title_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        match self {
            MainMatchPolicy::Off => items,
            MainMatchPolicy::MostConcise => most_concise(items, query, title_of),
        }
    }
}

fn most_concise<T, F>(items: Vec<T>, query: &Query, title_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let query_words: HashSet<&str> = query.tokens().iter().map(String::as_str).collect();

    // Extra-token count per item, None when a query token is missing
    let extras: Vec<Option<usize>> = items
        .iter()
        .map(|item| {
            let name_words: HashSet<String> = title_of(item)
                .split_whitespace()
                .map(str::to_lowercase)
                .collect();
            if query_words.iter().all(|w| name_words.contains(*w)) {
                Some(name_words.iter().filter(|w| !query_words.contains(w.as_str())).count())
            } else {
                None
            }
        })
        .collect();

    let Some(min_extra) = extras.iter().flatten().min().copied() else {
        return items;
    };

    items
        .into_iter()
        .zip(extras)
        .filter(|(_, extra)| *extra == Some(min_extra))
        .map(|(item, _)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_term_beats_token_match() {
        let rules = RelevanceRules::default();
        assert!(!is_valid_title("iPhone 15 Pro Case", "iphone 15", &rules));
        assert_eq!(rules.denied_term("iPhone 15 Pro Case"), Some("case"));
    }

    #[test]
    fn test_valid_title() {
        let rules = RelevanceRules::default();
        assert!(is_valid_title("Apple iPhone 15 128GB", "iphone 15", &rules));
    }

    #[test]
    fn test_missing_token() {
        let rules = RelevanceRules::default();
        assert!(!is_valid_title("Samsung Galaxy S23", "iphone 15", &rules));
    }

    #[test]
    fn test_substring_tokens_allow_partial_words() {
        let rules = RelevanceRules::default();
        // "15" is contained in "150", which is intentional
        assert!(is_valid_title("Apple iPhone 150 Edition", "iphone 15", &rules));
    }

    #[test]
    fn test_custom_deny_list() {
        let rules = RelevanceRules::new(["Refurbished", "  "]);
        assert_eq!(rules.deny_list(), &["refurbished".to_string()]);
        assert!(is_valid_title("iPhone 15 Silicone Case", "iphone 15", &rules));
        assert!(!is_valid_title("iPhone 15 (Refurbished)", "iphone 15", &rules));
    }

    #[test]
    fn test_empty_query_only_checks_deny_list() {
        let rules = RelevanceRules::default();
        assert!(is_valid_title("Anything at all", "", &rules));
        assert!(!is_valid_title("USB cable", "   ", &rules));
    }

    #[test]
    fn test_strict_name_rejects_qualifiers() {
        let strict = StrictName { qualifiers: &["pro", "max"] };
        let query = Query::new("iPhone 15");
        assert!(strict.matches("Apple iPhone 15 (Blue, 128 GB)", &query));
        assert!(!strict.matches("Apple iPhone 15 Pro (Black, 256 GB)", &query));
        assert!(!strict.matches("Apple iPhone 15 Pro Max", &query));
        // Query phrase must appear verbatim
        assert!(!strict.matches("Apple 15 iPhone", &query));
    }

    #[test]
    fn test_strict_name_allows_requested_qualifier() {
        let strict = StrictName { qualifiers: &["pro", "max"] };
        let query = Query::new("iphone 15 pro");
        assert!(strict.matches("Apple iPhone 15 Pro (Black)", &query));
        assert!(!strict.matches("Apple iPhone 15 Pro Max (Black)", &query));
    }

    #[test]
    fn test_strict_name_ignores_qualifier_inside_words() {
        let strict = StrictName { qualifiers: &["pro", "max"] };
        let query = Query::new("iphone 15");
        assert!(strict.matches("Apple iPhone 15 (PRODUCT)RED", &query));
    }

    #[test]
    fn test_most_concise_keeps_ties() {
        let query = Query::new("iphone 15");
        let titles = vec![
            "Apple iPhone 15 Blue",
            "Apple iPhone 15 Black",
            "Apple iPhone 15 128GB Green",
            "iPhone15 Apple",
        ];
        let kept = MainMatchPolicy::MostConcise.apply(titles, &query, |t| *t);
        assert_eq!(kept, vec!["Apple iPhone 15 Blue", "Apple iPhone 15 Black"]);
    }

    #[test]
    fn test_most_concise_falls_back_when_nothing_matches() {
        let query = Query::new("iphone 15");
        let titles = vec!["Apple iPhone15 Blue", "iPhone-15 Black"];
        let kept = MainMatchPolicy::MostConcise.apply(titles.clone(), &query, |t| *t);
        assert_eq!(kept, titles);
    }

    #[test]
    fn test_main_match_off_is_identity() {
        let query = Query::new("iphone 15");
        let titles = vec!["b", "a"];
        assert_eq!(MainMatchPolicy::Off.apply(titles.clone(), &query, |t| *t), titles);
    }

    #[test]
    fn test_query_tokens() {
        let query = Query::new("  iPhone   15 ");
        assert_eq!(query.raw(), "iPhone   15");
        assert_eq!(query.tokens(), &["iphone".to_string(), "15".to_string()]);
        assert_eq!(query.phrase(), "iphone 15");
    }
}

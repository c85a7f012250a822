//! Text-similarity strategies for alternate matching.
//!
//! When a recorded locator stops resolving, the resolver looks for elements
//! whose text, accessibility label or identifier resembles the entry's
//! label. How "resembles" is decided is a [`TextMatcher`], so the resolver
//! never needs to change when the similarity function does.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher as _;
use serde::{Deserialize, Serialize};

use crate::element::ElementNode;

/// Decides whether an element resembles a target label.
pub trait TextMatcher: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Returns true if `node` matches `target`. `target` is never empty.
    fn matches(&self, node: &ElementNode, target: &str) -> bool;
}

/// Which [`TextMatcher`] to use, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    #[default]
    Contains,
    Fuzzy,
}

impl MatcherKind {
    /// Builds the matcher this kind names.
    pub fn build(self, fuzzy_min_score: i64) -> Box<dyn TextMatcher> {
        match self {
            MatcherKind::Contains => Box::new(ContainsMatcher),
            MatcherKind::Fuzzy => Box::new(FuzzyMatcher::new(fuzzy_min_score)),
        }
    }
}

impl std::str::FromStr for MatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Ok(MatcherKind::Contains),
            "fuzzy" => Ok(MatcherKind::Fuzzy),
            other => Err(format!("unknown matcher '{}' (expected contains or fuzzy)", other)),
        }
    }
}

fn searchable_fields(node: &ElementNode) -> [&str; 3] {
    [node.text.as_str(), node.content_desc.as_str(), node.resource_id.as_str()]
}

/// Case-insensitive substring containment on text, label and identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsMatcher;

impl TextMatcher for ContainsMatcher {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn matches(&self, node: &ElementNode, target: &str) -> bool {
        let target = target.to_lowercase();
        searchable_fields(node)
            .iter()
            .any(|field| !field.is_empty() && field.to_lowercase().contains(&target))
    }
}

/// Skim-style fuzzy matching with a minimum score.
///
/// Tolerates small differences such as `"Sign in"` vs `"signIn_button"`
/// that plain containment misses.
pub struct FuzzyMatcher {
    matcher: SkimMatcherV2,
    min_score: i64,
}

impl FuzzyMatcher {
    /// Default minimum score. Roughly "most characters present, in order".
    pub const DEFAULT_MIN_SCORE: i64 = 40;

    pub fn new(min_score: i64) -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
            min_score,
        }
    }

    /// Scores a field against the target; `None` if the characters do not
    /// appear in order.
    pub fn score(&self, field: &str, target: &str) -> Option<i64> {
        self.matcher.fuzzy_match(field, target)
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_SCORE)
    }
}

impl TextMatcher for FuzzyMatcher {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn matches(&self, node: &ElementNode, target: &str) -> bool {
        searchable_fields(node).iter().any(|field| {
            !field.is_empty()
                && self
                    .score(field, target)
                    .is_some_and(|score| score >= self.min_score)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str, desc: &str, id: &str) -> ElementNode {
        ElementNode {
            tag_name: "android.widget.Button".to_string(),
            text: text.to_string(),
            content_desc: desc.to_string(),
            resource_id: id.to_string(),
            clickable: true,
            enabled: true,
            index: 0,
            path: "/hierarchy[1]/android.widget.Button[1]".to_string(),
            bounds: None,
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        let m = ContainsMatcher;
        assert!(m.matches(&node("Submit Order", "", ""), "submit"));
        assert!(m.matches(&node("", "SUBMIT", ""), "Submit"));
        assert!(m.matches(&node("", "", "com.app:id/submitBtn"), "submit"));
        assert!(!m.matches(&node("Cancel", "", ""), "submit"));
    }

    #[test]
    fn contains_ignores_empty_fields() {
        assert!(!ContainsMatcher.matches(&node("", "", ""), "x"));
    }

    #[test]
    fn fuzzy_tolerates_gaps() {
        let m = FuzzyMatcher::default();
        assert!(m.matches(&node("", "", "com.app:id/signIn_button"), "signin"));
        assert!(!m.matches(&node("Cancel", "", ""), "submit"));
    }

    #[test]
    fn fuzzy_min_score_is_respected() {
        let strict = FuzzyMatcher::new(i64::MAX);
        assert!(!strict.matches(&node("Submit", "", ""), "Submit"));
    }

    #[test]
    fn matcher_kind_from_str() {
        assert_eq!("Contains".parse::<MatcherKind>(), Ok(MatcherKind::Contains));
        assert_eq!("fuzzy".parse::<MatcherKind>(), Ok(MatcherKind::Fuzzy));
        assert!("levenshtein".parse::<MatcherKind>().is_err());
    }

    #[test]
    fn matcher_kind_builds_named_matcher() {
        assert_eq!(MatcherKind::Contains.build(0).name(), "contains");
        assert_eq!(MatcherKind::Fuzzy.build(0).name(), "fuzzy");
    }
}

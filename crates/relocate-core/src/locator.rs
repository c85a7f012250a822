//! Locator candidate synthesis.
//!
//! [`synthesize`] turns one [`ElementNode`] into a [`CandidateMap`]: an
//! ordered mapping from Appium locator strategy to selector string, most
//! reliable strategy first. Synthesis is a pure function of the node, so the
//! same node always yields byte-identical selectors. The resolution engine
//! relies on that to detect selector reuse by plain string equality.
//!
//! # Priority
//!
//! | Android | iOS |
//! |---|---|
//! | `id` (resource-id) | `id` (name) |
//! | `accessibility id` (content-desc) | `accessibility id` (name) |
//! | `-android uiautomator` | `-ios predicate string`, `-ios class chain` |
//! | `xpath` by tag + attribute | `xpath` by tag + attribute |
//! | `xpath` by structural path | `xpath` by structural path |

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::element::{ElementNode, Platform};

/// A locator strategy, named as Appium names it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocatorStrategy {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "accessibility id")]
    AccessibilityId,
    #[serde(rename = "-android uiautomator")]
    AndroidUiAutomator,
    #[serde(rename = "-ios predicate string")]
    IosPredicate,
    #[serde(rename = "-ios class chain")]
    IosClassChain,
    #[serde(rename = "xpath")]
    XPath,
}

impl LocatorStrategy {
    /// All strategies, in no particular order.
    pub const ALL: [LocatorStrategy; 6] = [
        LocatorStrategy::Id,
        LocatorStrategy::AccessibilityId,
        LocatorStrategy::AndroidUiAutomator,
        LocatorStrategy::IosPredicate,
        LocatorStrategy::IosClassChain,
        LocatorStrategy::XPath,
    ];

    /// The strategy name Appium expects in the `using` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::AccessibilityId => "accessibility id",
            LocatorStrategy::AndroidUiAutomator => "-android uiautomator",
            LocatorStrategy::IosPredicate => "-ios predicate string",
            LocatorStrategy::IosClassChain => "-ios class chain",
            LocatorStrategy::XPath => "xpath",
        }
    }

    /// Parses a strategy name as humans tend to write it in locator files.
    ///
    /// Accepts the Appium wire names plus common spellings such as
    /// `ID`, `accessibilityId`, `accessibility_id`, `uiautomator`,
    /// `predicate` and `classChain`.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_start_matches('-')
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "id" | "resourceid" => Some(LocatorStrategy::Id),
            "accessibilityid" | "accessid" | "a11yid" => Some(LocatorStrategy::AccessibilityId),
            "androiduiautomator" | "uiautomator" => Some(LocatorStrategy::AndroidUiAutomator),
            "iospredicatestring" | "predicatestring" | "predicate" | "iospredicate" => {
                Some(LocatorStrategy::IosPredicate)
            }
            "iosclasschain" | "classchain" => Some(LocatorStrategy::IosClassChain),
            "xpath" => Some(LocatorStrategy::XPath),
            _ => None,
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesized locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorCandidate {
    pub strategy: LocatorStrategy,
    pub selector: String,
}

/// Ordered strategy -> selector mapping for one element.
///
/// Keys are unique and kept in priority order. Serializes as a JSON object
/// whose key order is that priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateMap {
    candidates: Vec<LocatorCandidate>,
}

impl CandidateMap {
    /// Appends a candidate unless the strategy is already present or the
    /// selector is empty.
    fn push(&mut self, strategy: LocatorStrategy, selector: String) {
        if selector.is_empty() || self.get(strategy).is_some() {
            return;
        }
        self.candidates.push(LocatorCandidate { strategy, selector });
    }

    /// Returns the selector for a strategy, if that strategy applies.
    pub fn get(&self, strategy: LocatorStrategy) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| c.strategy == strategy)
            .map(|c| c.selector.as_str())
    }

    /// Iterates candidates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &LocatorCandidate> {
        self.candidates.iter()
    }

    /// Returns true if any candidate selector is byte-identical to `selector`.
    pub fn contains_selector(&self, selector: &str) -> bool {
        self.candidates.iter().any(|c| c.selector == selector)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl Serialize for CandidateMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.candidates.len()))?;
        for c in &self.candidates {
            map.serialize_entry(c.strategy.as_str(), &c.selector)?;
        }
        map.end()
    }
}

/// Synthesizes the locator candidates of one element.
///
/// A strategy is included only when its backing attribute is non-empty.
/// `xpath` is always present: by tag and attribute when the element has a
/// discriminating attribute, otherwise by its structural path.
pub fn synthesize(node: &ElementNode, platform: Platform) -> CandidateMap {
    match platform {
        Platform::Android => synthesize_android(node),
        Platform::Ios => synthesize_ios(node),
    }
}

fn synthesize_android(node: &ElementNode) -> CandidateMap {
    let mut map = CandidateMap::default();
    map.push(LocatorStrategy::Id, node.resource_id.clone());
    map.push(LocatorStrategy::AccessibilityId, node.content_desc.clone());

    let ui_selector = [
        ("text", &node.text),
        ("description", &node.content_desc),
        ("resourceId", &node.resource_id),
    ]
    .into_iter()
    .find(|(_, value)| !value.is_empty())
    .map(|(method, value)| {
        format!(
            "new UiSelector().className({}).{}({})",
            quoted_string(&node.tag_name),
            method,
            quoted_string(value)
        )
    });
    if let Some(selector) = ui_selector {
        map.push(LocatorStrategy::AndroidUiAutomator, selector);
    }

    let xpath = [
        ("resource-id", &node.resource_id),
        ("content-desc", &node.content_desc),
        ("text", &node.text),
    ]
    .into_iter()
    .find(|(_, value)| !value.is_empty())
    .map(|(attr, value)| format!("//{}[@{}={}]", node.tag_name, attr, xpath_literal(value)));
    map.push(LocatorStrategy::XPath, xpath.unwrap_or_else(|| node.path.clone()));
    map
}

fn synthesize_ios(node: &ElementNode) -> CandidateMap {
    let mut map = CandidateMap::default();
    map.push(LocatorStrategy::Id, node.resource_id.clone());
    // XCUITest resolves accessibility id against `name`.
    map.push(LocatorStrategy::AccessibilityId, node.resource_id.clone());

    let anchor = [
        ("name", &node.resource_id),
        ("label", &node.content_desc),
        ("value", &node.text),
    ]
    .into_iter()
    .find(|(_, value)| !value.is_empty());

    if let Some((attr, value)) = anchor {
        let quoted = quoted_string(value);
        map.push(
            LocatorStrategy::IosPredicate,
            format!("type == {} AND {} == {}", quoted_string(&node.tag_name), attr, quoted),
        );
        map.push(
            LocatorStrategy::IosClassChain,
            format!("**/{}[`{} == {}`]", node.tag_name, attr, quoted),
        );
        map.push(
            LocatorStrategy::XPath,
            format!("//{}[@{}={}]", node.tag_name, attr, xpath_literal(value)),
        );
    } else {
        map.push(LocatorStrategy::XPath, node.path.clone());
    }
    map
}

/// Quotes a value as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so values containing both quote kinds are
/// assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value
            .split('"')
            .map(|part| format!("\"{}\"", part))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Double-quotes a value, escaping backslashes and double quotes.
///
/// Shared by UiSelector, NSPredicate and class chain selectors, which all
/// use C-style escapes inside double quotes.
fn quoted_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

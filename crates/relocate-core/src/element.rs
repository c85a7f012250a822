//! Normalized UI element types shared by Android and iOS page sources.
//!
//! This module defines the data structures representing UI elements parsed
//! from a page-source tree. Android UiAutomator2 and iOS XCUITest name their
//! attributes differently; both are normalized into [`ElementNode`] so that
//! locator synthesis and matching never have to care which platform produced
//! a node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The mobile platform a page source was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Android, driven through UiAutomator2 / Espresso.
    Android,
    /// iOS, driven through XCUITest.
    Ios,
}

impl Platform {
    /// Maps an Appium `automationName` capability to a platform.
    ///
    /// Matching is case-insensitive. Returns `None` for automation names that
    /// belong to neither platform (e.g. `Mac2`, `Windows`).
    pub fn from_automation_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "uiautomator2" | "uiautomator" | "espresso" | "selendroid" | "android" => {
                Some(Platform::Android)
            }
            "xcuitest" | "instruments" | "ios" => Some(Platform::Ios),
            _ => None,
        }
    }

    /// Returns the lowercase platform name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_automation_name(s).ok_or_else(|| format!("unknown platform '{}'", s))
    }
}

/// A UI element from a page-source tree, normalized across platforms.
///
/// Nodes are created by [`parse_page_source`](crate::page_source::parse_page_source)
/// and never mutated afterwards. They live as long as the
/// [`Snapshot`](crate::snapshot::Snapshot) that owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    /// The element class (Android `class`, iOS `type`).
    pub tag_name: String,

    /// Visible text (Android `text`, iOS `value`). May be empty.
    pub text: String,

    /// Accessibility annotation (Android `content-desc`, iOS `label`). May be empty.
    pub content_desc: String,

    /// Platform identifier (Android `resource-id`, iOS `name`). May be empty.
    pub resource_id: String,

    /// Whether the element accepts taps.
    pub clickable: bool,

    /// Whether the element is enabled.
    pub enabled: bool,

    /// 0-based position among the element siblings under the same parent.
    pub index: usize,

    /// Absolute structural XPath of this element, e.g.
    /// `/hierarchy[1]/android.widget.FrameLayout[1]/android.widget.Button[2]`.
    ///
    /// Positions are 1-based among siblings sharing the same XML element name.
    pub path: String,

    /// On-screen rectangle, if the page source reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl ElementNode {
    /// Returns true if the element carries anything a locator could anchor on
    /// besides its position in the tree.
    pub fn is_identifiable(&self) -> bool {
        !self.text.is_empty() || !self.content_desc.is_empty() || !self.resource_id.is_empty()
    }
}

/// The rectangle of a UI element in screen coordinates.
///
/// Used as metadata only; never as a locator strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// The x-coordinate of the top-left corner.
    pub x: i32,
    /// The y-coordinate of the top-left corner.
    pub y: i32,
    /// The width in pixels (Android) or points (iOS).
    pub width: i32,
    /// The height in pixels (Android) or points (iOS).
    pub height: i32,
}

impl Bounds {
    /// Parses an Android bounds attribute of the form `[x1,y1][x2,y2]`.
    pub fn from_android(raw: &str) -> Option<Self> {
        let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
        let (first, second) = inner.split_once("][")?;
        let (x1, y1) = parse_pair(first)?;
        let (x2, y2) = parse_pair(second)?;
        Some(Self {
            x: x1,
            y: y1,
            width: x2.checked_sub(x1)?,
            height: y2.checked_sub(y1)?,
        })
    }

    /// Builds bounds from iOS `x`, `y`, `width`, `height` attributes.
    ///
    /// XCUITest reports integral values, but fractional ones are truncated.
    pub fn from_ios(x: &str, y: &str, width: &str, height: &str) -> Option<Self> {
        let num = |s: &str| s.trim().parse::<f64>().ok().map(|v| v as i32);
        Some(Self {
            x: num(x)?,
            y: num(y)?,
            width: num(width)?,
            height: num(height)?,
        })
    }
}

fn parse_pair(s: &str) -> Option<(i32, i32)> {
    let (a, b) = s.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

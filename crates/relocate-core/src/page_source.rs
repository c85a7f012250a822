//! Page-source parsing into normalized [`ElementNode`]s.
//!
//! Appium returns the current screen as an XML document: UiAutomator2 uses
//! `<hierarchy>` with one element per `android.*` widget, XCUITest wraps an
//! `XCUIElementTypeApplication` tree in `<AppiumAUT>`. [`parse_page_source`]
//! walks either format with a pull parser and emits a flat, document-ordered
//! list of nodes.
//!
//! # Example
//!
//! ```
//! use relocate_core::element::Platform;
//! use relocate_core::page_source::parse_page_source;
//!
//! let xml = r#"<hierarchy><android.widget.Button text="Submit" clickable="true"/></hierarchy>"#;
//! let nodes = parse_page_source(xml, Platform::Android).unwrap();
//! assert_eq!(nodes.len(), 2);
//! assert_eq!(nodes[1].text, "Submit");
//! ```

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::trace;

use crate::element::{Bounds, ElementNode, Platform};

/// How many bytes of input to show on each side of an error position.
const FRAGMENT_RADIUS: usize = 40;

/// iOS element types that accept taps even when `accessible` is false.
const IOS_INTERACTIVE_TYPES: &[&str] = &[
    "XCUIElementTypeButton",
    "XCUIElementTypeCell",
    "XCUIElementTypeLink",
    "XCUIElementTypeTextField",
    "XCUIElementTypeSecureTextField",
    "XCUIElementTypeTextView",
    "XCUIElementTypeSearchField",
    "XCUIElementTypeSwitch",
    "XCUIElementTypeToggle",
    "XCUIElementTypeSlider",
    "XCUIElementTypeStepper",
    "XCUIElementTypeSegmentedControl",
    "XCUIElementTypePickerWheel",
    "XCUIElementTypeMenuItem",
    "XCUIElementTypeTab",
    "XCUIElementTypeKey",
];

/// A page source that could not be parsed.
///
/// Carries the byte offset where parsing stopped and the surrounding slice of
/// input so the caller can see what was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed page source at byte {position}: {message} (near `{fragment}`)")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into the input.
    pub position: usize,
    /// The offending slice of input around `position`.
    pub fragment: String,
}

impl ParseError {
    fn new(message: impl Into<String>, source: &str, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            fragment: fragment_at(source, position),
        }
    }
}

/// Returns the input around `position`, clamped to char boundaries.
fn fragment_at(source: &str, position: usize) -> String {
    let position = position.min(source.len());
    let mut start = position.saturating_sub(FRAGMENT_RADIUS);
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (position + FRAGMENT_RADIUS).min(source.len());
    while !source.is_char_boundary(end) {
        end += 1;
    }
    source[start..end].trim().to_string()
}

/// Per-parent bookkeeping while walking the tree.
struct Frame {
    path: String,
    children: usize,
    name_counts: HashMap<String, usize>,
}

impl Frame {
    fn new(path: String) -> Self {
        Self {
            path,
            children: 0,
            name_counts: HashMap::new(),
        }
    }

    /// Registers a child element and returns its sibling index and structural path.
    fn next_child(&mut self, xml_name: &str) -> (usize, String) {
        let index = self.children;
        self.children += 1;
        let position = self.name_counts.entry(xml_name.to_string()).or_insert(0);
        *position += 1;
        (index, format!("{}/{}[{}]", self.path, xml_name, position))
    }
}

/// Parses a raw page source into document-ordered element nodes.
///
/// Every XML element becomes a node, including wrappers such as `hierarchy`
/// and `AppiumAUT`, so the structural paths of their descendants stay valid.
/// Declarations, comments, processing instructions and text content are
/// skipped.
///
/// # Errors
///
/// Returns [`ParseError`] for empty input, input without any element, tag
/// mismatches, elements left open at end of input, and invalid attributes.
/// Malformed input never yields an empty `Ok`.
pub fn parse_page_source(raw: &str, platform: Platform) -> Result<Vec<ElementNode>, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::new("page source is empty", raw, 0));
    }

    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut nodes = Vec::new();
    let mut stack = vec![Frame::new(String::new())];

    loop {
        let event = reader.read_event().map_err(|e| {
            ParseError::new(e.to_string(), raw, reader.error_position() as usize)
        })?;
        match event {
            Event::Start(ref start) => {
                let position = reader.buffer_position() as usize;
                let node = read_node(start, platform, &mut stack, raw, position)?;
                let path = node.path.clone();
                nodes.push(node);
                stack.push(Frame::new(path));
            }
            Event::Empty(ref start) => {
                let position = reader.buffer_position() as usize;
                let node = read_node(start, platform, &mut stack, raw, position)?;
                nodes.push(node);
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(ParseError::new(
                        "closing tag without a matching opening tag",
                        raw,
                        reader.buffer_position() as usize,
                    ));
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|f| f.path.clone()).unwrap_or_default();
        return Err(ParseError::new(
            format!("unexpected end of input, element {} is not closed", open),
            raw,
            raw.len(),
        ));
    }
    if nodes.is_empty() {
        return Err(ParseError::new("page source contains no elements", raw, 0));
    }

    trace!(count = nodes.len(), %platform, "parsed page source");
    Ok(nodes)
}

/// Returns true if a node should be offered as a primary locator target.
///
/// Nodes with no text, no accessibility label, no identifier and no
/// clickability only serve as structural anchors for their descendants.
pub fn is_primary_candidate(node: &ElementNode) -> bool {
    node.is_identifiable() || node.clickable
}

fn read_node(
    start: &BytesStart<'_>,
    platform: Platform,
    stack: &mut [Frame],
    raw: &str,
    position: usize,
) -> Result<ElementNode, ParseError> {
    let xml_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attrs: HashMap<String, String> = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            ParseError::new(format!("invalid attribute on <{}>: {}", xml_name, e), raw, position)
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| {
            ParseError::new(
                format!("invalid value for attribute '{}' on <{}>: {}", key, xml_name, e),
                raw,
                position,
            )
        })?;
        attrs.insert(key, value.into_owned());
    }

    // The bottom frame is the document itself, so a parent always exists.
    let parent = stack
        .last_mut()
        .ok_or_else(|| ParseError::new("element outside of document", raw, position))?;
    let (index, path) = parent.next_child(&xml_name);

    Ok(match platform {
        Platform::Android => android_node(&xml_name, &attrs, index, path),
        Platform::Ios => ios_node(&xml_name, &attrs, index, path),
    })
}

fn attr<'a>(attrs: &'a HashMap<String, String>, key: &str) -> &'a str {
    attrs.get(key).map(String::as_str).unwrap_or("")
}

fn flag(attrs: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match attrs.get(key) {
        Some(v) => v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn android_node(
    xml_name: &str,
    attrs: &HashMap<String, String>,
    index: usize,
    path: String,
) -> ElementNode {
    ElementNode {
        tag_name: non_empty_or(attr(attrs, "class"), xml_name),
        text: attr(attrs, "text").to_string(),
        content_desc: attr(attrs, "content-desc").to_string(),
        resource_id: attr(attrs, "resource-id").to_string(),
        clickable: flag(attrs, "clickable", false),
        enabled: flag(attrs, "enabled", true),
        index,
        path,
        bounds: attrs.get("bounds").and_then(|b| Bounds::from_android(b)),
    }
}

fn ios_node(
    xml_name: &str,
    attrs: &HashMap<String, String>,
    index: usize,
    path: String,
) -> ElementNode {
    let tag_name = non_empty_or(attr(attrs, "type"), xml_name);
    let clickable =
        flag(attrs, "accessible", false) || IOS_INTERACTIVE_TYPES.contains(&tag_name.as_str());
    let bounds = Bounds::from_ios(
        attr(attrs, "x"),
        attr(attrs, "y"),
        attr(attrs, "width"),
        attr(attrs, "height"),
    );
    ElementNode {
        tag_name,
        text: attr(attrs, "value").to_string(),
        content_desc: attr(attrs, "label").to_string(),
        resource_id: attr(attrs, "name").to_string(),
        clickable,
        enabled: flag(attrs, "enabled", true),
        index,
        path,
        bounds,
    }
}

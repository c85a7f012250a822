//! Offline session driver backed by a saved page source.
//!
//! [`PageSourceDriver`] answers the three [`SessionDriver`] calls from an XML
//! dump instead of a device. It lets a locator file be checked against a
//! screen captured earlier, and it is what the integration tests drive.
//!
//! Resolution is deliberately literal. A locator resolves when it names an
//! element by one of the attributes the strategy is backed by:
//!
//! | strategy | resolves when |
//! |---|---|
//! | `id` | `resource_id` equals the selector (Android also accepts the part after `:id/`) |
//! | `accessibility id` | Android `content_desc`, iOS `name` equals the selector |
//! | `xpath` | the selector equals the element's attribute xpath or structural path |
//! | other strategies | the selector equals the synthesized candidate |

use async_trait::async_trait;

use crate::driver::{DriverError, ElementHandle, SessionDriver};
use crate::element::{ElementNode, Platform};
use crate::locator::LocatorStrategy;
use crate::page_source::ParseError;
use crate::snapshot::{Snapshot, SnapshotElement};

/// A [`SessionDriver`] over one fixed page source.
#[derive(Debug, Clone)]
pub struct PageSourceDriver {
    raw: String,
    snapshot: Snapshot,
}

impl PageSourceDriver {
    /// Parses `raw` up front; a malformed dump fails here rather than on the
    /// first call.
    pub fn new(raw: impl Into<String>, platform: Platform) -> Result<Self, ParseError> {
        let raw = raw.into();
        let snapshot = Snapshot::from_page_source(&raw, platform)?;
        Ok(Self { raw, snapshot })
    }

    pub fn source_platform(&self) -> Platform {
        self.snapshot.platform
    }

    fn resolves(&self, element: &SnapshotElement, strategy: LocatorStrategy, selector: &str) -> bool {
        match strategy {
            LocatorStrategy::Id => id_matches(&element.node, self.source_platform(), selector),
            LocatorStrategy::XPath => {
                element.node.path == selector
                    || element.candidates.get(LocatorStrategy::XPath) == Some(selector)
            }
            other => element.candidates.get(other) == Some(selector),
        }
    }
}

fn id_matches(node: &ElementNode, platform: Platform, selector: &str) -> bool {
    if node.resource_id.is_empty() {
        return false;
    }
    if node.resource_id == selector {
        return true;
    }
    platform == Platform::Android
        && node
            .resource_id
            .split_once(":id/")
            .is_some_and(|(_, name)| name == selector)
}

fn wire_strategy(name: &str) -> Option<LocatorStrategy> {
    LocatorStrategy::ALL.into_iter().find(|s| s.as_str() == name)
}

#[async_trait]
impl SessionDriver for PageSourceDriver {
    async fn page_source(&self) -> Result<String, DriverError> {
        Ok(self.raw.clone())
    }

    async fn find_element(&self, strategy: &str, selector: &str) -> Result<ElementHandle, DriverError> {
        let parsed = wire_strategy(strategy).ok_or_else(|| {
            DriverError::InvalidSelector(format!("unsupported locator strategy '{}'", strategy))
        })?;
        self.snapshot
            .elements()
            .iter()
            .position(|e| self.resolves(e, parsed, selector))
            .map(|position| ElementHandle::new(format!("offline-{}", position)))
            .ok_or_else(|| DriverError::NoSuchElement(format!("{}={}", strategy, selector)))
    }

    async fn automation_name(&self) -> Result<String, DriverError> {
        Ok(match self.source_platform() {
            Platform::Android => "UiAutomator2",
            Platform::Ios => "XCUITest",
        }
        .to_string())
    }
}

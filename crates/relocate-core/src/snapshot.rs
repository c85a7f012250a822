//! Immutable captures of the current screen.
//!
//! A [`Snapshot`] is the element universe one generation or validation call
//! works against: every node of one page source, each paired with its
//! synthesized [`CandidateMap`]. Snapshots are never updated; a new capture
//! replaces the old one wholesale, and nothing is diffed between captures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::driver::SessionDriver;
use crate::element::{ElementNode, Platform};
use crate::error::CoreError;
use crate::locator::{synthesize, CandidateMap};
use crate::page_source::{is_primary_candidate, parse_page_source, ParseError};

/// One element of a snapshot together with its locator candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotElement {
    #[serde(flatten)]
    pub node: ElementNode,
    pub candidates: CandidateMap,
}

/// One parsed capture of a screen.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Unique identifier of this capture.
    pub id: Uuid,
    /// When the page source was read.
    pub captured_at: DateTime<Utc>,
    /// Platform rules the page source was parsed with.
    pub platform: Platform,
    elements: Vec<SnapshotElement>,
}

impl Snapshot {
    /// Builds a snapshot from a page source already in hand.
    ///
    /// This is the pure half of [`capture_snapshot`]: parse, then synthesize
    /// candidates for every node in document order.
    pub fn from_page_source(raw: &str, platform: Platform) -> Result<Self, ParseError> {
        let elements = parse_page_source(raw, platform)?
            .into_iter()
            .map(|node| {
                let candidates = synthesize(&node, platform);
                SnapshotElement { node, candidates }
            })
            .collect();
        Ok(Self {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            platform,
            elements,
        })
    }

    /// All elements, in document order.
    pub fn elements(&self) -> &[SnapshotElement] {
        &self.elements
    }

    /// Elements worth offering as locator targets, in document order.
    pub fn primary_elements(&self) -> impl Iterator<Item = &SnapshotElement> {
        self.elements.iter().filter(|e| is_primary_candidate(&e.node))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Captures the current screen of a live session.
///
/// Issues exactly one automation-name read and one page-source read.
///
/// # Errors
///
/// - [`CoreError::NoActiveSession`] if the driver is not connected
/// - [`CoreError::UnsupportedPlatform`] if the automation name is neither
///   Android nor iOS
/// - [`CoreError::Parse`] if the page source is malformed
/// - [`CoreError::Driver`] if either read fails
pub async fn capture_snapshot(driver: &dyn SessionDriver) -> Result<Snapshot, CoreError> {
    let span = info_span!("capture_snapshot");
    async {
        if !driver.is_connected() {
            return Err(CoreError::NoActiveSession);
        }
        let (automation_name, platform) = driver.platform().await?;
        let platform = platform.ok_or(CoreError::UnsupportedPlatform(automation_name))?;
        let raw = driver.page_source().await?;
        let snapshot = Snapshot::from_page_source(&raw, platform)?;
        debug!(
            snapshot_id = %snapshot.id,
            %platform,
            elements = snapshot.len(),
            bytes = raw.len(),
            "snapshot captured"
        );
        Ok(snapshot)
    }
    .instrument(span)
    .await
}

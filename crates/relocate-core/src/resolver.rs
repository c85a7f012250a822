//! Locator resolution and alternate matching.
//!
//! [`LocatorResolver::resolve`] checks one recorded locator against the live
//! screen. When it resolves, that is the end of it. When it does not, the
//! resolver searches the current [`Snapshot`] for elements that are likely
//! the same target and proposes their other locators:
//!
//! 1. **Text similarity**: elements whose text, accessibility label or
//!    identifier resembles the entry's label (`fieldName`, else `remarks`,
//!    else `pageElementName`), as judged by the configured [`TextMatcher`].
//! 2. **Selector reuse**: elements with a candidate selector byte-identical
//!    to the one that failed. The element is there; it just needs a
//!    different strategy.
//!
//! Text matches come first, then reuse matches, each in document order.
//! Every candidate of a matching element is proposed except those using the
//! strategy already tried. The list is deduplicated on
//! `(strategy, selector)` keeping the first occurrence, then capped.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::driver::{DriverError, SessionDriver};
use crate::error::CoreError;
use crate::locator::LocatorStrategy;
use crate::locator_file::UserLocatorEntry;
use crate::matcher::{ContainsMatcher, TextMatcher};
use crate::snapshot::{capture_snapshot, Snapshot};

/// Upper bound on proposed alternates per locator.
pub const MAX_ALTERNATES: usize = 5;

/// A replacement locator proposed for one that no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternate {
    pub strategy: LocatorStrategy,
    pub selector: String,
    /// Class of the element the alternate points at.
    pub tag_name: String,
}

/// Outcome of resolving one recorded locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The locator resolved on the live screen.
    Found,
    /// The locator did not resolve.
    NotFound {
        /// What the driver reported.
        error: String,
        /// Ranked replacements, at most the resolver's cap.
        alternates: Vec<Alternate>,
    },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found)
    }
}

/// Holds the snapshot shared by every entry of one validation run.
///
/// The page source is read at most once per run, and only if some entry
/// fails to resolve.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    snapshot: Option<Snapshot>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the run's snapshot, capturing it on first use.
    pub async fn get_or_capture(&mut self, driver: &dyn SessionDriver) -> Result<&Snapshot, CoreError> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => capture_snapshot(driver).await?,
        };
        Ok(self.snapshot.insert(snapshot))
    }

    /// The snapshot, if one has been captured in this run.
    pub fn captured(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }
}

/// Resolves recorded locators and proposes alternates for broken ones.
pub struct LocatorResolver {
    matcher: Box<dyn TextMatcher>,
    max_alternates: usize,
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::new(Box::new(ContainsMatcher))
    }
}

impl LocatorResolver {
    /// Creates a resolver with the given text-similarity strategy and the
    /// default cap of [`MAX_ALTERNATES`].
    pub fn new(matcher: Box<dyn TextMatcher>) -> Self {
        Self {
            matcher,
            max_alternates: MAX_ALTERNATES,
        }
    }

    /// Lowers the alternate cap. Values above [`MAX_ALTERNATES`] are clamped.
    pub fn with_max_alternates(mut self, max_alternates: usize) -> Self {
        self.max_alternates = max_alternates.min(MAX_ALTERNATES);
        self
    }

    pub fn matcher_name(&self) -> &'static str {
        self.matcher.name()
    }

    /// Resolves one entry against the live session.
    ///
    /// Tries the entry's own strategy and selector first. Only when that fails
    /// is the shared snapshot captured (or reused) and searched.
    ///
    /// # Errors
    ///
    /// A locator that does not resolve is a [`Resolution::NotFound`], not an
    /// error. Errors are fatal to the run: [`CoreError::NoActiveSession`] if the
    /// driver reports no session, or any error of [`capture_snapshot`].
    pub async fn resolve(
        &self,
        driver: &dyn SessionDriver,
        entry: &UserLocatorEntry,
        slot: &mut SnapshotSlot,
    ) -> Result<Resolution, CoreError> {
        let error = match driver.find_element(entry.strategy.trim(), &entry.selector).await {
            Ok(handle) => {
                debug!(strategy = %entry.strategy, selector = %entry.selector, element = %handle.id, "locator resolved");
                return Ok(Resolution::Found);
            }
            Err(DriverError::NotConnected) => return Err(CoreError::NoActiveSession),
            Err(e) => e.to_string(),
        };

        debug!(strategy = %entry.strategy, selector = %entry.selector, %error, "locator did not resolve");
        let snapshot = slot.get_or_capture(driver).await?;
        let alternates = self.find_alternates(snapshot, entry);
        debug!(count = alternates.len(), matcher = self.matcher.name(), "alternates found");
        Ok(Resolution::NotFound { error, alternates })
    }

    /// Searches a snapshot for replacements of an entry's locator.
    ///
    /// Pure: no driver interaction.
    pub fn find_alternates(&self, snapshot: &Snapshot, entry: &UserLocatorEntry) -> Vec<Alternate> {
        let tried = LocatorStrategy::parse_lenient(&entry.strategy);
        let elements = snapshot.elements();

        let text_hits = entry.target_label().into_iter().flat_map(|label| {
            elements
                .iter()
                .filter(move |e| self.matcher.matches(&e.node, label))
        });
        let reuse_hits = elements
            .iter()
            .filter(|e| e.candidates.contains_selector(&entry.selector));

        let mut seen: HashSet<(LocatorStrategy, &str)> = HashSet::new();
        let mut alternates = Vec::new();
        for element in text_hits.chain(reuse_hits) {
            for candidate in element.candidates.iter() {
                if alternates.len() >= self.max_alternates {
                    return alternates;
                }
                if Some(candidate.strategy) == tried {
                    continue;
                }
                if !seen.insert((candidate.strategy, candidate.selector.as_str())) {
                    continue;
                }
                alternates.push(Alternate {
                    strategy: candidate.strategy,
                    selector: candidate.selector.clone(),
                    tag_name: element.node.tag_name.clone(),
                });
            }
        }
        alternates
    }
}

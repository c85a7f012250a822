//! Self-healing validation of recorded locators.
//!
//! [`validate_locator_file`] loads a locator file, then checks every entry
//! against the live screen in file order. Entries that no longer resolve are
//! reported with ranked alternates; the aggregate is a [`ValidationReport`].
//!
//! A run is sequential and shares at most one snapshot between its entries.
//! Any [`CoreError`] aborts the whole run with no partial report.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::element::Platform;
use crate::error::CoreError;
use crate::locator_file::{load_locator_file, UserLocatorEntry};
use crate::resolver::{Alternate, LocatorResolver, Resolution, SnapshotSlot};
use crate::session::{Session, SessionEvent};

/// Outcome of checking one recorded locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub page_name: String,
    pub page_element_name: String,
    pub field_name: String,
    pub locator_strategy: String,
    pub locator: String,
    pub auto_heal: bool,
    pub found: bool,
    /// Replacement locators, best first. Empty when `found`.
    pub alternates: Vec<Alternate>,
    /// Why the locator did not resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn new(entry: &UserLocatorEntry, resolution: Resolution) -> Self {
        let (found, alternates, error) = match resolution {
            Resolution::Found => (true, Vec::new(), None),
            Resolution::NotFound { error, alternates } => (false, alternates, Some(error)),
        };
        Self {
            page_name: entry.page_name.clone(),
            page_element_name: entry.page_element_name.clone(),
            field_name: entry.field_name.clone(),
            locator_strategy: entry.strategy.clone(),
            locator: entry.selector.clone(),
            auto_heal: entry.auto_heal,
            found,
            alternates,
            error,
        }
    }
}

/// Aggregate result of one validation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total: usize,
    pub found_count: usize,
    pub missing_count: usize,
    /// One line for humans, e.g. `Checked 3 locators: 2 found, 1 missing, 4 alternates suggested`.
    pub summary: String,
    /// Platform of the snapshot, when one had to be captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Text matcher used for alternates.
    pub matcher: &'static str,
    pub checked_at: DateTime<Utc>,
    /// One result per entry, in file order.
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    fn new(results: Vec<ValidationResult>, platform: Option<Platform>, matcher: &'static str) -> Self {
        let total = results.len();
        let found_count = results.iter().filter(|r| r.found).count();
        let missing_count = total - found_count;
        let alternate_count: usize = results.iter().map(|r| r.alternates.len()).sum();
        Self {
            total,
            found_count,
            missing_count,
            summary: summarize(total, found_count, missing_count, alternate_count),
            platform,
            matcher,
            checked_at: Utc::now(),
            results,
        }
    }

    /// Returns true if every locator resolved.
    pub fn all_found(&self) -> bool {
        self.missing_count == 0
    }

    /// Results of locators that did not resolve.
    pub fn missing(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.found)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn summarize(total: usize, found: usize, missing: usize, alternates: usize) -> String {
    format!(
        "Checked {}: {} found, {} missing, {} suggested",
        plural(total, "locator"),
        found,
        missing,
        plural(alternates, "alternate"),
    )
}

/// Validates already loaded entries against the session.
///
/// # Errors
///
/// - [`CoreError::NoActiveSession`] if no driver is attached or the driver
///   loses its session mid-run
/// - any error of [`capture_snapshot`](crate::snapshot::capture_snapshot),
///   the first time an entry fails to resolve
pub async fn validate_locators(
    session: &Session,
    entries: &[UserLocatorEntry],
    resolver: &LocatorResolver,
) -> Result<ValidationReport, CoreError> {
    let span = info_span!("validate_locators", session_id = %session.id, total = entries.len());
    async {
        let driver = session.driver().await?;
        if !driver.is_connected() {
            return Err(CoreError::NoActiveSession);
        }

        let mut slot = SnapshotSlot::new();
        let mut results = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let had_snapshot = slot.captured().is_some();
            let resolution = resolver.resolve(driver.as_ref(), entry, &mut slot).await?;

            if !had_snapshot {
                if let Some(snapshot) = slot.captured() {
                    session.emit(SessionEvent::SnapshotCaptured {
                        snapshot_id: snapshot.id,
                        platform: snapshot.platform,
                        element_count: snapshot.len(),
                    });
                }
            }

            let result = ValidationResult::new(entry, resolution);
            if !result.found {
                warn!(
                    index,
                    page = %entry.page_name,
                    element = %entry.page_element_name,
                    strategy = %entry.strategy,
                    alternates = result.alternates.len(),
                    "locator no longer resolves"
                );
            }
            session.emit(SessionEvent::LocatorChecked {
                index,
                page_element_name: entry.page_element_name.clone(),
                found: result.found,
                alternate_count: result.alternates.len(),
            });
            results.push(result);
        }

        let platform = slot.captured().map(|s| s.platform);
        let report = ValidationReport::new(results, platform, resolver.matcher_name());
        info!(summary = %report.summary, "validation finished");
        session.emit(SessionEvent::ValidationFinished {
            total: report.total,
            found_count: report.found_count,
            missing_count: report.missing_count,
        });
        Ok(report)
    }
    .instrument(span)
    .await
}

/// Loads a locator file and validates it against the session.
///
/// The file is read and shape-checked before the session is touched, so a
/// bad file fails with [`CoreError::LocatorFile`] even without a driver.
pub async fn validate_locator_file(
    session: &Session,
    path: impl AsRef<Path>,
    resolver: &LocatorResolver,
) -> Result<ValidationReport, CoreError> {
    let entries = load_locator_file(path).await?;
    validate_locators(session, &entries, resolver).await
}

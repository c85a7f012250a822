//! Ad-hoc locator generation for the current screen.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::element::Platform;
use crate::error::CoreError;
use crate::session::{Session, SessionEvent};
use crate::snapshot::{capture_snapshot, SnapshotElement};

/// Locator candidates for every primary element of one screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub platform: Platform,
    pub captured_at: DateTime<Utc>,
    pub element_count: usize,
    /// Primary elements in document order, each with its candidate map.
    pub elements: Vec<SnapshotElement>,
}

/// Captures the current screen and returns candidates for its primary
/// elements.
///
/// Elements with no text, label, identifier and not clickable are left out.
pub async fn generate_locators(session: &Session) -> Result<GenerationResult, CoreError> {
    let span = info_span!("generate_locators", session_id = %session.id);
    async {
        let driver = session.driver().await?;
        let snapshot = capture_snapshot(driver.as_ref()).await?;
        session.emit(SessionEvent::SnapshotCaptured {
            snapshot_id: snapshot.id,
            platform: snapshot.platform,
            element_count: snapshot.len(),
        });

        let elements: Vec<SnapshotElement> = snapshot.primary_elements().cloned().collect();
        info!(
            total = snapshot.len(),
            primary = elements.len(),
            "locators generated"
        );
        Ok(GenerationResult {
            platform: snapshot.platform,
            captured_at: snapshot.captured_at,
            element_count: elements.len(),
            elements,
        })
    }
    .instrument(span)
    .await
}

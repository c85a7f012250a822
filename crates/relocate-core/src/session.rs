//! Session handle shared by generation and validation calls.
//!
//! This module provides the [`Session`] type, which holds the driver of the
//! automation session locators are checked against and broadcasts progress
//! events to whoever is listening.
//!
//! # Architecture
//!
//! A session is passed explicitly to every core operation; there is no
//! process-wide "current session".
//!
//! - A driver is attached with [`Session::attach`] and removed with
//!   [`Session::detach`]
//! - Operations on a session with no driver fail with
//!   [`CoreError::NoActiveSession`]
//! - Progress is broadcast as [`SessionEvent`]s; sending without
//!   subscribers is not an error
//!
//! # Example
//!
//! ```no_run
//! use relocate_core::driver::DriverConfig;
//! use relocate_core::element::Platform;
//! use relocate_core::session::Session;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new();
//!     let mut rx = session.subscribe();
//!
//!     let driver = DriverConfig::PageSource {
//!         path: "screen.xml".into(),
//!         platform: Platform::Android,
//!     }
//!     .build()
//!     .await
//!     .unwrap();
//!     session.attach(driver).await;
//!
//!     let result = relocate_core::generate::generate_locators(&session).await.unwrap();
//!     println!("{} elements", result.element_count);
//!     let _ = rx.try_recv();
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::driver::SessionDriver;
use crate::element::Platform;
use crate::error::CoreError;

/// Capacity of the event channel. Slow receivers miss the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Progress events broadcast while a session is used.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A driver was attached to the session.
    #[serde(rename_all = "camelCase")]
    Attached {
        automation_name: Option<String>,
    },

    /// The driver was removed from the session.
    Detached,

    /// A snapshot of the current screen was captured.
    #[serde(rename_all = "camelCase")]
    SnapshotCaptured {
        snapshot_id: Uuid,
        platform: Platform,
        element_count: usize,
    },

    /// One locator of a validation run was checked.
    #[serde(rename_all = "camelCase")]
    LocatorChecked {
        /// 0-based position of the entry in the locator file.
        index: usize,
        page_element_name: String,
        found: bool,
        alternate_count: usize,
    },

    /// A validation run completed.
    #[serde(rename_all = "camelCase")]
    ValidationFinished {
        total: usize,
        found_count: usize,
        missing_count: usize,
    },
}

/// Explicit handle to the automation session under test.
///
/// Sessions are cheap to create. The driver slot is guarded by a
/// [`RwLock`]; operations take a clone of the driver `Arc` and release the
/// lock before talking to the device.
pub struct Session {
    /// The unique identifier for this session handle.
    pub id: Uuid,

    /// When this handle was created.
    pub created_at: DateTime<Utc>,

    driver: RwLock<Option<Arc<dyn SessionDriver>>>,

    event_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Creates a session with no driver attached.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            driver: RwLock::new(None),
            event_tx,
        }
    }

    /// Creates a session with `driver` already attached.
    pub fn with_driver(driver: Arc<dyn SessionDriver>) -> Self {
        Self {
            driver: RwLock::new(Some(driver)),
            ..Self::new()
        }
    }

    /// Attaches a driver, replacing any previous one.
    pub async fn attach(&self, driver: Arc<dyn SessionDriver>) {
        let automation_name = driver.automation_name().await.ok();
        debug!(session_id = %self.id, ?automation_name, "driver attached");
        *self.driver.write().await = Some(driver);
        self.emit(SessionEvent::Attached { automation_name });
    }

    /// Removes the driver. Later operations fail with
    /// [`CoreError::NoActiveSession`] until another is attached.
    pub async fn detach(&self) {
        if self.driver.write().await.take().is_some() {
            debug!(session_id = %self.id, "driver detached");
            self.emit(SessionEvent::Detached);
        }
    }

    /// Returns the attached driver.
    pub async fn driver(&self) -> Result<Arc<dyn SessionDriver>, CoreError> {
        self.driver
            .read()
            .await
            .clone()
            .ok_or(CoreError::NoActiveSession)
    }

    /// Returns true if a driver is attached and reports itself connected.
    pub async fn is_active(&self) -> bool {
        self.driver
            .read()
            .await
            .as_ref()
            .is_some_and(|d| d.is_connected())
    }

    /// Subscribes to session events.
    ///
    /// Note that broadcast receivers may miss events if they lag too far
    /// behind.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is expected
        let _ = self.event_tx.send(event);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("driver", &"<RwLock<Option<Arc<dyn SessionDriver>>>>")
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

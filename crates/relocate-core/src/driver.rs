//! Session driver trait for backend-agnostic locator resolution.
//!
//! This module defines the [`SessionDriver`] trait, the only surface through
//! which the core touches a live device. Three calls are enough: read the
//! page source, resolve one locator, and read the automation name so the
//! page source can be parsed with the right platform rules.
//!
//! # Backends
//!
//! - [`AppiumDriver`](crate::appium::AppiumDriver) attaches to an existing
//!   Appium session over HTTP.
//! - [`PageSourceDriver`](crate::page_source_driver::PageSourceDriver)
//!   answers from a saved page-source dump, for offline validation and tests.
//!
//! Use [`DriverConfig`] to pick one at runtime:
//!
//! ```no_run
//! use relocate_core::driver::DriverConfig;
//! use relocate_core::element::Platform;
//!
//! let config = DriverConfig::Appium {
//!     url: "http://127.0.0.1:4723".to_string(),
//!     session_id: "2b8f0a4e-0000-4000-8000-000000000000".to_string(),
//!     automation_name: None,
//! };
//!
//! let config = DriverConfig::PageSource {
//!     path: "screen.xml".into(),
//!     platform: Platform::Android,
//! };
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::Platform;

/// Errors that can occur during session driver operations.
///
/// This enum unifies errors from all backends behind a single type. Of these,
/// only [`DriverError::NotConnected`] is fatal to a validation run; any other
/// failure of [`SessionDriver::find_element`] is treated as "locator did not
/// resolve".
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// There is no live session behind this driver.
    #[error("Not connected to an automation session")]
    NotConnected,

    /// The locator matched nothing on the current screen.
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The backend rejected the strategy or selector syntax.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The connection to the backend was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

/// An opaque reference to a resolved element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// The backend's element id.
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Configuration for selecting a session driver at runtime.
#[derive(Debug, Clone)]
pub enum DriverConfig {
    /// Attach to an existing Appium session.
    Appium {
        /// Base URL of the Appium server, e.g. `http://127.0.0.1:4723`.
        url: String,
        /// Id of the already created session.
        session_id: String,
        /// Overrides the `automationName` capability when set.
        automation_name: Option<String>,
    },
    /// Answer from a page source saved on disk.
    PageSource {
        /// Path to the XML dump.
        path: PathBuf,
        /// Platform the dump was captured from.
        platform: Platform,
    },
}

impl DriverConfig {
    /// Builds the driver this configuration describes.
    ///
    /// For [`DriverConfig::PageSource`] the file is read and parsed up front.
    pub async fn build(self) -> Result<Arc<dyn SessionDriver>, crate::error::CoreError> {
        match self {
            DriverConfig::Appium { url, session_id, automation_name } => {
                let mut driver = crate::appium::AppiumDriver::new(url, session_id);
                if let Some(name) = automation_name {
                    driver = driver.with_automation_name(name);
                }
                Ok(Arc::new(driver))
            }
            DriverConfig::PageSource { path, platform } => {
                let raw = tokio::fs::read_to_string(&path).await.map_err(DriverError::Io)?;
                let driver = crate::page_source_driver::PageSourceDriver::new(raw, platform)?;
                Ok(Arc::new(driver))
            }
        }
    }
}

/// Trait for the live automation session the core validates against.
///
/// Implementors forward to a real device session (or a stand-in). All calls
/// are async; the core awaits each one before issuing the next, so
/// implementations never see concurrent requests from a validation run.
///
/// # Required Methods
///
/// Implementors must provide [`page_source`](SessionDriver::page_source),
/// [`find_element`](SessionDriver::find_element) and
/// [`automation_name`](SessionDriver::automation_name).
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Get the page source of the current screen.
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Resolve one locator against the current screen.
    ///
    /// # Arguments
    ///
    /// * `strategy` - Appium strategy name (e.g. `"id"`, `"xpath"`)
    /// * `selector` - The selector for that strategy
    async fn find_element(&self, strategy: &str, selector: &str)
        -> Result<ElementHandle, DriverError>;

    /// Get the session's `automationName` capability.
    async fn automation_name(&self) -> Result<String, DriverError>;

    /// Check if the backend is ready to accept commands.
    ///
    /// The default assumes it is; backends with an explicit connection state
    /// should override this.
    fn is_connected(&self) -> bool {
        true
    }

    /// Get the platform of the session.
    ///
    /// The default maps [`automation_name`](Self::automation_name) through
    /// [`Platform::from_automation_name`]. Returns `Ok(None)` when the name
    /// belongs to neither platform.
    async fn platform(&self) -> Result<(String, Option<Platform>), DriverError> {
        let name = self.automation_name().await?;
        let platform = Platform::from_automation_name(&name);
        Ok((name, platform))
    }
}

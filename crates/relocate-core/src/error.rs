//! Error types for generation and validation calls.
//!
//! Every variant of [`CoreError`] is fatal to the call that produced it: the
//! call returns no partial results. A locator that simply does not resolve is
//! not an error; it becomes a not-found
//! [`ValidationResult`](crate::validation::ValidationResult).

use thiserror::Error;

use crate::driver::DriverError;
use crate::locator_file::LocatorFileError;
use crate::page_source::ParseError;

/// Fatal errors of the locator engine.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No session driver is attached, or the driver has lost its session.
    #[error("No active automation session: attach a driver before generating or validating locators")]
    NoActiveSession,

    /// The page source of the current screen could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The locator file is missing, unreadable or has the wrong shape.
    #[error(transparent)]
    LocatorFile(#[from] LocatorFileError),

    /// The session's automation name maps to neither Android nor iOS.
    #[error("Unsupported automation platform '{0}': expected an Android or iOS automation name")]
    UnsupportedPlatform(String),

    /// Reading the page source or session capabilities failed.
    #[error("Session driver error: {0}")]
    Driver(DriverError),
}

impl From<DriverError> for CoreError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotConnected => CoreError::NoActiveSession,
            other => CoreError::Driver(other),
        }
    }
}

//! # relocate-core
//!
//! Locator generation and self-healing validation for Android and iOS UI
//! automation.
//!
//! This crate turns the page source of a live Appium session into ranked,
//! multi-strategy locators, and checks a recorded locator file against the
//! current screen, proposing replacements for locators that no longer
//! resolve.
//!
//! ## Modules
//!
//! - [`page_source`] - Parses Android and iOS page sources into [`element::ElementNode`]s
//! - [`locator`] - Synthesizes ranked locator candidates for an element
//! - [`snapshot`] - Immutable captures of the current screen
//! - [`resolver`] - Resolves one recorded locator and finds alternates
//! - [`matcher`] - Text-similarity strategies used by the resolver
//! - [`validation`] - Validates a whole locator file into a report
//! - [`generate`] - Ad-hoc locator generation for the current screen
//! - [`session`] - Explicit session handle with event broadcasting
//! - [`driver`] - The [`driver::SessionDriver`] trait and its errors
//! - [`appium`] - Driver for an existing Appium session over HTTP
//! - [`page_source_driver`] - Offline driver over a saved page source
//! - [`config`] - Persistent configuration in `~/.relocate/`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relocate_core::appium::AppiumDriver;
//! use relocate_core::config::RelocateConfig;
//! use relocate_core::session::Session;
//! use relocate_core::validation::validate_locator_file;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relocate_core::error::CoreError> {
//!     let config = RelocateConfig::load();
//!     let driver = AppiumDriver::new(&config.appium_url, "2b8f0a4e-0000-4000-8000-000000000000");
//!     let session = Session::with_driver(Arc::new(driver));
//!
//!     let report = validate_locator_file(&session, "locators.json", &config.resolver()).await?;
//!     println!("{}", report.summary);
//!     for missing in report.missing() {
//!         println!("{}: {} alternates", missing.page_element_name, missing.alternates.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod appium;
pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod generate;
pub mod locator;
pub mod locator_file;
pub mod matcher;
pub mod page_source;
pub mod page_source_driver;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod validation;

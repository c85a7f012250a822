//! Locator file ingestion.
//!
//! A locator file is a JSON array of [`UserLocatorEntry`] objects, as
//! recorded by a test author or an earlier generation run:
//!
//! ```json
//! [
//!   {
//!     "pageName": "Login",
//!     "pageElementName": "submitButton",
//!     "LocatorStrategy": "id",
//!     "Locators": "com.app:id/submit",
//!     "fieldName": "Submit",
//!     "remarks": "primary CTA",
//!     "AutoHeal": true
//!   }
//! ]
//! ```
//!
//! The whole file is shape-checked before any entry is handed out, so a bad
//! file fails before the session is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a locator file.
#[derive(Error, Debug)]
pub enum LocatorFileError {
    /// The file could not be read.
    #[error("Cannot read locator file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("Locator file is not valid JSON: {0}")]
    InvalidJson(String),

    /// The top-level JSON value is not an array.
    #[error("Locator file must contain a JSON array of locator entries, found {0}")]
    NotAnArray(&'static str),

    /// An item of the array does not have the locator entry shape.
    #[error("Invalid locator entry at index {index}: {message}")]
    InvalidEntry { index: usize, message: String },
}

/// One recorded locator, as read from a locator file.
///
/// Read-only input to validation; never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocatorEntry {
    #[serde(rename = "pageName")]
    pub page_name: String,

    #[serde(rename = "pageElementName")]
    pub page_element_name: String,

    /// Strategy name exactly as written in the file.
    #[serde(rename = "LocatorStrategy")]
    pub strategy: String,

    /// Selector exactly as written in the file.
    #[serde(rename = "Locators")]
    pub selector: String,

    #[serde(rename = "fieldName", default, deserialize_with = "string_or_null")]
    pub field_name: String,

    #[serde(default, deserialize_with = "string_or_null")]
    pub remarks: String,

    #[serde(rename = "AutoHeal", default, deserialize_with = "lenient_bool")]
    pub auto_heal: bool,
}

impl UserLocatorEntry {
    /// The label used for text-similarity matching.
    ///
    /// First non-empty of `fieldName`, `remarks`, `pageElementName`, trimmed.
    pub fn target_label(&self) -> Option<&str> {
        [&self.field_name, &self.remarks, &self.page_element_name]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `true`/`false`, `"true"`/`"yes"`/`"1"` style strings, and null.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1"),
        None => false,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses and shape-checks the contents of a locator file.
///
/// The top-level value must be an array, and every item must deserialize into
/// a [`UserLocatorEntry`] with non-empty `LocatorStrategy` and `Locators`.
/// The first offending item is reported by index.
pub fn parse_locator_entries(json: &str) -> Result<Vec<UserLocatorEntry>, LocatorFileError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| LocatorFileError::InvalidJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(LocatorFileError::NotAnArray(json_kind(&other))),
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(LocatorFileError::InvalidEntry {
                index,
                message: format!("expected an object, found {}", json_kind(&item)),
            });
        }
        let entry: UserLocatorEntry = serde_json::from_value(item)
            .map_err(|e| LocatorFileError::InvalidEntry { index, message: e.to_string() })?;
        if entry.strategy.trim().is_empty() {
            return Err(LocatorFileError::InvalidEntry {
                index,
                message: "LocatorStrategy is empty".to_string(),
            });
        }
        if entry.selector.is_empty() {
            return Err(LocatorFileError::InvalidEntry {
                index,
                message: "Locators is empty".to_string(),
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Reads and parses a locator file from disk.
pub async fn load_locator_file(path: impl AsRef<Path>) -> Result<Vec<UserLocatorEntry>, LocatorFileError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LocatorFileError::Io { path: path.to_path_buf(), source })?;
    let entries = parse_locator_entries(&json)?;
    debug!(path = %path.display(), count = entries.len(), "loaded locator file");
    Ok(entries)
}

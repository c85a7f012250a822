//! Persistent configuration for relocate.
//!
//! Stores user settings in `~/.relocate/config.json`: where the Appium server
//! lives, which session to attach to by default, and how alternates are
//! matched. Every field is optional in the file; missing fields take their
//! defaults, and a missing or unreadable file yields [`RelocateConfig::default`].
//!
//! # Example
//!
//! ```no_run
//! use relocate_core::config::RelocateConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = RelocateConfig::load();
//!
//! if let Some(id) = &config.session_id {
//!     println!("Default session: {} on {}", id, config.appium_url);
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::{FuzzyMatcher, MatcherKind};
use crate::resolver::{LocatorResolver, MAX_ALTERNATES};

const CONFIG_FILENAME: &str = "config.json";

/// Default Appium server address.
pub const DEFAULT_APPIUM_URL: &str = "http://127.0.0.1:4723";

/// Returns the relocate directory path (`~/.relocate/`).
///
/// Falls back to `./.relocate` when the home directory cannot be determined.
pub fn relocate_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relocate")
}

/// Returns the path of the config file (`~/.relocate/config.json`).
pub fn config_path() -> PathBuf {
    relocate_dir().join(CONFIG_FILENAME)
}

/// Persistent relocate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocateConfig {
    /// Base URL of the Appium server.
    pub appium_url: String,

    /// Session to attach to when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Overrides the session's `automationName` capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_name: Option<String>,

    /// Text-similarity strategy used for alternate matching.
    pub matcher: MatcherKind,

    /// Minimum score for the fuzzy matcher.
    pub fuzzy_min_score: i64,

    /// Upper bound on alternates proposed per missing locator, clamped to
    /// [`MAX_ALTERNATES`].
    pub max_alternates: usize,
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            appium_url: DEFAULT_APPIUM_URL.to_string(),
            session_id: None,
            automation_name: None,
            matcher: MatcherKind::default(),
            fuzzy_min_score: FuzzyMatcher::DEFAULT_MIN_SCORE,
            max_alternates: MAX_ALTERNATES,
        }
    }
}

impl RelocateConfig {
    /// Load config from `~/.relocate/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(config_path())
    }

    /// Load config from an explicit path, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                debug!(path = %path.display(), error = %e, "ignoring unparsable config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save config to `~/.relocate/config.json`, creating the directory.
    pub fn save(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(relocate_dir())?;
        self.save_to(config_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Builds the resolver this configuration describes.
    pub fn resolver(&self) -> LocatorResolver {
        LocatorResolver::new(self.matcher.build(self.fuzzy_min_score))
            .with_max_alternates(self.max_alternates)
    }
}

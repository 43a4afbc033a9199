//! Admin site configuration.
//!
//! [`AdminConfig`] holds the handful of settings an admin site needs. It can be
//! built programmatically, or loaded from a TOML file where any missing key
//! keeps its default.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! | Env Var | Setting |
//! |---|---|
//! | `ADMINKIT_DEBUG` | `debug` |
//! | `ADMINKIT_LOG_LEVEL` | `log_level` |
//! | `ADMINKIT_LOGOUT_URL` | `logout_url` |
//! | `ADMINKIT_SECRET_KEY` | `secret_key` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AdminResult;

/// Settings shared by every view of an admin site.
///
/// # Examples
///
/// ```
/// use adminkit::config::AdminConfig;
///
/// let config = AdminConfig::from_toml_str(r#"site_title = "Back office""#).unwrap();
/// assert_eq!(config.site_title, "Back office");
/// assert_eq!(config.static_url, "statics");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Title shown in the page header and browser tab.
    pub site_title: String,
    /// Where the "log out" link points. Empty hides the link.
    pub logout_url: String,
    /// Directory with `*.html` files overriding the bundled templates.
    pub template_dir: Option<PathBuf>,
    /// Path segment, relative to the site prefix, serving bundled assets.
    pub static_url: String,
    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The log level (e.g. "info", "debug", "adminkit=trace").
    pub log_level: String,
    /// Key signing the flash-message cookie. Empty means a random key per
    /// process.
    pub secret_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            site_title: "Admin".to_string(),
            logout_url: String::new(),
            template_dir: None,
            static_url: "statics".to_string(),
            debug: false,
            log_level: "info".to_string(),
            secret_key: String::new(),
        }
    }
}

impl AdminConfig {
    /// Parses a TOML document into a config. Absent keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> AdminResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads and parses a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> AdminResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loaded admin config");
        Self::from_toml_str(&content)
    }

    /// Applies `ADMINKIT_*` environment overrides on top of this config.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(debug) = lookup("ADMINKIT_DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(level) = lookup("ADMINKIT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("ADMINKIT_LOGOUT_URL") {
            self.logout_url = url;
        }
        if let Some(key) = lookup("ADMINKIT_SECRET_KEY") {
            self.secret_key = key;
        }
        self
    }
}

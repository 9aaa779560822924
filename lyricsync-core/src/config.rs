//! TOML configuration loaded from the user's config directory.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What happens to a media URL once the media it was derived from is replaced or cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Never revoke. Every URL ever derived stays live until process exit.
    #[default]
    Retain,
    /// Revoke the previous URL once a new one has been derived.
    RevokeOnReplace,
    /// Like `RevokeOnReplace`, and also revoke and clear the URL when the media is cleared.
    RevokeOnClear,
}

impl ReleasePolicy {
    #[must_use]
    pub const fn revokes_on_replace(self) -> bool {
        matches!(self, Self::RevokeOnReplace | Self::RevokeOnClear)
    }

    #[must_use]
    pub const fn revokes_on_clear(self) -> bool {
        matches!(self, Self::RevokeOnClear)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub release_policy: ReleasePolicy,
    /// Origin segment of derived URLs (`blob:<origin>/<id>`)
    #[serde(default = "default_url_origin")]
    pub url_origin: String,
}

fn default_url_origin() -> String {
    "lyricsync".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            release_policy: ReleasePolicy::default(),
            url_origin: default_url_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel carrying store events
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

const fn default_event_capacity() -> usize {
    64
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/lyricsync/lyricsync.log`
    #[serde(default)]
    pub enabled: bool,
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filter: default_filter(),
        }
    }
}

impl Config {
    /// Get the configuration directory path (~/.config/lyricsync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or fails validation.
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on first run.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path` or create a template there on first run
    ///
    /// # Errors
    ///
    /// Same as [`Config::load_or_create`].
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a field holds an invalid value.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let origin = &self.media.url_origin;
        if origin.is_empty() || origin.contains('/') || origin.chars().any(char::is_whitespace) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "media.url_origin must be non-empty without '/' or whitespace, got {origin:?}"
                ),
            });
        }
        if self.events.capacity == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "events.capacity must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# Lyricsync Configuration
# ~/.config/lyricsync/config.toml

[media]
# What happens to a media URL after its media is replaced or cleared:
# "retain", "revoke_on_replace", "revoke_on_clear"
release_policy = "retain"
url_origin = "lyricsync"

[events]
capacity = 64

[logging]
# Also write logs to ~/.config/lyricsync/lyricsync.log
enabled = false
# Overridden by RUST_LOG when set
filter = "info"
"#;

//! Configuration management
//!
//! Two layers:
//! - [`Settings`]: non-secret connection and engine behaviour, persisted as TOML at
//!   ~/.config/blobsync/config.toml by [`ConfigManager`].
//! - [`StoreConfig`]: the immutable value an orchestrator is built from. It adds the
//!   account identity and container name, which are never written to disk.
//!
//! PROTECTED FILE: Changes to schema_version require migration support.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Default S3-compatible endpoint host
const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

/// Default region
const DEFAULT_REGION: &str = "us-east-1";

/// How local paths and blob keys are made relative to a root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Strip roots on path-segment boundaries
    #[default]
    Segment,
    /// Textual substring replacement, compatible with keys written by older tooling
    Literal,
}

/// What a bulk operation does when a single item fails to transfer
///
/// Listing failures are always recorded and skipped regardless of the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Return the first transfer error
    #[default]
    Abort,
    /// Record the error in the report and move on to the next item
    Continue,
}

/// Non-secret settings shared by every store connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Connect with https (true) or plain http (false)
    #[serde(default = "default_true")]
    pub use_https: bool,

    /// Endpoint host with optional port, without scheme
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Region passed to the backend SDK
    #[serde(default = "default_region")]
    pub region: String,

    /// Relativization mode for catalog and mapper
    #[serde(default)]
    pub path_mode: PathMode,

    /// Per-item failure policy for bulk transfers
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_https: true,
            endpoint: default_endpoint(),
            region: default_region(),
            path_mode: PathMode::default(),
            on_error: ErrorPolicy::default(),
        }
    }
}

impl Settings {
    /// Base URL of the store, honouring `use_https`
    pub fn endpoint_url(&self) -> Result<Url> {
        let scheme = if self.use_https { "https" } else { "http" };
        let host = self
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        Ok(Url::parse(&format!("{scheme}://{host}"))?)
    }
}

/// Immutable connection and container configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    account_name: String,
    account_key: String,
    container_name: String,
    settings: Settings,
}

impl StoreConfig {
    /// Create a configuration with default settings (https on)
    pub fn new(
        account_name: impl Into<String>,
        account_key: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Result<Self> {
        Self::with_settings(account_name, account_key, container_name, Settings::default())
    }

    /// Create a configuration with explicit settings
    pub fn with_settings(
        account_name: impl Into<String>,
        account_key: impl Into<String>,
        container_name: impl Into<String>,
        settings: Settings,
    ) -> Result<Self> {
        let account_name = account_name.into();
        let account_key = account_key.into();
        let container_name = container_name.into();

        if !is_valid_account_name(&account_name) {
            return Err(Error::Credential(format!(
                "Account name '{account_name}' must be non-empty and use only letters, digits, '-', '_' or '.'"
            )));
        }
        if account_key.is_empty() {
            return Err(Error::Credential("Account key cannot be empty".into()));
        }
        if !is_valid_container_name(&container_name) {
            return Err(Error::Config(format!(
                "Container name '{container_name}' must be 3-63 lowercase letters, digits, '-' or '.', starting and ending with a letter or digit"
            )));
        }

        Ok(Self {
            account_name,
            account_key,
            container_name,
            settings,
        })
    }

    /// Account name (access key id)
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Account key (secret)
    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    /// Container every operation is scoped to
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Non-secret settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shorthand for `settings().use_https`
    pub fn use_https(&self) -> bool {
        self.settings.use_https
    }
}

fn is_valid_account_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

fn is_valid_container_name(name: &str) -> bool {
    let valid_len = (3..=63).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_ends = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());
    valid_len && valid_chars && valid_ends
}

/// On-disk configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Store settings
    #[serde(default)]
    pub settings: Settings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings: Settings::default(),
        }
    }
}

/// Configuration manager handles loading and saving settings
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("blobsync").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load settings from disk
    ///
    /// A missing file yields default settings.
    pub fn load(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let file: ConfigFile = toml::from_str(&content)?;

        if file.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}",
                file.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(file.settings)
    }

    /// Save settings to disk, creating parent directories as needed
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = ConfigFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(&self.config_path, content)?;

        Ok(())
    }
}

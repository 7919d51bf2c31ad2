//! TOML Configuration File Support
//!
//! Configuration is loaded from `~/.config/geo-explorer/config.toml` (or a
//! path given on the command line) and then overridden from the environment.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! model = "gemini-2.5-flash"
//! request_timeout_secs = 120
//!
//! [location]
//! enabled = true
//! latitude = 48.8584
//! longitude = 2.2945
//!
//! [limits]
//! max_message_size = 32768
//! max_attachment_bytes = 20971520
//! ```
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY`: API key (the first one set wins)
//! - `GEMINI_API_BASE`: REST endpoint base
//! - `GEO_EXPLORER_MODEL`: model name
//! - `GEO_EXPLORER_LOCATION`: `lat,lng`; also enables location bias
//! - `GEO_EXPLORER_MAX_ATTACHMENT_BYTES`: attachment size limit

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::LatLng;
use crate::security::ConductorLimits;

/// Default REST endpoint base
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the configuration came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Built-in defaults only
    #[default]
    Default,
    /// A TOML file was read
    File,
    /// At least one environment variable was applied
    Env,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File => write!(f, "config file"),
            Self::Env => write!(f, "environment"),
        }
    }
}

// =============================================================================
// Configuration Structures
// =============================================================================

/// `[backend]` section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// REST endpoint base
    pub api_base: String,
    /// Model name
    pub model: String,
    /// API key (prefer the environment)
    pub api_key: Option<String>,
    /// Whole-request timeout for a streamed turn
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: 120,
        }
    }
}

/// `[location]` section
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Capture a location bias at startup
    pub enabled: bool,
    /// Fixed latitude
    pub latitude: Option<f64>,
    /// Fixed longitude
    pub longitude: Option<f64>,
}

impl LocationSettings {
    /// The configured coordinate, if both halves are present and in range
    #[must_use]
    pub fn coords(&self) -> Option<LatLng> {
        LatLng::new(self.latitude?, self.longitude?).ok()
    }
}

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Chat backend
    pub backend: BackendSettings,
    /// Location bias
    pub location: LocationSettings,
    /// Input limits
    pub limits: ConductorLimits,
    /// File this configuration was read from
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
    #[serde(skip)]
    source: ConfigSource,
}

impl ExplorerConfig {
    /// Where the configuration came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Unparseable values are ignored with a warning so a stray variable never
    /// prevents startup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = false;

        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            self.backend.api_key = Some(key);
            applied = true;
        }
        if let Some(base) = lookup("GEMINI_API_BASE") {
            self.backend.api_base = base;
            applied = true;
        }
        if let Some(model) = lookup("GEO_EXPLORER_MODEL") {
            self.backend.model = model;
            applied = true;
        }
        if let Some(raw) = lookup("GEO_EXPLORER_LOCATION") {
            match raw.parse::<LatLng>() {
                Ok(coords) => {
                    self.location.enabled = true;
                    self.location.latitude = Some(coords.latitude);
                    self.location.longitude = Some(coords.longitude);
                    applied = true;
                }
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring GEO_EXPLORER_LOCATION"),
            }
        }
        if let Some(raw) = lookup("GEO_EXPLORER_MAX_ATTACHMENT_BYTES") {
            match raw.parse::<u64>() {
                Ok(bytes) => {
                    self.limits.max_attachment_bytes = bytes;
                    applied = true;
                }
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Ignoring GEO_EXPLORER_MAX_ATTACHMENT_BYTES");
                }
            }
        }

        if applied {
            self.source = ConfigSource::Env;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.model is empty".to_string()));
        }
        if self.backend.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.api_base is empty".to_string()));
        }
        if self.location.enabled && self.location.latitude.is_some() != self.location.longitude.is_some() {
            return Err(ConfigError::ValidationError(
                "location needs both latitude and longitude".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("geo-explorer").join("config.toml"))
}

/// Load configuration from `path` (or the default path), then the environment
///
/// An explicitly given path must exist; a missing default file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<ExplorerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_file(&path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "Config file not found, using defaults");
                ExplorerConfig::default()
            }
            None => ExplorerConfig::default(),
        },
    };

    config.apply_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

fn read_file(path: &Path) -> Result<ExplorerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut config = ExplorerConfig::from_toml_str(&content)?;
    config.config_file_path = Some(path.to_path_buf());
    config.source = ConfigSource::File;

    tracing::info!(path = %path.display(), "Loaded configuration from file");
    Ok(config)
}

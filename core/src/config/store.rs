//! Configuration Store
//!
//! Handles loading/saving the typelens TOML config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TypelensError};

/// Unified typelens configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How to reach a script runtime
    #[serde(default)]
    pub inspector: InspectorConfig,

    /// Annotation rendering
    #[serde(default)]
    pub annotate: AnnotateConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Runtime and inspector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Node executable used to launch a fresh runtime per request
    #[serde(default = "default_node_binary")]
    pub node_binary: String,

    /// Extra node flags, placed before the keep-alive script
    #[serde(default)]
    pub node_args: Vec<String>,

    /// Fixed inspector endpoint; when set, no runtime is launched and
    /// requests are serialised onto it
    #[serde(default)]
    pub endpoint: Option<String>,

    /// How long to wait for a launched runtime to print its endpoint.
    /// Script execution itself is never timed out.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Prefix for the sourceURL given to compiled snippets
    #[serde(default = "default_source_url_prefix")]
    pub source_url_prefix: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            node_binary: default_node_binary(),
            node_args: Vec::new(),
            endpoint: None,
            startup_timeout_secs: default_startup_timeout(),
            source_url_prefix: default_source_url_prefix(),
        }
    }
}

/// Marker rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateConfig {
    /// Background colour of type markers
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            marker_color: default_marker_color(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Page template overriding the built-in one
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Source annotated for plain `GET /`
    #[serde(default)]
    pub example: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            template: None,
            example: None,
        }
    }
}

fn default_node_binary() -> String {
    "node".to_string()
}

fn default_startup_timeout() -> u64 {
    10
}

fn default_source_url_prefix() -> String {
    "typelens://snippet".to_string()
}

fn default_marker_color() -> String {
    "#ffe680".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    41902
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content).map_err(|e| TypelensError::InvalidConfig {
            message: format!("{}: {}", path.as_ref().display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to the on-disk TOML form
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TypelensError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load an explicit file, else the first file found in the standard
    /// locations, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match super::find_config_file() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        super::get_config_dir().map(|d| d.join(super::CONFIG_FILE_NAME))
    }

    /// Reject settings that can only fail later
    pub fn validate(&self) -> Result<()> {
        if self.inspector.node_binary.trim().is_empty() {
            return Err(TypelensError::InvalidConfig {
                message: "inspector.node_binary must not be empty".to_string(),
            });
        }
        if let Some(endpoint) = &self.inspector.endpoint {
            if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
                return Err(TypelensError::InvalidConfig {
                    message: format!("inspector.endpoint must be a ws:// URL, got '{}'", endpoint),
                });
            }
        }
        if self.inspector.startup_timeout_secs == 0 {
            return Err(TypelensError::InvalidConfig {
                message: "inspector.startup_timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

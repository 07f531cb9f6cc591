//! Configuration file structures for wasm-executor.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`ServerConfigFile`]: HTTP server settings
//! - [`AdminConfig`]: Admin token guarding module loads
//! - [`LoaderConfig`]: Where module paths are resolved and allowed from
//! - [`ModuleEntry`]: Module registered at startup

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::RuntimeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [runtime.engine]
/// fuel_metering = true
///
/// [runtime.execution]
/// max_fuel = 10_000_000
/// max_memory_mb = 64
///
/// [server]
/// bind_addr = "0.0.0.0:8080"
/// request_timeout_secs = 30
///
/// [admin]
/// enabled = true
/// token = "your-secret-token"
///
/// [loader]
/// base_dir = "/srv/modules"
/// allowed_dirs = ["/srv/modules"]
///
/// [[modules]]
/// path = "adder.wasm"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Runtime configuration (engine + execution settings).
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfigFile,

    /// Admin token configuration.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Module path resolution and restrictions.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Modules to register at startup.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// HTTP server configuration from config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfigFile {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,

    /// Request timeout in seconds.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Enable graceful shutdown.
    #[serde(default = "defaults::graceful_shutdown")]
    pub graceful_shutdown: bool,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            request_timeout_secs: defaults::request_timeout_secs(),
            graceful_shutdown: defaults::graceful_shutdown(),
        }
    }
}

/// Admin configuration.
///
/// Loading a module is a privileged operation. When enabled, HTTP clients
/// must present this token in the `X-Admin-Token` header to load modules.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Require the admin token for module loads.
    #[serde(default)]
    pub enabled: bool,

    /// Authentication token (required when enabled).
    pub token: Option<String>,
}

impl AdminConfig {
    /// Check if the admin token is properly configured.
    ///
    /// Returns `true` if enabled and token is set.
    pub fn is_configured(&self) -> bool {
        self.enabled && self.token.is_some()
    }
}

/// Module path resolution settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Directory relative module paths are resolved against.
    ///
    /// Defaults to the process working directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Directories modules may be loaded from.
    ///
    /// Empty means any directory.
    #[serde(default)]
    pub allowed_dirs: Vec<PathBuf>,
}

/// A module entry to register at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleEntry {
    /// Path to the WebAssembly module file (binary or text).
    ///
    /// The instance id is derived from the canonical form of this path.
    pub path: String,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn bind_addr() -> String {
        "127.0.0.1:8080".to_string()
    }

    pub const fn request_timeout_secs() -> u64 {
        30
    }

    pub const fn graceful_shutdown() -> bool {
        true
    }
}

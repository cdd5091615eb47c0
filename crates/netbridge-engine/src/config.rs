//! Bridge configuration (netbridge.toml)
//!
//! Every field has a default, so an absent file and an empty file mean the
//! same thing. Paths are relative to the module base directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::HostConfig;

/// Name of the optional configuration file in the module base directory
pub const CONFIG_FILE_NAME: &str = "netbridge.toml";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory holding the managed API assemblies
    pub runtime_dir: PathBuf,

    /// Hosting library, relative to the base directory
    pub hostfxr_path: PathBuf,

    /// Name of the assembly load context plugins are loaded into
    pub load_context_name: String,

    /// Full name of the class every managed plugin derives from
    pub plugin_base_class: String,

    /// Ask the runtime to report internal calls it cannot bind
    pub warn_on_missing_internal_calls: bool,

    /// Load plugin assemblies as collectible
    pub collectible_assemblies: bool,

    /// Trampoline compiler settings
    pub jit: JitSettings,

    /// Garbage collector settings
    pub gc: GcSettings,
}

/// Trampoline compiler settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct JitSettings {
    /// Code generator optimization level
    pub opt_level: OptLevel,
}

/// Code generator optimization level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    /// No optimization
    None,
    /// Optimize for speed
    #[default]
    Speed,
    /// Optimize for speed and size
    SpeedAndSize,
}

impl OptLevel {
    /// Value of the code generator's `opt_level` flag
    pub fn as_flag(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Garbage collector settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GcSettings {
    /// Run a blocking collection before the runtime shuts down
    pub collect_on_shutdown: bool,
}

impl Default for GcSettings {
    fn default() -> Self {
        GcSettings {
            collect_on_shutdown: true,
        }
    }
}

#[cfg(target_os = "windows")]
const HOSTFXR_FILE: &str = "hostfxr.dll";
#[cfg(target_os = "macos")]
const HOSTFXR_FILE: &str = "libhostfxr.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const HOSTFXR_FILE: &str = "libhostfxr.so";

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            runtime_dir: PathBuf::from("api"),
            hostfxr_path: Path::new("dotnet/host/fxr/8.0.3").join(HOSTFXR_FILE),
            load_context_name: "PluginContext".to_string(),
            plugin_base_class: "Plugify.Plugin".to_string(),
            warn_on_missing_internal_calls: cfg!(debug_assertions),
            collectible_assemblies: true,
            jit: JitSettings::default(),
            gc: GcSettings::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load `netbridge.toml` from `base_dir`, falling back to defaults when absent
    pub fn load_or_default(base_dir: &Path) -> Result<Self, ConfigError> {
        let path = base_dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a configuration string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_context_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "load_context_name cannot be empty".to_string(),
            ));
        }

        // The base class is matched against full type names: "Namespace.Class"
        if self.plugin_base_class.is_empty()
            || self.plugin_base_class.starts_with('.')
            || self.plugin_base_class.ends_with('.')
        {
            return Err(ConfigError::ValidationError(format!(
                "Invalid plugin_base_class: '{}'",
                self.plugin_base_class
            )));
        }

        if self.hostfxr_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "hostfxr_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the paths handed to the runtime host
    pub fn host_config(&self, base_dir: &Path) -> HostConfig {
        HostConfig {
            hostfxr_path: base_dir.join(&self.hostfxr_path),
            root_directory: base_dir.join(&self.runtime_dir),
        }
    }
}

//! Host-facing plugin data and the provider seam

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use netbridge_sdk::MethodDescriptor;
use serde::{Deserialize, Serialize};

/// Host-assigned plugin identifier
pub type PluginId = i64;

/// Severity of a log line sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fatal
    Fatal,
    /// Error
    Error,
    /// Warning
    Warning,
    /// Information
    Info,
    /// Debug output
    Debug,
    /// Very verbose output
    Verbose,
}

/// Services the embedding host provides to the bridge
pub trait Provider: Send + Sync {
    /// Write one log line to the host's sink
    fn log(&self, message: &str, severity: Severity);

    /// Base directory of the bridge module
    fn base_dir(&self) -> PathBuf;

    /// `true` if a language module with `name` (and at least or exactly
    /// `version`, when given) is loaded
    fn is_module_loaded(&self, name: &str, version: Option<i32>, minimum: bool) -> bool;

    /// `true` if a plugin with `name` (and version) is loaded
    fn is_plugin_loaded(&self, name: &str, version: Option<i32>, minimum: bool) -> bool;
}

/// A dependency on another plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginReference {
    /// Plugin name
    pub name: String,
    /// Load even when missing
    #[serde(default)]
    pub optional: bool,
    /// Required version
    #[serde(default)]
    pub requested_version: Option<i32>,
}

/// Plugin manifest contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginDescriptor {
    /// Free-form description
    pub description: String,
    /// Human-readable version
    pub version_name: String,
    /// Author
    pub created_by: String,
    /// Author website
    #[serde(rename = "createdByURL")]
    pub created_by_url: String,
    /// Assembly path relative to the plugin base dir
    pub entry_point: String,
    /// Other plugins this one needs
    pub dependencies: Vec<PluginReference>,
    /// Functions the plugin exports to other plugins
    pub exported_methods: Vec<MethodDescriptor>,
}

impl PluginDescriptor {
    /// Parse a manifest
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A descriptor paired with the native address that implements it
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedMethod {
    /// Signature and name
    pub descriptor: MethodDescriptor,
    /// Entry point, as an integer so the struct stays `Send`
    pub address: usize,
}

/// Everything the host knows about one plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Host-assigned id
    pub id: PluginId,
    /// Unique name
    pub name: String,
    /// Display name
    pub friendly_name: String,
    /// Plugin directory
    pub base_dir: PathBuf,
    /// Manifest
    pub descriptor: PluginDescriptor,
    /// Resource files by relative path
    pub resources: BTreeMap<String, PathBuf>,
    /// Exported functions with their addresses, filled for native plugins
    /// and by the bridge for managed ones
    pub methods: Vec<ExportedMethod>,
}

impl PluginInfo {
    /// A plugin with an empty manifest
    pub fn new(id: PluginId, name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        PluginInfo {
            id,
            friendly_name: name.clone(),
            name,
            base_dir: base_dir.into(),
            descriptor: PluginDescriptor::default(),
            resources: BTreeMap::new(),
            methods: Vec::new(),
        }
    }

    /// Absolute path of the entry assembly
    pub fn entry_point(&self) -> PathBuf {
        self.base_dir.join(&self.descriptor.entry_point)
    }

    /// Resolve a resource path
    pub fn find_resource(&self, path: &str) -> Option<&Path> {
        self.resources.get(path).map(PathBuf::as_path)
    }
}

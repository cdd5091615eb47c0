//! A running instance of a managed plugin class

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use netbridge_sdk::MethodDescriptor;

use super::plugin::{ExportedMethod, PluginId, PluginInfo};
use crate::reflect::{ManagedObject, MethodInfo, Type};

/// The plugin class instance plus its lifecycle hooks and exports.
///
/// The instance is destroyed when the script is dropped.
pub struct ScriptInstance {
    id: PluginId,
    name: String,
    instance: ManagedObject,
    on_start: MethodInfo,
    on_end: MethodInfo,
    exports: Vec<ExportedMethod>,
    resources: BTreeMap<String, PathBuf>,
}

impl ScriptInstance {
    /// Instantiate `class` and populate its plugin properties
    pub fn new(plugin: &PluginInfo, class: &Type, exports: Vec<ExportedMethod>) -> Self {
        let instance = class.create_instance(&[]);
        if !instance.is_valid() {
            tracing::warn!(plugin = %plugin.name, class = %class.full_name(), "Failed to create plugin instance");
        }

        let descriptor = &plugin.descriptor;
        let strings = [
            ("Name", plugin.name.clone()),
            ("FullName", plugin.friendly_name.clone()),
            ("Description", descriptor.description.clone()),
            ("Version", descriptor.version_name.clone()),
            ("Author", descriptor.created_by.clone()),
            ("Website", descriptor.created_by_url.clone()),
            ("BaseDir", plugin.base_dir.to_string_lossy().into_owned()),
        ];
        let dependencies: Vec<String> =
            descriptor.dependencies.iter().map(|dep| dep.name.clone()).collect();

        instance.set_property_value("Id", &plugin.id);
        for (property, value) in &strings {
            instance.set_property_value(property, value);
        }
        instance.set_property_value("Dependencies", &dependencies);

        ScriptInstance {
            id: plugin.id,
            name: plugin.name.clone(),
            on_start: class.method("OnStart"),
            on_end: class.method("OnEnd"),
            instance,
            exports,
            resources: plugin.resources.clone(),
        }
    }

    /// Owning plugin
    pub fn id(&self) -> PluginId {
        self.id
    }

    /// Plugin name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The managed plugin object
    pub fn instance(&self) -> &ManagedObject {
        &self.instance
    }

    /// Exported functions with their generated entry points
    pub fn exports(&self) -> &[ExportedMethod] {
        &self.exports
    }

    /// Absolute path of a packaged resource
    pub fn find_resource(&self, path: &str) -> Option<&Path> {
        self.resources.get(path).map(PathBuf::as_path)
    }

    /// Run `OnStart` if the class defines it
    pub fn start(&self) {
        if self.on_start.is_valid() {
            self.instance.invoke_method_info(&self.on_start, &[]);
        }
    }

    /// Run `OnEnd` if the class defines it
    pub fn end(&self) {
        if self.on_end.is_valid() {
            self.instance.invoke_method_info(&self.on_end, &[]);
        }
    }

    /// Find an export or a callback prototype nested in one by name
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.exports.iter().find_map(|export| {
            if export.descriptor.name == name {
                Some(&export.descriptor)
            } else {
                export.descriptor.find_prototype(name)
            }
        })
    }
}

impl Drop for ScriptInstance {
    fn drop(&mut self) {
        self.instance.destroy();
    }
}

impl std::fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("exports", &self.exports.len())
            .finish()
    }
}

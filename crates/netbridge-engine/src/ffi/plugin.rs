//! Host queries exposed to managed plugins

use std::ffi::c_char;
use std::path::Path;
use std::ptr;

use netbridge_sdk::memory::{alloc_c_string, c_str_to_string};

use crate::module::{self, PluginId};

fn path_string(path: &Path) -> *mut c_char {
    alloc_c_string(&path.to_string_lossy())
}

/// Negative and `i32::MAX` both mean "any version"
fn requested_version(version: i32) -> Option<i32> {
    (version >= 0 && version != i32::MAX).then_some(version)
}

/// Base directory of the language module; the caller frees the string.
/// Null before initialization.
#[no_mangle]
pub extern "C" fn GetBaseDir() -> *mut c_char {
    module::global().map_or(ptr::null_mut(), |module| path_string(module.base_dir()))
}

/// Whether the host has a language module called `name` loaded
///
/// # Safety
/// `name` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn IsModuleLoaded(name: *const c_char, version: i32, minimum: bool) -> bool {
    let name = c_str_to_string(name);
    module::global().is_some_and(|module| {
        module
            .provider()
            .is_module_loaded(&name, requested_version(version), minimum)
    })
}

/// Whether the host has a plugin called `name` loaded
///
/// # Safety
/// `name` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn IsPluginLoaded(name: *const c_char, version: i32, minimum: bool) -> bool {
    let name = c_str_to_string(name);
    module::global().is_some_and(|module| {
        module
            .provider()
            .is_plugin_loaded(&name, requested_version(version), minimum)
    })
}

/// Absolute path of a packaged plugin resource, null if unknown.
/// The caller frees the string.
///
/// # Safety
/// `path` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn FindPluginResource(id: PluginId, path: *const c_char) -> *mut c_char {
    let path = c_str_to_string(path);
    module::global()
        .and_then(|module| module.find_resource(id, &path))
        .map_or(ptr::null_mut(), |found| path_string(&found))
}

//! Language module: the host-facing lifecycle
//!
//! One [`LanguageModule`] per process owns the runtime, the load context,
//! every plugin script and every internal-call trampoline. Teardown order
//! matters: managed objects and trampolines go before the assemblies, and
//! the assemblies before the runtime.

pub mod export;
pub mod plugin;
pub mod script;

pub use export::{resolve_export, split_function_name, validate_signature};
pub use plugin::{
    ExportedMethod, PluginDescriptor, PluginId, PluginInfo, PluginReference, Provider, Severity,
};
pub use script::ScriptInstance;

use std::backtrace::Backtrace;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use netbridge_sdk::{ManagedGuid, ManagedHandle, MessageLevel, MethodDescriptor, NativeString};
use once_cell::sync::Lazy;
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::assembly::{AssemblyLoadContext, ManagedAssembly};
use crate::config::BridgeConfig;
use crate::error::{ExportError, ModuleError, Result};
use crate::jit::{self, JitCallback, TrampolineCompiler};
use crate::marshal::storage;
use crate::runtime::{Runtime, RuntimeHost};

/// Prefix of every line sent to the host log
pub const LOG_PREFIX: &str = "[NETBRIDGE]";

// ============================================================================
// Global instance
// ============================================================================

static GLOBAL: Lazy<RwLock<Option<Arc<LanguageModule>>>> = Lazy::new(|| RwLock::new(None));

/// Make `module` the process-wide instance used by the C exports and the
/// runtime callbacks. Returns the previous one.
pub fn install(module: Arc<LanguageModule>) -> Option<Arc<LanguageModule>> {
    GLOBAL.write().replace(module)
}

/// Remove the process-wide instance
pub fn uninstall() -> Option<Arc<LanguageModule>> {
    GLOBAL.write().take()
}

/// The process-wide instance, if installed
pub fn global() -> Option<Arc<LanguageModule>> {
    GLOBAL.read().clone()
}

// ============================================================================
// Runtime callbacks
// ============================================================================

unsafe extern "C" fn on_message(message: NativeString, level: i32) {
    let severity = match MessageLevel::try_from(level) {
        Ok(MessageLevel::Info) => Severity::Info,
        Ok(MessageLevel::Warning) => Severity::Warning,
        Ok(MessageLevel::Error) => Severity::Error,
        _ => return,
    };
    log_line(&message.to_string_lossy(), severity);
}

unsafe extern "C" fn on_exception(message: NativeString) {
    log_line(&format!("[Exception] {}", message.to_string_lossy()), Severity::Error);
    tracing::debug!(target: "netbridge::managed", backtrace = %Backtrace::capture(), "Native stack at managed exception");
}

fn log_line(message: &str, severity: Severity) {
    match severity {
        Severity::Fatal | Severity::Error => tracing::error!(target: "netbridge::managed", "{}", message),
        Severity::Warning => tracing::warn!(target: "netbridge::managed", "{}", message),
        Severity::Info => tracing::info!(target: "netbridge::managed", "{}", message),
        Severity::Debug | Severity::Verbose => tracing::debug!(target: "netbridge::managed", "{}", message),
    }
    if let Some(module) = global() {
        module.log(message, severity);
    }
}

// ============================================================================
// LanguageModule
// ============================================================================

/// The bridge as seen by the plugin host
pub struct LanguageModule {
    provider: Arc<dyn Provider>,
    config: BridgeConfig,
    base_dir: PathBuf,
    host: Mutex<Box<dyn RuntimeHost>>,
    runtime: Runtime,
    compiler: Arc<dyn TrampolineCompiler>,
    load_context: Mutex<AssemblyLoadContext>,
    plugin_assemblies: Mutex<FxHashMap<PluginId, ManagedGuid>>,
    scripts: RwLock<FxHashMap<PluginId, ScriptInstance>>,
    functions: Mutex<Vec<JitCallback>>,
    shut_down: AtomicBool,
}

impl LanguageModule {
    /// Start the runtime with the configuration found in the provider's base dir
    pub fn initialize(provider: Arc<dyn Provider>, host: Box<dyn RuntimeHost>) -> Result<Arc<Self>> {
        let base_dir = provider.base_dir();
        let config = BridgeConfig::load_or_default(&base_dir)?;
        let compiler = jit::default_compiler(config.jit.opt_level)?;
        Self::initialize_with(provider, host, config, compiler)
    }

    /// Start the runtime with explicit configuration and compiler
    pub fn initialize_with(
        provider: Arc<dyn Provider>,
        mut host: Box<dyn RuntimeHost>,
        config: BridgeConfig,
        compiler: Arc<dyn TrampolineCompiler>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let base_dir = provider.base_dir();

        let raw = host.initialize(&config.host_config(&base_dir))?;
        let runtime = Runtime::from_raw(&raw)?;
        unsafe { (runtime.initialize)(on_message, on_exception) };

        let load_context = AssemblyLoadContext::new(
            runtime.clone(),
            config.load_context_name.clone(),
            config.collectible_assemblies,
        );

        tracing::info!(base_dir = %base_dir.display(), compiler = compiler.name(), "Language module initialized");

        Ok(Arc::new(LanguageModule {
            provider,
            config,
            base_dir,
            host: Mutex::new(host),
            runtime,
            compiler,
            load_context: Mutex::new(load_context),
            plugin_assemblies: Mutex::new(FxHashMap::default()),
            scripts: RwLock::new(FxHashMap::default()),
            functions: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }))
    }

    /// Tear everything down; later calls do nothing
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let scripts = std::mem::take(&mut *self.scripts.write());
        drop(scripts);
        self.functions.lock().clear();
        self.plugin_assemblies.lock().clear();
        self.load_context.lock().unload();

        if self.config.gc.collect_on_shutdown {
            let gc = self.runtime.gc();
            gc.collect();
            gc.wait_for_pending_finalizers();
        }

        unsafe { (self.runtime.shutdown)() };
        self.host.lock().shutdown();

        for (kind, count) in storage::report_leaks() {
            self.log(
                &format!("Memory leaks detected: {} allocations. Related to {}!", count, kind),
                Severity::Error,
            );
        }
        tracing::info!("Language module shut down");
    }

    /// Send one prefixed line to the host log
    pub fn log(&self, message: &str, severity: Severity) {
        self.provider.log(&format!("{} {}", LOG_PREFIX, message), severity);
    }

    /// Host collaborator
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Effective configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Base directory of the module
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Runtime entry points
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Trampoline compiler in use
    pub fn compiler(&self) -> &dyn TrampolineCompiler {
        &*self.compiler
    }

    /// Number of internal-call trampolines alive
    pub fn function_count(&self) -> usize {
        self.functions.lock().len()
    }

    /// Load a plugin: its assembly, class, exports and instance.
    ///
    /// Every export mismatch is collected into one error. On success the
    /// generated entry point of each export is returned for the host to
    /// publish.
    pub fn on_plugin_load(&self, plugin: &PluginInfo) -> Result<Vec<ExportedMethod>> {
        if self.scripts.read_recursive().contains_key(&plugin.id) {
            return Err(ModuleError::DuplicatePlugin);
        }

        let (assembly_id, class, resolved) = {
            let mut context = self.load_context.lock();
            let assembly = context.load_assembly(&plugin.entry_point())?;
            let base_class = &self.config.plugin_base_class;
            let class = assembly
                .get_type_by_base_type(base_class)
                .cloned()
                .ok_or_else(|| ModuleError::PluginClassMissing(base_class.clone()))?;

            let mut errors = Vec::new();
            let mut resolved = Vec::new();
            for method in &plugin.descriptor.exported_methods {
                match resolve_export(method, |name| assembly.get_type(name)) {
                    Ok((ty, info)) => resolved.push((method.clone(), ty.handle(), info.handle())),
                    Err(mut mismatches) => errors.append(&mut mismatches),
                }
            }
            if !errors.is_empty() {
                return Err(self.export_failure(plugin, errors));
            }
            (assembly.id(), class, resolved)
        };

        let (callbacks, exports) = self.compile_exports(resolved)?;

        self.functions.lock().extend(callbacks);
        self.plugin_assemblies.lock().insert(plugin.id, assembly_id);

        let script = ScriptInstance::new(plugin, &class, exports.clone());
        self.scripts.write().insert(plugin.id, script);

        tracing::info!(plugin = %plugin.name, exports = exports.len(), "Plugin loaded");
        Ok(exports)
    }

    fn compile_exports(
        &self,
        resolved: Vec<(MethodDescriptor, ManagedHandle, ManagedHandle)>,
    ) -> Result<(Vec<JitCallback>, Vec<ExportedMethod>)> {
        let mut errors = Vec::new();
        let mut callbacks = Vec::with_capacity(resolved.len());
        let mut exports = Vec::with_capacity(resolved.len());

        for (method, type_handle, method_handle) in resolved {
            let method = Arc::new(method);
            let callback = JitCallback::new_internal(
                &*self.compiler,
                method.clone(),
                self.runtime.clone(),
                type_handle,
                method_handle,
            );
            if let Some(error) = callback.error() {
                errors.push(ExportError::Jit {
                    name: method.func_name.clone(),
                    error: error.to_string(),
                });
                continue;
            }
            exports.push(ExportedMethod {
                descriptor: (*method).clone(),
                address: callback.function() as usize,
            });
            callbacks.push(callback);
        }

        if errors.is_empty() {
            Ok((callbacks, exports))
        } else {
            Err(ModuleError::Exports(errors))
        }
    }

    fn export_failure(&self, plugin: &PluginInfo, errors: Vec<ExportError>) -> ModuleError {
        for error in &errors {
            tracing::warn!(plugin = %plugin.name, %error, "Export validation failed");
        }
        ModuleError::Exports(errors)
    }

    /// Run `OnStart` of a loaded plugin; `false` if unknown
    pub fn on_plugin_start(&self, id: PluginId) -> bool {
        self.find_script(id).map(|script| script.start()).is_some()
    }

    /// Run `OnEnd` of a loaded plugin; `false` if unknown
    pub fn on_plugin_end(&self, id: PluginId) -> bool {
        self.find_script(id).map(|script| script.end()).is_some()
    }

    /// Bind the exports of `plugin` as internal calls of the loaded assemblies.
    ///
    /// A managed plugin's exports go to every other assembly under
    /// `{plugin}.{plugin}`, bound to the managed method's own entry point so
    /// managed callers never pass through a trampoline. A native plugin's
    /// exports go to every assembly under the same class with a `__` prefix.
    /// Each assembly then uploads its queue once.
    pub fn on_method_export(&self, plugin: &PluginInfo) {
        let class = format!("{0}.{0}", plugin.name);
        let managed = self.scripts.read_recursive().contains_key(&plugin.id);
        let own_assembly = self
            .plugin_assemblies
            .lock()
            .get(&plugin.id)
            .copied()
            .filter(|_| managed);

        let mut context = self.load_context.lock();
        let owner = own_assembly.and_then(|id| context.find_assembly(id));
        let bindings: Vec<(String, usize)> = plugin
            .methods
            .iter()
            .filter_map(|method| {
                let address = owner
                    .and_then(|assembly| managed_entry_point(assembly, &method.descriptor.func_name))
                    .unwrap_or(method.address);
                if address == 0 {
                    tracing::warn!(plugin = %plugin.name, method = %method.descriptor.name, "Exported method has no address");
                    return None;
                }
                let member = if managed {
                    method.descriptor.name.clone()
                } else {
                    format!("__{}", method.descriptor.name)
                };
                Some((member, address))
            })
            .collect();

        for assembly in context.assemblies_mut() {
            if Some(assembly.id()) == own_assembly {
                continue;
            }
            for (member, address) in &bindings {
                assembly.add_internal_call(&class, member, *address as *const c_void);
            }
        }
        for assembly in context.assemblies_mut() {
            assembly.upload_internal_calls(self.config.warn_on_missing_internal_calls);
        }
    }

    /// Borrow a loaded plugin's script
    pub fn find_script(&self, id: PluginId) -> Option<MappedRwLockReadGuard<'_, ScriptInstance>> {
        RwLockReadGuard::try_map(self.scripts.read_recursive(), |scripts| scripts.get(&id)).ok()
    }

    /// Resource of a loaded plugin, resolved to an absolute path
    pub fn find_resource(&self, id: PluginId, path: &str) -> Option<PathBuf> {
        self.find_script(id)?.find_resource(path).map(Path::to_path_buf)
    }

    /// Find an exported method or callback prototype across every script
    pub fn find_method(&self, name: &str) -> Option<MethodDescriptor> {
        self.scripts
            .read_recursive()
            .values()
            .find_map(|script| script.find_method(name).cloned())
    }

    /// Turn a managed delegate into a native function pointer with the
    /// signature of the prototype called `name`
    pub fn new_callback(&self, name: &str, delegate: ManagedHandle) -> JitCallback {
        match self.find_method(name) {
            Some(method) => JitCallback::new_delegate(
                &*self.compiler,
                Arc::new(method),
                self.runtime.clone(),
                delegate,
            ),
            None => JitCallback::failed(format!("Method prototype '{}' not found", name)),
        }
    }
}

/// Entry point of the managed method `func_name` declared in `assembly`
fn managed_entry_point(assembly: &ManagedAssembly, func_name: &str) -> Option<usize> {
    let (class, method) = split_function_name(func_name).ok()?;
    let address = assembly.get_type(&class)?.method(&method).function_address();
    (!address.is_null()).then_some(address as usize)
}

impl Drop for LanguageModule {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LanguageModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModule")
            .field("base_dir", &self.base_dir)
            .field("compiler", &self.compiler.name())
            .field("scripts", &self.scripts.read_recursive().len())
            .finish()
    }
}

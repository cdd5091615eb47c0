//! Plugin lifecycle through the language module.
//!
//! Most tests use the stub compiler: entry points are placeholders and are
//! only compared, never called. The Cranelift variant at the bottom calls a
//! generated export end to end.

mod common;

use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::Arc;

use netbridge_engine::error::ExportError;
use netbridge_engine::module::{ExportedMethod, PluginReference};
use netbridge_engine::{
    BridgeConfig, LanguageModule, LoadError, ModuleError, PluginInfo, PreloadedHost, StubCompiler,
    TrampolineCompiler,
};
use netbridge_sdk::{ManagedGuid, ManagedHandle, MethodDescriptor, ParamDescriptor, ValueType};
use tempfile::TempDir;

use common::{add_assembly, add_method, add_type, builtin, RecordingProvider};

const PLUGIN_ID: i64 = 7;

fn add(args: &[*const c_void], ret: *mut c_void) {
    unsafe { *(ret as *mut i32) = *(args[0] as *const i32) + *(args[1] as *const i32) };
}

struct Sample {
    dir: TempDir,
    assembly: ManagedGuid,
    plugin_class: ManagedHandle,
    math: ManagedHandle,
    add: ManagedHandle,
    on_start: ManagedHandle,
    on_end: ManagedHandle,
}

/// Registers `Sample.dll`: a plugin class plus `Sample.Math` with `Add`
/// and `Apply`
fn sample_runtime() -> Sample {
    common::reset();
    let base = add_type("Plugify.Plugin", 0);
    let plugin_class = add_type("Sample.SamplePlugin", base);
    let on_start = add_method(plugin_class, "OnStart", &[], builtin(ValueType::Void), None);
    let on_end = add_method(plugin_class, "OnEnd", &[], builtin(ValueType::Void), None);

    let math = add_type("Sample.Math", 0);
    let int32 = builtin(ValueType::Int32);
    let add = add_method(math, "Add", &[int32, int32], int32, Some(add));
    add_method(
        math,
        "Apply",
        &[builtin(ValueType::Function), int32],
        int32,
        None,
    );

    let assembly = add_assembly("Sample.dll", "Sample", &[base, plugin_class, math]);
    Sample {
        dir: tempfile::tempdir().unwrap(),
        assembly,
        plugin_class,
        math,
        add,
        on_start,
        on_end,
    }
}

fn add_descriptor() -> MethodDescriptor {
    MethodDescriptor::new("Add", "Sample.Math.Add")
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_return(ParamDescriptor::new(ValueType::Int32))
}

fn apply_descriptor() -> MethodDescriptor {
    let transform = MethodDescriptor::new("Transform", "")
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_return(ParamDescriptor::new(ValueType::Int32));
    MethodDescriptor::new("Apply", "Sample.Math.Apply")
        .with_param(ParamDescriptor::new(ValueType::Function).with_prototype(transform))
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_return(ParamDescriptor::new(ValueType::Int32))
}

fn sample_plugin(sample: &Sample, exports: Vec<MethodDescriptor>) -> PluginInfo {
    let mut plugin = PluginInfo::new(PLUGIN_ID, "Sample", sample.dir.path());
    plugin.friendly_name = "Sample Plugin".to_string();
    plugin.descriptor.entry_point = "Sample.dll".to_string();
    plugin.descriptor.version_name = "1.2.0".to_string();
    plugin.descriptor.created_by = "Acme".to_string();
    plugin.descriptor.dependencies = vec![
        PluginReference {
            name: "Core".to_string(),
            optional: false,
            requested_version: None,
        },
        PluginReference {
            name: "Timers".to_string(),
            optional: true,
            requested_version: Some(2),
        },
    ];
    plugin.descriptor.exported_methods = exports;
    plugin
        .resources
        .insert("data/config.json".to_string(), sample.dir.path().join("data/config.json"));
    plugin
}

fn start_module(
    sample: &Sample,
    compiler: Arc<dyn TrampolineCompiler>,
) -> (Arc<RecordingProvider>, Arc<LanguageModule>) {
    let provider = Arc::new(RecordingProvider::new(sample.dir.path()));
    let module = LanguageModule::initialize_with(
        provider.clone(),
        Box::new(PreloadedHost::new(common::table())),
        BridgeConfig::default(),
        compiler,
    )
    .unwrap();
    (provider, module)
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_plugin_load_start_end_shutdown() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    assert!(common::with_state(|s| s.message_sink.is_some()));

    let plugin = sample_plugin(&sample, vec![add_descriptor(), apply_descriptor()]);
    let exports = module.on_plugin_load(&plugin).unwrap();
    assert_eq!(exports.len(), 2);
    assert_eq!(exports[0].descriptor.name, "Add");
    assert!(exports.iter().all(|export| export.address != 0));
    assert_eq!(module.function_count(), 2);

    // The plugin object is created once and described through its properties
    let created = common::with_state(|s| s.created.clone());
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, sample.plugin_class);
    assert_eq!(common::property("Id").as_deref(), Some("7"));
    assert_eq!(common::property("Name").as_deref(), Some("Sample"));
    assert_eq!(common::property("FullName").as_deref(), Some("Sample Plugin"));
    assert_eq!(common::property("Version").as_deref(), Some("1.2.0"));
    assert_eq!(common::property("Author").as_deref(), Some("Acme"));
    assert_eq!(common::property("Dependencies").as_deref(), Some("Core,Timers"));
    assert_eq!(
        common::property("BaseDir").map(PathBuf::from),
        Some(sample.dir.path().to_path_buf())
    );

    assert!(module.on_plugin_start(PLUGIN_ID));
    assert!(!module.on_plugin_start(PLUGIN_ID + 1));
    assert!(module.on_plugin_end(PLUGIN_ID));
    let invoked: Vec<ManagedHandle> = common::invocations().iter().map(|i| i.method).collect();
    assert_eq!(invoked, vec![sample.on_start, sample.on_end]);

    module.shutdown();
    common::with_state(|s| {
        assert_eq!(s.destroyed, vec![created[0].1]);
        assert_eq!(s.unloaded, vec![sample.assembly]);
        assert_eq!(s.collections, 1);
        assert_eq!(s.finalizer_waits, 1);
        assert_eq!(s.shutdowns, 1);
    });
    assert_eq!(module.function_count(), 0);

    module.shutdown();
    drop(module);
    assert_eq!(common::with_state(|s| s.shutdowns), 1);
}

#[test]
fn test_duplicate_plugin_is_rejected() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    let plugin = sample_plugin(&sample, vec![add_descriptor()]);

    module.on_plugin_load(&plugin).unwrap();
    let err = module.on_plugin_load(&plugin).unwrap_err();
    assert!(matches!(err, ModuleError::DuplicatePlugin));
    assert_eq!(err.to_string(), "Plugin key duplicate");
}

#[test]
fn test_script_lookups() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    let plugin = sample_plugin(&sample, vec![add_descriptor(), apply_descriptor()]);
    module.on_plugin_load(&plugin).unwrap();

    let script = module.find_script(PLUGIN_ID).unwrap();
    assert_eq!(script.name(), "Sample");
    assert_eq!(script.exports().len(), 2);
    drop(script);
    assert!(module.find_script(99).is_none());

    assert_eq!(module.find_method("Add").unwrap().func_name, "Sample.Math.Add");
    assert_eq!(module.find_method("Transform").unwrap().param_count(), 1);
    assert!(module.find_method("Subtract").is_none());

    assert_eq!(
        module.find_resource(PLUGIN_ID, "data/config.json"),
        Some(sample.dir.path().join("data/config.json"))
    );
    assert!(module.find_resource(PLUGIN_ID, "missing.txt").is_none());
    assert!(module.find_resource(99, "data/config.json").is_none());
}

#[test]
fn test_new_callback_needs_a_known_prototype() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    module
        .on_plugin_load(&sample_plugin(&sample, vec![apply_descriptor()]))
        .unwrap();

    let delegate = common::add_delegate(add);
    let callback = module.new_callback("Transform", delegate);
    assert!(callback.error().is_none());
    assert!(!callback.function().is_null());
    assert_eq!(callback.method().name, "Transform");

    let missing = module.new_callback("Untransform", delegate);
    assert!(missing.function().is_null());
    assert_eq!(missing.error(), Some("Method prototype 'Untransform' not found"));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_export_mismatches_are_all_reported() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));

    let wrong_add = MethodDescriptor::new("Add", "Sample.Math.Add")
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_return(ParamDescriptor::new(ValueType::Int64));
    let wrong_param = MethodDescriptor::new("Apply", "Sample.Math.Apply")
        .with_param(ParamDescriptor::new(ValueType::Pointer))
        .with_param(ParamDescriptor::new(ValueType::Int32))
        .with_return(ParamDescriptor::new(ValueType::Int32));
    let no_class = MethodDescriptor::new("Run", "Sample.Nope.Run");
    let no_method = MethodDescriptor::new("Run", "Sample.Math.Run");
    let bad_name = MethodDescriptor::new("Run", "Run");

    let plugin = sample_plugin(&sample, vec![wrong_add, wrong_param, no_class, no_method, bad_name]);
    let errors = match module.on_plugin_load(&plugin) {
        Err(ModuleError::Exports(errors)) => errors,
        other => panic!("expected export errors, got {:?}", other),
    };

    assert_eq!(
        errors,
        vec![
            ExportError::ReturnMismatch {
                name: "Sample.Math.Add".to_string(),
                got: "int64".to_string(),
                expected: "int32".to_string(),
            },
            ExportError::ParamCountMismatch {
                name: "Sample.Math.Add".to_string(),
                got: 1,
                expected: 2,
            },
            ExportError::ParamMismatch {
                name: "Sample.Math.Apply".to_string(),
                got: ValueType::Pointer.to_string(),
                index: 0,
                expected: "function".to_string(),
            },
            ExportError::ClassNotFound("Sample.Nope.Run".to_string()),
            ExportError::MethodNotFound("Sample.Math.Run".to_string()),
            ExportError::InvalidFormat("Run".to_string()),
        ]
    );

    assert_eq!(errors[3].to_string(), "Failed to find class 'Sample.Nope.Run'");

    assert!(!module.on_plugin_start(PLUGIN_ID));
    assert_eq!(module.function_count(), 0);
    assert!(common::with_state(|s| s.created.is_empty()));
}

#[test]
fn test_missing_plugin_class() {
    common::reset();
    let math = add_type("Sample.Math", 0);
    add_assembly("Sample.dll", "Sample", &[math]);
    let sample = Sample {
        dir: tempfile::tempdir().unwrap(),
        assembly: ManagedGuid::EMPTY,
        plugin_class: 0,
        math,
        add: 0,
        on_start: 0,
        on_end: 0,
    };
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));

    let err = module.on_plugin_load(&sample_plugin(&sample, vec![])).unwrap_err();
    assert_eq!(err.to_string(), "Failed to find 'Plugify.Plugin' class implementation");
}

#[test]
fn test_missing_assembly() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    let mut plugin = sample_plugin(&sample, vec![]);
    plugin.descriptor.entry_point = "Other.dll".to_string();

    let err = module.on_plugin_load(&plugin).unwrap_err();
    assert!(matches!(err, ModuleError::Load(LoadError::FileNotFound)));
}

#[test]
fn test_invalid_config_is_rejected_before_the_runtime_starts() {
    let sample = sample_runtime();
    let provider = Arc::new(RecordingProvider::new(sample.dir.path()));
    let config = BridgeConfig {
        load_context_name: " ".to_string(),
        ..BridgeConfig::default()
    };
    let result = LanguageModule::initialize_with(
        provider,
        Box::new(PreloadedHost::new(common::table())),
        config,
        Arc::new(StubCompiler::new()),
    );
    assert!(matches!(result, Err(ModuleError::Config(_))));
    assert!(common::with_state(|s| s.message_sink.is_none()));
}

#[test]
fn test_incomplete_table_is_rejected() {
    let sample = sample_runtime();
    let provider = Arc::new(RecordingProvider::new(sample.dir.path()));
    let mut table = common::table();
    table.get_enum_values = None;
    let err = LanguageModule::initialize_with(
        provider,
        Box::new(PreloadedHost::new(table)),
        BridgeConfig::default(),
        Arc::new(StubCompiler::new()),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Function table entry 'GetEnumValues' is missing");
}

// ============================================================================
// Method export
// ============================================================================

#[test]
fn test_native_exports_become_internal_calls() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    module
        .on_plugin_load(&sample_plugin(&sample, vec![add_descriptor()]))
        .unwrap();

    let mut native = PluginInfo::new(11, "Timers", sample.dir.path());
    native.methods = vec![
        ExportedMethod {
            descriptor: MethodDescriptor::new("Tick", "Timers.Tick"),
            address: 0x5000,
        },
        ExportedMethod {
            descriptor: MethodDescriptor::new("Unbound", "Timers.Unbound"),
            address: 0,
        },
        ExportedMethod {
            descriptor: MethodDescriptor::new("Reset", "Timers.Reset"),
            address: 0x5010,
        },
    ];
    module.on_method_export(&native);

    let batches = common::internal_call_batches();
    assert_eq!(batches.len(), 1);
    let (calls, warn) = &batches[0];
    assert_eq!(*warn, module.config().warn_on_missing_internal_calls);
    assert_eq!(
        calls,
        &vec![
            ("Timers.Timers@__Tick, Sample".to_string(), 0x5000),
            ("Timers.Timers@__Reset, Sample".to_string(), 0x5010),
        ]
    );
}

#[test]
fn test_managed_exports_skip_their_own_assembly() {
    let sample = sample_runtime();
    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    let mut plugin = sample_plugin(&sample, vec![add_descriptor()]);
    plugin.methods = module.on_plugin_load(&plugin).unwrap();

    module.on_method_export(&plugin);
    assert!(common::internal_call_batches().is_empty());
}

#[test]
fn test_managed_exports_reach_every_other_assembly() {
    let sample = sample_runtime();
    let other_base = add_type("Plugify.Plugin", 0);
    let other_class = add_type("Other.OtherPlugin", other_base);
    add_assembly("Other.dll", "Other", &[other_base, other_class]);

    let (_provider, module) = start_module(&sample, Arc::new(StubCompiler::new()));
    let mut first = sample_plugin(&sample, vec![add_descriptor()]);
    first.methods = module.on_plugin_load(&first).unwrap();
    let mut second = PluginInfo::new(PLUGIN_ID + 1, "Other", sample.dir.path());
    second.descriptor.entry_point = "Other.dll".to_string();
    module.on_plugin_load(&second).unwrap();

    module.on_method_export(&first);

    // Only Other uploads, bound to the managed method rather than the trampoline
    let batches = common::internal_call_batches();
    assert_eq!(batches.len(), 1);
    let (calls, _) = &batches[0];
    let entry_point = 0x7000_0000 + sample.add as usize;
    assert_eq!(calls, &vec![("Sample.Sample@Add, Other".to_string(), entry_point)]);
    assert_ne!(first.methods[0].address, entry_point);

    // Other has nothing to export, so Sample never receives a batch
    module.on_method_export(&second);
    assert_eq!(common::internal_call_batches().len(), 1);
}

// ============================================================================
// Generated code
// ============================================================================

#[cfg(feature = "jit")]
#[test]
fn test_exported_function_calls_managed_method() {
    use netbridge_engine::{CraneliftCompiler, OptLevel};

    let sample = sample_runtime();
    let compiler = CraneliftCompiler::host(OptLevel::Speed).unwrap();
    let (_provider, module) = start_module(&sample, Arc::new(compiler));
    let exports = module
        .on_plugin_load(&sample_plugin(&sample, vec![add_descriptor()]))
        .unwrap();

    let function: extern "C" fn(i32, i32) -> i32 =
        unsafe { std::mem::transmute(exports[0].address) };
    assert_eq!(function(2, 3), 5);
    assert_eq!(function(-10, 4), -6);

    let calls: Vec<_> = common::invocations()
        .into_iter()
        .filter(|call| call.method == sample.add)
        .collect();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.target == sample.math && call.arg_count == 2));
}

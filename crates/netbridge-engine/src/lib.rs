//! Netbridge interop engine
//!
//! This crate lets a native host load .NET plugin assemblies and call across
//! the boundary in both directions:
//! - **Runtime**: the managed function table and the host that provides it (`runtime` module)
//! - **Reflection**: proxies for types, methods, fields, properties and objects (`reflect` module)
//! - **Marshaling**: the value-category taxonomy and argument packing (`marshal` module)
//! - **JIT**: call and callback trampolines compiled with Cranelift (`jit` module)
//! - **Assemblies**: load contexts and internal-call registration (`assembly` module)
//! - **Module**: the plugin lifecycle driven by the host (`module` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use netbridge_engine::{LanguageModule, PreloadedHost};
//!
//! let module = LanguageModule::initialize(provider, Box::new(PreloadedHost::new(table)))?;
//! netbridge_engine::module::install(module.clone());
//!
//! let exports = module.on_plugin_load(&plugin)?;
//! module.on_plugin_start(plugin.id);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

// ============================================================================
// Core Modules
// ============================================================================

/// Bridge configuration loaded from `netbridge.toml`
pub mod config;

/// Error types shared by every layer
pub mod error;

/// Managed function table and runtime host
pub mod runtime;

/// Reflection proxies over managed handles
pub mod reflect;

/// Value categories and argument marshaling
pub mod marshal;

/// Trampoline compilation and dispatch
pub mod jit;

/// Assembly load contexts and internal calls
pub mod assembly;

/// Host-facing language module
pub mod module;

/// C exports consumed by the managed bindings
pub mod ffi;

// ============================================================================
// Re-exports
// ============================================================================

pub use assembly::{AssemblyLoadContext, ManagedAssembly};
pub use config::{BridgeConfig, ConfigError, OptLevel};
pub use error::{ExportError, InitError, JitError, LoadError, ModuleError, Result};
pub use jit::{JitCall, JitCallback, StubCompiler, TrampolineCompiler};
#[cfg(feature = "jit")]
pub use jit::CraneliftCompiler;
pub use module::{LanguageModule, PluginId, PluginInfo, Provider, Severity};
pub use reflect::{FieldInfo, ManagedObject, MethodInfo, PropertyInfo, Type};
pub use runtime::{FunctionTable, HostConfig, PreloadedHost, RawFunctionTable, Runtime, RuntimeHost};

pub use netbridge_sdk as sdk;

//! Inbound callbacks: real native function pointers that dispatch into
//! managed code

use std::ffi::c_void;
use std::sync::Arc;

use netbridge_sdk::{ManagedHandle, MethodDescriptor};

use super::compiler::{Trampoline, TrampolineCompiler};
use super::dispatch::{managed_call_handler, DispatchContext, DispatchTarget};
use crate::runtime::Runtime;

/// A compiled callback plus the data its code points at.
///
/// The descriptor and dispatch context are heap-allocated and embedded by
/// address in the generated code, so they live exactly as long as the
/// trampoline.
pub struct JitCallback {
    compiled: Result<Trampoline, String>,
    context: Option<Box<DispatchContext>>,
    method: Arc<MethodDescriptor>,
}

impl JitCallback {
    fn compile(
        compiler: &dyn TrampolineCompiler,
        method: Arc<MethodDescriptor>,
        target: DispatchTarget,
    ) -> Self {
        let mut context = Box::new(DispatchContext::new(compiler.abi(), target));
        let data = &mut *context as *mut DispatchContext as *mut c_void;
        let compiled = compiler
            .compile_callback(&method, managed_call_handler, Arc::as_ptr(&method), data)
            .map_err(|e| {
                tracing::warn!(method = %method.name, error = %e, "Failed to compile callback");
                e.to_string()
            });
        JitCallback { compiled, context: Some(context), method }
    }

    /// A callback invoking a static managed method, used for internal calls
    pub fn new_internal(
        compiler: &dyn TrampolineCompiler,
        method: Arc<MethodDescriptor>,
        runtime: Runtime,
        type_handle: ManagedHandle,
        method_handle: ManagedHandle,
    ) -> Self {
        let target = DispatchTarget::Static { runtime, type_handle, method_handle };
        Self::compile(compiler, method, target)
    }

    /// A callback invoking a managed delegate
    pub fn new_delegate(
        compiler: &dyn TrampolineCompiler,
        method: Arc<MethodDescriptor>,
        runtime: Runtime,
        handle: ManagedHandle,
    ) -> Self {
        Self::compile(compiler, method, DispatchTarget::Delegate { runtime, handle })
    }

    /// A callback that failed before compilation, e.g. an unknown prototype
    pub fn failed(error: impl Into<String>) -> Self {
        JitCallback {
            compiled: Err(error.into()),
            context: None,
            method: Arc::new(MethodDescriptor::new("", "")),
        }
    }

    /// Native entry point, null if compilation failed
    pub fn function(&self) -> *const c_void {
        self.compiled
            .as_ref()
            .map_or(std::ptr::null(), Trampoline::address)
    }

    /// Compilation error, if any
    pub fn error(&self) -> Option<&str> {
        self.compiled.as_ref().err().map(String::as_str)
    }

    /// Signature of the generated function
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// What the callback dispatches to
    pub fn target(&self) -> Option<&DispatchTarget> {
        self.context.as_deref().map(DispatchContext::target)
    }
}

impl std::fmt::Debug for JitCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitCallback")
            .field("method", &self.method.name)
            .field("function", &self.function())
            .field("error", &self.error())
            .finish()
    }
}

//! Outbound calls: native function pointers behind the dispatch convention

use std::ffi::c_void;
use std::mem;

use netbridge_sdk::{ManagedType, Matrix4x4, MethodDescriptor, ParamDescriptor, ValueType};

use super::abi::RETURN_SLOT_SIZE;
use super::compiler::{Trampoline, TrampolineCompiler};
use crate::error::JitError;
use crate::marshal::object_size;

/// A compiled call thunk, or the reason it could not be compiled
#[derive(Debug)]
pub struct JitCall {
    method: MethodDescriptor,
    target: *const c_void,
    compiled: Result<Trampoline, String>,
}

impl JitCall {
    /// Compile a thunk calling `target` with the shape of `method`
    pub fn new(
        compiler: &dyn TrampolineCompiler,
        target: *const c_void,
        method: MethodDescriptor,
    ) -> Self {
        let compiled = if target.is_null() {
            Err(JitError::Backend("Target function is null".to_string()))
        } else {
            compiler.compile_call(&method, target)
        };
        if let Err(e) = &compiled {
            tracing::warn!(error = %e, "Failed to compile call thunk");
        }
        JitCall {
            method,
            target,
            compiled: compiled.map_err(|e| e.to_string()),
        }
    }

    /// A call that was never compiled
    pub fn failed(target: *const c_void, error: impl Into<String>) -> Self {
        JitCall {
            method: MethodDescriptor::new("call", ""),
            target,
            compiled: Err(error.into()),
        }
    }

    /// Compile from the (category, by-ref) pairs the managed side passes
    pub fn from_managed_types(
        compiler: &dyn TrampolineCompiler,
        target: *const c_void,
        params: &[ManagedType],
        ret: ManagedType,
    ) -> Self {
        let method = params.iter().fold(
            MethodDescriptor::new("call", "").with_return(param_of(ret)),
            |method, param| method.with_param(param_of(*param)),
        );
        Self::new(compiler, target, method)
    }

    /// Thunk entry, null if compilation failed
    pub fn function(&self) -> *const c_void {
        self.compiled
            .as_ref()
            .map_or(std::ptr::null(), Trampoline::address)
    }

    /// Compilation error, if any
    pub fn error(&self) -> Option<&str> {
        self.compiled.as_ref().err().map(String::as_str)
    }

    /// Signature the thunk was compiled for
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Wrapped native function
    pub fn target(&self) -> *const c_void {
        self.target
    }

    /// Bytes the return buffer of [`call`](Self::call) must provide
    pub fn return_size(&self) -> usize {
        let ret = &self.method.ret_type;
        if ret.is_ref {
            return RETURN_SLOT_SIZE;
        }
        let object = match ret.value_type {
            ValueType::Matrix4x4 => Some(mem::size_of::<Matrix4x4>()),
            vt => object_size(vt),
        };
        object.map_or(RETURN_SLOT_SIZE, |size| size.max(RETURN_SLOT_SIZE))
    }

    /// Invoke the thunk with one slot per declared parameter.
    ///
    /// Returns `None` when there is nothing executable to call or `ret` is
    /// shorter than [`return_size`](Self::return_size).
    ///
    /// # Safety
    /// Every slot must hold a valid value of its declared category. Object
    /// returns are written into `ret` as native objects, so it must be
    /// aligned for them and the caller takes ownership.
    pub unsafe fn call(&self, args: &[u64], ret: &mut [u8]) -> Option<()> {
        if ret.len() < self.return_size() {
            return None;
        }
        let tramp = self.compiled.as_ref().ok().filter(|t| t.is_executable())?;
        tramp.as_call_thunk()(args.as_ptr(), args.len(), ret.as_mut_ptr());
        Some(())
    }
}

fn param_of(managed: ManagedType) -> ParamDescriptor {
    if managed.is_ref() {
        ParamDescriptor::by_ref(managed.value_type())
    } else {
        ParamDescriptor::new(managed.value_type())
    }
}

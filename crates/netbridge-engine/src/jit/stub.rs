//! Stub compiler for testing the pipeline without real codegen
//!
//! Validates descriptors with the same lowering as the real backend and
//! produces placeholder code (INT3 on x86, BRK on ARM) that must never be
//! called. Every trampoline gets a distinct non-null address.

use std::ffi::c_void;

use netbridge_sdk::MethodDescriptor;

use super::abi::{lower_signature, PlatformAbi, TargetArch};
use super::compiler::{CallbackHandler, CodeMemory, Trampoline, TrampolineCompiler};
use crate::error::JitError;

/// A compiler that produces non-executable placeholder trampolines
#[derive(Debug, Clone, Copy)]
pub struct StubCompiler {
    abi: PlatformAbi,
}

impl StubCompiler {
    /// Stub for the running platform
    pub fn new() -> Self {
        Self::for_abi(PlatformAbi::host())
    }

    /// Stub that validates against another convention
    pub fn for_abi(abi: PlatformAbi) -> Self {
        StubCompiler { abi }
    }

    fn placeholder(&self, method: &MethodDescriptor) -> Result<Trampoline, JitError> {
        lower_signature(self.abi, method)?;
        let trap_byte = match self.abi.arch {
            TargetArch::X86_64 => 0xCC,  // INT3
            TargetArch::AArch64 => 0x00, // BRK #0 (placeholder)
        };
        let code: Box<[u8]> = vec![trap_byte].into_boxed_slice();
        let address = code.as_ptr() as *const c_void;
        Ok(Trampoline::new(address, CodeMemory::Placeholder(code)))
    }
}

impl Default for StubCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl TrampolineCompiler for StubCompiler {
    fn name(&self) -> &str {
        "stub"
    }

    fn abi(&self) -> PlatformAbi {
        self.abi
    }

    fn compile_call(
        &self,
        method: &MethodDescriptor,
        _target: *const c_void,
    ) -> Result<Trampoline, JitError> {
        self.placeholder(method)
    }

    fn compile_callback(
        &self,
        signature: &MethodDescriptor,
        _handler: CallbackHandler,
        _method: *const MethodDescriptor,
        _data: *mut c_void,
    ) -> Result<Trampoline, JitError> {
        self.placeholder(signature)
    }
}

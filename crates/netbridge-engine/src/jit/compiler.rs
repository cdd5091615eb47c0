//! Backend-agnostic trampoline compiler interface
//!
//! A trampoline is a small piece of machine code with one of two shapes:
//!
//! - a **call thunk** (`NewCall`): a uniform `(args, count, ret)` entry that
//!   loads typed arguments from dispatch slots and calls a native target
//!   with the real platform signature;
//! - a **callback** (`NewCallback`): a function with the real platform
//!   signature that spills its arguments into dispatch slots and hands them
//!   to a handler together with a method descriptor and opaque data.

use std::ffi::c_void;

use netbridge_sdk::MethodDescriptor;

use super::abi::PlatformAbi;
use crate::error::JitError;

/// Uniform entry of a call thunk.
///
/// `args` holds one 8-byte slot per declared parameter (little-endian).
/// `ret` receives the return lanes, or is passed as the hidden return
/// pointer when the target returns through memory.
pub type CallThunk = unsafe extern "C" fn(args: *const u64, count: usize, ret: *mut u8);

/// Handler a callback trampoline forwards to.
///
/// `args` holds `count` slots: the hidden return pointer first when the
/// platform uses one, then each parameter widened to 8 bytes. Inline
/// returns are written to the 16-byte `ret` buffer.
pub type CallbackHandler = unsafe extern "C" fn(
    method: *const MethodDescriptor,
    data: *mut c_void,
    args: *const u64,
    count: usize,
    ret: *mut u8,
);

/// Memory backing a trampoline
pub enum CodeMemory {
    /// Executable memory owned by the code generator
    #[cfg(feature = "jit")]
    Jit(super::cranelift::JitMemory),
    /// Non-executable bytes standing in for code
    Placeholder(Box<[u8]>),
}

/// A compiled trampoline; the address stays valid until it is dropped
pub struct Trampoline {
    address: *const c_void,
    memory: CodeMemory,
}

// Safety: the address points into memory owned by `memory`, which is never
// written after finalization.
unsafe impl Send for Trampoline {}
unsafe impl Sync for Trampoline {}

impl Trampoline {
    pub(crate) fn new(address: *const c_void, memory: CodeMemory) -> Self {
        Trampoline { address, memory }
    }

    /// Entry address
    pub fn address(&self) -> *const c_void {
        self.address
    }

    /// `true` if the address can actually be called
    pub fn is_executable(&self) -> bool {
        match self.memory {
            #[cfg(feature = "jit")]
            CodeMemory::Jit(_) => true,
            CodeMemory::Placeholder(_) => false,
        }
    }

    /// The address as a call thunk
    ///
    /// # Safety
    /// The trampoline must have been produced by `compile_call` and be
    /// executable.
    pub unsafe fn as_call_thunk(&self) -> CallThunk {
        std::mem::transmute::<*const c_void, CallThunk>(self.address)
    }
}

impl std::fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trampoline")
            .field("address", &self.address)
            .field("executable", &self.is_executable())
            .finish()
    }
}

/// A trampoline code generator
pub trait TrampolineCompiler: Send + Sync {
    /// Backend name (for diagnostics)
    fn name(&self) -> &str;

    /// Calling convention the backend generates for
    fn abi(&self) -> PlatformAbi;

    /// Build a call thunk that invokes `target` with the signature of `method`
    fn compile_call(
        &self,
        method: &MethodDescriptor,
        target: *const c_void,
    ) -> Result<Trampoline, JitError>;

    /// Build a callback with the signature of `method` that forwards to `handler`.
    ///
    /// `method` and `data` are embedded in the code and passed back to the
    /// handler unchanged; both must outlive the trampoline.
    fn compile_callback(
        &self,
        signature: &MethodDescriptor,
        handler: CallbackHandler,
        method: *const MethodDescriptor,
        data: *mut c_void,
    ) -> Result<Trampoline, JitError>;
}

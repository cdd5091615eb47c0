//! Trampoline compiler
//!
//! Generates the two thunk shapes that cross the native/managed boundary:
//!
//! ```text
//! native caller ──(args, count, ret)──► call thunk ──platform ABI──► target
//! native caller ──platform ABI──► callback ──(method, data, args, count, ret)──► handler
//! ```
//!
//! Lowering to the platform convention lives in [`abi`] and is shared by
//! every backend. [`CraneliftCompiler`] emits real code (feature `jit`);
//! [`StubCompiler`] validates signatures and emits placeholders.

pub mod abi;
pub mod call;
pub mod callback;
pub mod compiler;
#[cfg(feature = "jit")]
pub mod cranelift;
pub mod dispatch;
pub mod stub;

pub use abi::{lower_signature, LoweredSignature, PlatformAbi, ReturnLowering, TargetArch};
pub use call::JitCall;
pub use callback::JitCallback;
pub use compiler::{CallThunk, CallbackHandler, CodeMemory, Trampoline, TrampolineCompiler};
#[cfg(feature = "jit")]
pub use cranelift::CraneliftCompiler;
pub use dispatch::{managed_call, managed_call_handler, DispatchContext, DispatchTarget};
pub use stub::StubCompiler;

use std::sync::Arc;

use crate::config::OptLevel;
use crate::error::JitError;

/// The best compiler available in this build
pub fn default_compiler(opt_level: OptLevel) -> Result<Arc<dyn TrampolineCompiler>, JitError> {
    #[cfg(feature = "jit")]
    {
        Ok(Arc::new(CraneliftCompiler::host(opt_level)?))
    }
    #[cfg(not(feature = "jit"))]
    {
        tracing::warn!(?opt_level, "Built without code generation; trampolines are placeholders");
        Ok(Arc::new(StubCompiler::new()))
    }
}

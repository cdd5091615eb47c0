//! Callback dispatch into managed code
//!
//! Callback trampolines forward to one of the handlers here. The handler
//! recovers its target from the data pointer, packs the dispatch slots into
//! the pointer list the runtime expects and invokes the managed method or
//! delegate.

use std::ffi::c_void;
use std::ptr;

use netbridge_sdk::{ManagedHandle, MethodDescriptor, ValueType};

use super::abi::PlatformAbi;
use crate::marshal::{construct_default, pack_args};
use crate::reflect::{invoke_delegate, invoke_delegate_ret, invoke_static};
use crate::runtime::Runtime;

/// What a callback trampoline ends up invoking
#[derive(Debug, Clone)]
pub enum DispatchTarget {
    /// A static managed method registered as an internal call
    Static {
        /// Runtime owning the handles
        runtime: Runtime,
        /// Declaring type
        type_handle: ManagedHandle,
        /// Method to invoke
        method_handle: ManagedHandle,
    },
    /// A managed delegate turned into a native function pointer
    Delegate {
        /// Runtime owning the handle
        runtime: Runtime,
        /// Delegate handle
        handle: ManagedHandle,
    },
}

/// Handler data embedded in a callback trampoline
#[derive(Debug)]
pub struct DispatchContext {
    abi: PlatformAbi,
    target: DispatchTarget,
}

impl DispatchContext {
    /// Dispatch to `target` using the conventions of `abi`
    pub fn new(abi: PlatformAbi, target: DispatchTarget) -> Self {
        DispatchContext { abi, target }
    }

    /// The dispatch target
    pub fn target(&self) -> &DispatchTarget {
        &self.target
    }

    fn invoke(&self, args: &[*const c_void], ret: Option<*mut c_void>) {
        match &self.target {
            DispatchTarget::Static { runtime, type_handle, method_handle } => {
                invoke_static(runtime, *type_handle, *method_handle, args, ret)
            }
            DispatchTarget::Delegate { runtime, handle } => match ret {
                Some(ret) => invoke_delegate_ret(runtime, *handle, args, ret),
                None => invoke_delegate(runtime, *handle, args),
            },
        }
    }
}

/// Run one managed call for the slots of a callback.
///
/// When the return goes through memory, slot 0 is the hidden pointer and
/// parameters start at slot 1. Object returns get an empty native object
/// constructed there before the call; the pointer is echoed to `ret`.
///
/// # Safety
/// `args` must hold `count` initialized slots laid out for `method` under
/// `abi`, and `ret` must be a 16-byte writable buffer.
pub unsafe fn managed_call(
    abi: PlatformAbi,
    method: &MethodDescriptor,
    args: *const u64,
    count: usize,
    ret: *mut u8,
    invoke: impl FnOnce(&[*const c_void], Option<*mut c_void>),
) {
    let hidden = abi.returns_hidden(&method.ret_type);
    let first = usize::from(hidden);
    debug_assert_eq!(count, method.param_count() + first);

    let params = pack_args(&method.param_types, args, first);

    if hidden {
        let storage = *args as usize as *mut c_void;
        construct_default(method.ret_type.value_type, storage);
        invoke(&params, Some(storage));
        ptr::write_unaligned(ret as *mut usize, storage as usize);
    } else if method.ret_type.value_type == ValueType::Void {
        invoke(&params, None);
    } else {
        invoke(&params, Some(ret as *mut c_void));
    }
}

/// Handler for trampolines registered as internal calls and for delegates
///
/// # Safety
/// Called only by a trampoline built with a live `DispatchContext` as data.
pub unsafe extern "C" fn managed_call_handler(
    method: *const MethodDescriptor,
    data: *mut c_void,
    args: *const u64,
    count: usize,
    ret: *mut u8,
) {
    let (Some(method), Some(context)) = (method.as_ref(), (data as *const DispatchContext).as_ref())
    else {
        tracing::error!("Callback dispatched without a method or target");
        return;
    };
    managed_call(context.abi, method, args, count, ret, |params, out| {
        context.invoke(params, out)
    });
}

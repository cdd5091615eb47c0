//! Generated call and callback exports

use std::ffi::{c_char, c_void};
use std::ptr;
use std::slice;

use netbridge_sdk::memory::{alloc_c_string, c_str_to_string};
use netbridge_sdk::{ManagedHandle, ManagedType};

use crate::jit::{JitCall, JitCallback};
use crate::module;

const NOT_INITIALIZED: &str = "Language module is not initialized";

fn error_string(error: Option<&str>) -> *mut c_char {
    error.map_or(ptr::null_mut(), alloc_c_string)
}

// ============================================================================
// Outbound calls
// ============================================================================

/// Compile a call thunk for `target`.
///
/// A null `target` yields null. Otherwise an object is always returned;
/// check `GetCallError` when `GetCallFunction` is null.
///
/// # Safety
/// `params` must point to `count` managed types (or be null with `count` 0).
#[no_mangle]
pub unsafe extern "C" fn NewCall(
    target: *const c_void,
    params: *const ManagedType,
    count: i32,
    ret: ManagedType,
) -> *mut JitCall {
    if target.is_null() {
        return ptr::null_mut();
    }
    let params = if params.is_null() || count <= 0 {
        &[][..]
    } else {
        slice::from_raw_parts(params, count as usize)
    };
    let call = match module::global() {
        Some(module) => JitCall::from_managed_types(module.compiler(), target, params, ret),
        None => JitCall::failed(target, NOT_INITIALIZED),
    };
    Box::into_raw(Box::new(call))
}

/// Thunk entry of a call, null on failure
///
/// # Safety
/// `call` must be null or come from `NewCall`.
#[no_mangle]
pub unsafe extern "C" fn GetCallFunction(call: *const JitCall) -> *const c_void {
    call.as_ref().map_or(ptr::null(), JitCall::function)
}

/// Compilation error of a call; the caller frees the string
///
/// # Safety
/// `call` must be null or come from `NewCall`.
#[no_mangle]
pub unsafe extern "C" fn GetCallError(call: *const JitCall) -> *mut c_char {
    call.as_ref().map_or(ptr::null_mut(), |call| error_string(call.error()))
}

/// Free a call and its code
///
/// # Safety
/// `call` must be null or come from `NewCall`, and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn DeleteCall(call: *mut JitCall) {
    if !call.is_null() {
        drop(Box::from_raw(call));
    }
}

// ============================================================================
// Inbound callbacks
// ============================================================================

/// Wrap a managed delegate in a native function with the signature of the
/// exported prototype called `name`
///
/// # Safety
/// `name` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn NewCallback(name: *const c_char, delegate: ManagedHandle) -> *mut JitCallback {
    let name = c_str_to_string(name);
    let callback = match module::global() {
        Some(module) => module.new_callback(&name, delegate),
        None => JitCallback::failed(NOT_INITIALIZED),
    };
    Box::into_raw(Box::new(callback))
}

/// Native entry of a callback, null on failure
///
/// # Safety
/// `callback` must be null or come from `NewCallback`.
#[no_mangle]
pub unsafe extern "C" fn GetCallbackFunction(callback: *const JitCallback) -> *const c_void {
    callback.as_ref().map_or(ptr::null(), JitCallback::function)
}

/// Compilation error of a callback; the caller frees the string
///
/// # Safety
/// `callback` must be null or come from `NewCallback`.
#[no_mangle]
pub unsafe extern "C" fn GetCallbackError(callback: *const JitCallback) -> *mut c_char {
    callback
        .as_ref()
        .map_or(ptr::null_mut(), |callback| error_string(callback.error()))
}

/// Free a callback and its code
///
/// # Safety
/// `callback` must be null or come from `NewCallback`, and not be used
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn DeleteCallback(callback: *mut JitCallback) {
    if !callback.is_null() {
        drop(Box::from_raw(callback));
    }
}

//! Argument packing for managed invocation
//!
//! The managed invoke entries take one pointer per argument. Packing turns a
//! dispatch slot array into that pointer list using the passing rule of each
//! declared parameter.

use std::ffi::c_void;

use netbridge_sdk::ParamDescriptor;

use super::category::{arg_passing, ArgPassing};

/// Build the argument pointer list for `params`.
///
/// Parameter `j` is read from slot `first + j`; `first` is 1 when slot 0
/// carries a hidden return pointer. A category without a passing rule is a
/// contract violation and aborts the process.
///
/// # Safety
/// `slots` must point to at least `first + params.len()` initialized slots
/// that outlive the returned pointers.
pub unsafe fn pack_args(
    params: &[ParamDescriptor],
    slots: *const u64,
    first: usize,
) -> Vec<*const c_void> {
    params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let slot = slots.add(first + index);
            match arg_passing(param) {
                Some(ArgPassing::SlotAddress) => slot as *const c_void,
                Some(ArgPassing::SlotValue) => *slot as usize as *const c_void,
                None => unsupported(index, param),
            }
        })
        .collect()
}

#[cold]
fn unsupported(index: usize, param: &ParamDescriptor) -> ! {
    tracing::error!(
        index,
        value_type = %param.value_type,
        "Unsupported types! Parameter cannot cross the dispatch boundary"
    );
    std::process::abort()
}

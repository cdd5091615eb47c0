//! C heap helpers shared with the managed side
//!
//! Strings handed to the managed runtime are allocated with the allocator
//! `Marshal.FreeCoTaskMem` releases: the COM task allocator on Windows and
//! the C heap elsewhere. Strings the runtime hands back are released the same
//! way.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;

#[cfg(windows)]
unsafe fn raw_alloc(size: usize) -> *mut c_void {
    windows_sys::Win32::System::Com::CoTaskMemAlloc(size)
}

#[cfg(windows)]
unsafe fn raw_free(ptr: *mut c_void) {
    windows_sys::Win32::System::Com::CoTaskMemFree(ptr as *const c_void)
}

#[cfg(not(windows))]
unsafe fn raw_alloc(size: usize) -> *mut c_void {
    libc::malloc(size)
}

#[cfg(not(windows))]
unsafe fn raw_free(ptr: *mut c_void) {
    libc::free(ptr)
}

/// Copy `s` into a freshly allocated NUL-terminated C buffer.
///
/// Returns null if the allocation fails. The caller owns the buffer and must
/// release it with [`free`] (or the managed side's `FreeCoTaskMem`).
pub fn alloc_c_string(s: &str) -> *mut c_char {
    let bytes = s.as_bytes();
    // Safety: the allocator returns either null or a block of at least len + 1 bytes.
    unsafe {
        let buffer = raw_alloc(bytes.len() + 1) as *mut u8;
        if buffer.is_null() {
            return ptr::null_mut();
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
        *buffer.add(bytes.len()) = 0;
        buffer as *mut c_char
    }
}

/// Release a buffer obtained from [`alloc_c_string`] or from the managed runtime.
///
/// # Safety
/// `ptr` must be null or a live allocation of the platform string allocator.
pub unsafe fn free(ptr: *mut c_void) {
    if !ptr.is_null() {
        raw_free(ptr);
    }
}

/// Copy a NUL-terminated string into an owned `String`, replacing invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer.
pub unsafe fn c_str_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

//! Strings passed by value through the runtime function table

use std::ffi::{c_char, c_void};
use std::ptr;

use crate::abi::Bool32;
use crate::memory;

/// A UTF-8 string laid out as the managed `NativeString` struct.
///
/// Plain data: it does not free itself. Strings the bridge allocates for a
/// single call are wrapped in [`ScopedString`]; strings returned by the
/// runtime are consumed with [`NativeString::into_string`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NativeString {
    data: *mut c_char,
    len: i32,
    #[allow(dead_code)]
    disposed: Bool32,
}

impl NativeString {
    /// The null string
    pub const fn null() -> Self {
        NativeString {
            data: ptr::null_mut(),
            len: 0,
            disposed: 0,
        }
    }

    /// Allocate a copy of `s` on the C heap
    pub fn new(s: &str) -> Self {
        let data = memory::alloc_c_string(s);
        let len = if data.is_null() { 0 } else { s.len() as i32 };
        NativeString {
            data,
            len,
            disposed: 0,
        }
    }

    /// Raw buffer pointer
    pub fn as_ptr(&self) -> *const c_char {
        self.data
    }

    /// Length in bytes, excluding the terminator
    pub fn len(&self) -> usize {
        self.len.max(0) as usize
    }

    /// `true` if the string has no bytes
    pub fn is_empty(&self) -> bool {
        self.len <= 0
    }

    /// `true` if no buffer is attached
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Copy out the contents without releasing the buffer
    pub fn to_string_lossy(&self) -> String {
        if self.data.is_null() {
            return String::new();
        }
        // Safety: non-null buffers are NUL-terminated by both sides.
        unsafe { memory::c_str_to_string(self.data) }
    }

    /// Copy out the contents and release the buffer
    ///
    /// # Safety
    /// The buffer must have been allocated by the C allocator and not be
    /// referenced elsewhere.
    pub unsafe fn into_string(mut self) -> String {
        let contents = self.to_string_lossy();
        self.free();
        contents
    }

    /// Release the buffer and reset to null
    ///
    /// # Safety
    /// See [`NativeString::into_string`].
    pub unsafe fn free(&mut self) {
        if self.data.is_null() {
            return;
        }
        memory::free(self.data as *mut c_void);
        self.data = ptr::null_mut();
        self.len = 0;
    }
}

impl Default for NativeString {
    fn default() -> Self {
        NativeString::null()
    }
}

impl PartialEq<str> for NativeString {
    fn eq(&self, other: &str) -> bool {
        self.len() == other.len() && self.to_string_lossy() == other
    }
}

impl PartialEq<&str> for NativeString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// A [`NativeString`] that lives for one call and is freed on drop
pub struct ScopedString(NativeString);

impl ScopedString {
    /// Allocate a transient copy of `s`
    pub fn new(s: &str) -> Self {
        ScopedString(NativeString::new(s))
    }

    /// The struct to pass by value
    pub fn get(&self) -> NativeString {
        self.0
    }
}

impl Drop for ScopedString {
    fn drop(&mut self) {
        // Safety: the buffer was allocated by NativeString::new and the
        // runtime copies string arguments before returning.
        unsafe { self.0.free() };
    }
}

const _: () = assert!(std::mem::size_of::<NativeString>() == std::mem::size_of::<usize>() + 8);

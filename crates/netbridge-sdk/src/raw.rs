//! Opaque shells for native-owned aggregates
//!
//! The managed side never looks inside a native string or vector: it keeps a
//! block of three pointer-sized words and hands it back to the aggregate
//! exports. These shells give that block a name and an FFI-safe type so it
//! can be returned by value from `extern "C"` functions.

use std::mem::{self, ManuallyDrop};

/// Storage of a native `String`, three machine words
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawString {
    words: [usize; 3],
}

/// Storage of a native `Vec<T>`, three machine words
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVector {
    words: [usize; 3],
}

const _: () = assert!(mem::size_of::<String>() == mem::size_of::<RawString>());
const _: () = assert!(mem::size_of::<Vec<u8>>() == mem::size_of::<RawVector>());
const _: () = assert!(mem::align_of::<String>() == mem::align_of::<RawString>());

impl RawString {
    /// Move a string into raw storage; ownership travels with the words
    pub fn from_string(value: String) -> Self {
        let value = ManuallyDrop::new(value);
        // Safety: String is three words (asserted above); the original is not dropped.
        unsafe { mem::transmute_copy::<String, RawString>(&value) }
    }

    /// Take the string back out of raw storage
    ///
    /// # Safety
    /// The words must come from [`RawString::from_string`] and must not be
    /// reclaimed twice.
    pub unsafe fn into_string(self) -> String {
        mem::transmute_copy::<RawString, String>(&self)
    }
}

impl RawVector {
    /// Move a vector into raw storage
    pub fn from_vec<T>(value: Vec<T>) -> Self {
        let value = ManuallyDrop::new(value);
        // Safety: every Vec<T> is three words; the original is not dropped.
        unsafe { mem::transmute_copy::<Vec<T>, RawVector>(&value) }
    }

    /// Take the vector back out of raw storage
    ///
    /// # Safety
    /// The words must come from [`RawVector::from_vec`] with the same `T`.
    pub unsafe fn into_vec<T>(self) -> Vec<T> {
        mem::transmute_copy::<RawVector, Vec<T>>(&self)
    }
}

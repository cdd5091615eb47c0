//! Native storage for object categories
//!
//! Strings, vectors and the variant are native-owned objects. When managed
//! code returns one through a hidden pointer, the bridge constructs an empty
//! instance at that address first and the callee assigns into it.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use netbridge_sdk::{Matrix4x4, ValueType, Variant, Vector2, Vector3, Vector4};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

macro_rules! object_storage {
    ($($vt:ident => $ty:ty),* $(,)?) => {
        /// Construct an empty object of category `vt` at `storage`.
        ///
        /// Returns `false` (and writes nothing) for non-object categories.
        ///
        /// # Safety
        /// `storage` must be valid for writes of the category's native type
        /// and must not hold a live object.
        pub unsafe fn construct_default(vt: ValueType, storage: *mut c_void) -> bool {
            match vt {
                $(ValueType::$vt => {
                    ptr::write(storage as *mut $ty, <$ty>::default());
                    true
                })*
                _ => false,
            }
        }

        /// Drop the object of category `vt` living at `storage`.
        ///
        /// # Safety
        /// `storage` must hold a live object of the category's native type.
        pub unsafe fn destroy_in_place(vt: ValueType, storage: *mut c_void) -> bool {
            match vt {
                $(ValueType::$vt => {
                    ptr::drop_in_place(storage as *mut $ty);
                    true
                })*
                _ => false,
            }
        }

        /// Bytes a native object of category `vt` occupies
        pub fn object_size(vt: ValueType) -> Option<usize> {
            match vt {
                $(ValueType::$vt => Some(mem::size_of::<$ty>()),)*
                _ => None,
            }
        }
    };
}

object_storage! {
    String => String,
    Any => Variant,
    ArrayBool => Vec<bool>,
    ArrayChar8 => Vec<i8>,
    ArrayChar16 => Vec<u16>,
    ArrayInt8 => Vec<i8>,
    ArrayInt16 => Vec<i16>,
    ArrayInt32 => Vec<i32>,
    ArrayInt64 => Vec<i64>,
    ArrayUInt8 => Vec<u8>,
    ArrayUInt16 => Vec<u16>,
    ArrayUInt32 => Vec<u32>,
    ArrayUInt64 => Vec<u64>,
    ArrayPointer => Vec<usize>,
    ArrayFloat => Vec<f32>,
    ArrayDouble => Vec<f64>,
    ArrayString => Vec<String>,
    ArrayAny => Vec<Variant>,
    ArrayVector2 => Vec<Vector2>,
    ArrayVector3 => Vec<Vector3>,
    ArrayVector4 => Vec<Vector4>,
    ArrayMatrix4x4 => Vec<Matrix4x4>,
}

// ============================================================================
// Allocation accounting
// ============================================================================

static LIVE_OBJECTS: Lazy<Mutex<FxHashMap<&'static str, i64>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Record one object handed to managed code
pub fn track_construct(kind: &'static str) {
    *LIVE_OBJECTS.lock().entry(kind).or_insert(0) += 1;
}

/// Record one object returned by managed code for destruction
pub fn track_destroy(kind: &'static str) {
    *LIVE_OBJECTS.lock().entry(kind).or_insert(0) -= 1;
}

/// Objects constructed for managed code and never destroyed, by kind
pub fn live_objects() -> Vec<(&'static str, i64)> {
    let mut live: Vec<_> = LIVE_OBJECTS
        .lock()
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| (*kind, *count))
        .collect();
    live.sort_unstable();
    live
}

/// Log every leaked kind and reset the counters
pub fn report_leaks() -> Vec<(&'static str, i64)> {
    let leaks = live_objects();
    for (kind, count) in &leaks {
        tracing::error!(kind, count, "Memory leaks detected: {} allocations. Related to {}!", count, kind);
    }
    LIVE_OBJECTS.lock().clear();
    leaks
}

//! Native string, vector and variant exports
//!
//! The managed side holds native aggregates as opaque three-word blocks
//! ([`RawString`], [`RawVector`]) and manipulates them only through these
//! functions. A null source array or a non-positive length yields an empty
//! aggregate.

use std::ffi::{c_char, c_void};
use std::ptr;
use std::slice;

use netbridge_sdk::memory::{alloc_c_string, c_str_to_string, free};
use netbridge_sdk::{Matrix4x4, RawString, RawVector, Variant, Vector2, Vector3, Vector4};

use crate::marshal::storage::{track_construct, track_destroy};

// ============================================================================
// Element conversion
// ============================================================================

/// How one element crosses between a managed array and a native vector
trait Element: Sized {
    /// Element layout in the managed array
    type Managed;

    /// # Safety
    /// `value` must be a valid managed element.
    unsafe fn from_managed(value: &Self::Managed) -> Self;

    /// # Safety
    /// `slot` must be valid for writes; for strings it holds null or a
    /// previous C string.
    unsafe fn to_managed(&self, slot: *mut Self::Managed);
}

macro_rules! plain_elements {
    ($($ty:ty),* $(,)?) => {
        $(impl Element for $ty {
            type Managed = $ty;

            unsafe fn from_managed(value: &$ty) -> Self {
                *value
            }

            unsafe fn to_managed(&self, slot: *mut $ty) {
                ptr::write(slot, *self);
            }
        })*
    };
}

plain_elements!(
    i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, Vector2, Vector3, Vector4, Matrix4x4,
);

impl Element for bool {
    type Managed = u8;

    unsafe fn from_managed(value: &u8) -> Self {
        *value != 0
    }

    unsafe fn to_managed(&self, slot: *mut u8) {
        ptr::write(slot, *self as u8);
    }
}

impl Element for String {
    type Managed = *mut c_char;

    unsafe fn from_managed(value: &*mut c_char) -> Self {
        c_str_to_string(*value)
    }

    unsafe fn to_managed(&self, slot: *mut *mut c_char) {
        free(*slot as *mut c_void);
        ptr::write(slot, alloc_c_string(self));
    }
}

/// Length as reported to the managed side, saturated at `i32::MAX`
fn managed_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

unsafe fn collect<T: Element>(arr: *const T::Managed, len: i32) -> Vec<T> {
    if arr.is_null() || len <= 0 {
        return Vec::new();
    }
    slice::from_raw_parts(arr, len as usize)
        .iter()
        .map(|value| T::from_managed(value))
        .collect()
}

unsafe fn construct_vector<T: Element>(kind: &'static str, arr: *const T::Managed, len: i32) -> RawVector {
    track_construct(kind);
    RawVector::from_vec(collect::<T>(arr, len))
}

unsafe fn destroy_vector<T>(kind: &'static str, vec: *mut RawVector) {
    if vec.is_null() {
        return;
    }
    track_destroy(kind);
    ptr::drop_in_place(vec as *mut Vec<T>);
}

unsafe fn vector_size<T>(vec: *const RawVector) -> i32 {
    match (vec as *const Vec<T>).as_ref() {
        Some(vec) => managed_len(vec.len()),
        None => 0,
    }
}

unsafe fn vector_data<T: Element>(vec: *const RawVector, arr: *mut T::Managed) {
    let Some(vec) = (vec as *const Vec<T>).as_ref() else {
        return;
    };
    if arr.is_null() {
        return;
    }
    for (index, value) in vec.iter().enumerate() {
        value.to_managed(arr.add(index));
    }
}

unsafe fn assign_vector<T: Element>(vec: *mut RawVector, arr: *const T::Managed, len: i32) {
    if let Some(vec) = (vec as *mut Vec<T>).as_mut() {
        *vec = collect::<T>(arr, len);
    }
}

// ============================================================================
// Strings
// ============================================================================

/// Create a native string from a C string (null gives an empty string)
///
/// # Safety
/// `source` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn ConstructString(source: *const c_char) -> RawString {
    track_construct("String");
    RawString::from_string(c_str_to_string(source))
}

/// Drop a native string
///
/// # Safety
/// `string` must come from `ConstructString` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn DestroyString(string: *mut RawString) {
    if string.is_null() {
        return;
    }
    track_destroy("String");
    ptr::drop_in_place(string as *mut String);
}

/// Byte length of a native string
///
/// # Safety
/// `string` must be null or a live native string.
#[no_mangle]
pub unsafe extern "C" fn GetStringLength(string: *const RawString) -> i32 {
    (string as *const String).as_ref().map_or(0, |s| managed_len(s.len()))
}

/// Copy of the string contents; the caller frees it
///
/// # Safety
/// `string` must be null or a live native string.
#[no_mangle]
pub unsafe extern "C" fn GetStringData(string: *const RawString) -> *mut c_char {
    (string as *const String)
        .as_ref()
        .map_or(ptr::null_mut(), |s| alloc_c_string(s))
}

/// Replace the contents of a native string (null clears it)
///
/// # Safety
/// `string` must be a live native string; `source` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn AssignString(string: *mut RawString, source: *const c_char) {
    if let Some(s) = (string as *mut String).as_mut() {
        *s = c_str_to_string(source);
    }
}

// ============================================================================
// Variant
// ============================================================================

/// Release whatever a variant holds
///
/// # Safety
/// `variant` must be null or a live variant, not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn DestroyVariant(variant: *mut Variant) {
    if !variant.is_null() {
        ptr::drop_in_place(variant);
    }
}

/// A vector of `len` empty variants
#[no_mangle]
pub extern "C" fn ConstructVectorVariant(len: i32) -> RawVector {
    track_construct("Vector<Variant>");
    let mut vec = Vec::new();
    vec.resize_with(len.max(0) as usize, Variant::default);
    RawVector::from_vec(vec)
}

/// Drop a variant vector
///
/// # Safety
/// `vec` must come from `ConstructVectorVariant`.
#[no_mangle]
pub unsafe extern "C" fn DestroyVectorVariant(vec: *mut RawVector) {
    destroy_vector::<Variant>("Vector<Variant>", vec)
}

/// Element count of a variant vector
///
/// # Safety
/// `vec` must be null or a live variant vector.
#[no_mangle]
pub unsafe extern "C" fn GetVectorSizeVariant(vec: *const RawVector) -> i32 {
    vector_size::<Variant>(vec)
}

/// Pointer to element `index`, null if out of range
///
/// # Safety
/// `vec` must be null or a live variant vector; the pointer is invalidated
/// by the next resize.
#[no_mangle]
pub unsafe extern "C" fn GetVectorDataVariant(vec: *mut RawVector, index: i32) -> *mut Variant {
    match (vec as *mut Vec<Variant>).as_mut() {
        Some(vec) if index >= 0 => vec
            .get_mut(index as usize)
            .map_or(ptr::null_mut(), |v| v as *mut Variant),
        _ => ptr::null_mut(),
    }
}

/// Resize a variant vector, filling with empty variants
///
/// # Safety
/// `vec` must be a live variant vector.
#[no_mangle]
pub unsafe extern "C" fn AssignVectorVariant(vec: *mut RawVector, len: i32) {
    if let Some(vec) = (vec as *mut Vec<Variant>).as_mut() {
        vec.resize_with(len.max(0) as usize, Variant::default);
    }
}

// ============================================================================
// Typed vectors
// ============================================================================

macro_rules! vector_exports {
    ($(
        $module:ident: $elem:ty, $kind:literal =>
            $construct:literal, $destroy:literal, $size:literal, $data:literal, $assign:literal;
    )*) => {
        $(mod $module {
            use super::*;

            type Managed = <$elem as Element>::Managed;

            #[export_name = $construct]
            unsafe extern "C" fn construct(arr: *const Managed, len: i32) -> RawVector {
                construct_vector::<$elem>($kind, arr, len)
            }

            #[export_name = $destroy]
            unsafe extern "C" fn destroy(vec: *mut RawVector) {
                destroy_vector::<$elem>($kind, vec)
            }

            #[export_name = $size]
            unsafe extern "C" fn size(vec: *const RawVector) -> i32 {
                vector_size::<$elem>(vec)
            }

            #[export_name = $data]
            unsafe extern "C" fn data(vec: *const RawVector, arr: *mut Managed) {
                vector_data::<$elem>(vec, arr)
            }

            #[export_name = $assign]
            unsafe extern "C" fn assign(vec: *mut RawVector, arr: *const Managed, len: i32) {
                assign_vector::<$elem>(vec, arr, len)
            }
        })*

        /// Every typed vector export symbol
        #[cfg(test)]
        pub(crate) fn exported_vector_symbols() -> Vec<&'static str> {
            vec![$($construct, $destroy, $size, $data, $assign),*]
        }
    };
}

vector_exports! {
    bool_vector: bool, "Vector<Bool>" =>
        "ConstructVectorBool", "DestroyVectorBool", "GetVectorSizeBool", "GetVectorDataBool", "AssignVectorBool";
    char8_vector: i8, "Vector<Char8>" =>
        "ConstructVectorChar8", "DestroyVectorChar8", "GetVectorSizeChar8", "GetVectorDataChar8", "AssignVectorChar8";
    char16_vector: u16, "Vector<Char16>" =>
        "ConstructVectorChar16", "DestroyVectorChar16", "GetVectorSizeChar16", "GetVectorDataChar16", "AssignVectorChar16";
    int8_vector: i8, "Vector<Int8>" =>
        "ConstructVectorInt8", "DestroyVectorInt8", "GetVectorSizeInt8", "GetVectorDataInt8", "AssignVectorInt8";
    int16_vector: i16, "Vector<Int16>" =>
        "ConstructVectorInt16", "DestroyVectorInt16", "GetVectorSizeInt16", "GetVectorDataInt16", "AssignVectorInt16";
    int32_vector: i32, "Vector<Int32>" =>
        "ConstructVectorInt32", "DestroyVectorInt32", "GetVectorSizeInt32", "GetVectorDataInt32", "AssignVectorInt32";
    int64_vector: i64, "Vector<Int64>" =>
        "ConstructVectorInt64", "DestroyVectorInt64", "GetVectorSizeInt64", "GetVectorDataInt64", "AssignVectorInt64";
    uint8_vector: u8, "Vector<UInt8>" =>
        "ConstructVectorUInt8", "DestroyVectorUInt8", "GetVectorSizeUInt8", "GetVectorDataUInt8", "AssignVectorUInt8";
    uint16_vector: u16, "Vector<UInt16>" =>
        "ConstructVectorUInt16", "DestroyVectorUInt16", "GetVectorSizeUInt16", "GetVectorDataUInt16", "AssignVectorUInt16";
    uint32_vector: u32, "Vector<UInt32>" =>
        "ConstructVectorUInt32", "DestroyVectorUInt32", "GetVectorSizeUInt32", "GetVectorDataUInt32", "AssignVectorUInt32";
    uint64_vector: u64, "Vector<UInt64>" =>
        "ConstructVectorUInt64", "DestroyVectorUInt64", "GetVectorSizeUInt64", "GetVectorDataUInt64", "AssignVectorUInt64";
    intptr_vector: usize, "Vector<IntPtr>" =>
        "ConstructVectorIntPtr", "DestroyVectorIntPtr", "GetVectorSizeIntPtr", "GetVectorDataIntPtr", "AssignVectorIntPtr";
    float_vector: f32, "Vector<Float>" =>
        "ConstructVectorFloat", "DestroyVectorFloat", "GetVectorSizeFloat", "GetVectorDataFloat", "AssignVectorFloat";
    double_vector: f64, "Vector<Double>" =>
        "ConstructVectorDouble", "DestroyVectorDouble", "GetVectorSizeDouble", "GetVectorDataDouble", "AssignVectorDouble";
    string_vector: String, "Vector<String>" =>
        "ConstructVectorString", "DestroyVectorString", "GetVectorSizeString", "GetVectorDataString", "AssignVectorString";
    vector2_vector: Vector2, "Vector<Vector2>" =>
        "ConstructVectorVector2", "DestroyVectorVector2", "GetVectorSizeVector2", "GetVectorDataVector2", "AssignVectorVector2";
    vector3_vector: Vector3, "Vector<Vector3>" =>
        "ConstructVectorVector3", "DestroyVectorVector3", "GetVectorSizeVector3", "GetVectorDataVector3", "AssignVectorVector3";
    vector4_vector: Vector4, "Vector<Vector4>" =>
        "ConstructVectorVector4", "DestroyVectorVector4", "GetVectorSizeVector4", "GetVectorDataVector4", "AssignVectorVector4";
    matrix4x4_vector: Matrix4x4, "Vector<Matrix4x4>" =>
        "ConstructVectorMatrix4x4", "DestroyVectorMatrix4x4", "GetVectorSizeMatrix4x4", "GetVectorDataMatrix4x4", "AssignVectorMatrix4x4";
}

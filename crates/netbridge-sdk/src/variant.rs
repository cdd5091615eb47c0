//! The variant container (`any` category)
//!
//! 32 bytes: a 24-byte payload union followed by the active category as an
//! `i32` at byte 24. The managed side reads scalars straight out of the union
//! and reaches strings and vectors through the aggregate exports.

use std::fmt;
use std::mem;
use std::ptr;

use crate::numerics::{Matrix4x4, Vector2, Vector3, Vector4};
use crate::raw::{RawString, RawVector};
use crate::value_type::ValueType;

/// Payload storage shared by every alternative
#[repr(C)]
#[derive(Clone, Copy)]
pub union VariantData {
    boolean: bool,
    char8: i8,
    char16: u16,
    int8: i8,
    int16: i16,
    int32: i32,
    int64: i64,
    uint8: u8,
    uint16: u16,
    uint32: u32,
    uint64: u64,
    ptr: usize,
    flt: f32,
    dbl: f64,
    string: RawString,
    vector: RawVector,
    vec2: Vector2,
    vec3: Vector3,
    vec4: Vector4,
}

impl VariantData {
    const fn zeroed() -> Self {
        VariantData { uint64: 0 }
    }
}

/// Tagged value of any scalar, string, vector or vec2/3/4 category
#[repr(C)]
pub struct Variant {
    data: VariantData,
    current: i32,
    _pad: u32,
}

const _: () = assert!(mem::size_of::<Variant>() == 32);
const _: () = assert!(mem::offset_of!(Variant, current) == 24);

/// A Rust type that can live inside a [`Variant`]
pub trait VariantPayload: Sized {
    /// Category recorded in the tag
    const VALUE_TYPE: ValueType;

    /// Move the value into payload storage
    fn into_data(self) -> VariantData;

    /// Borrow the value from payload storage
    ///
    /// # Safety
    /// The storage must hold a value of this payload type.
    unsafe fn from_data(data: &VariantData) -> &Self;
}

macro_rules! scalar_payload {
    ($($ty:ty => $field:ident, $vt:ident;)*) => {
        $(
            impl VariantPayload for $ty {
                const VALUE_TYPE: ValueType = ValueType::$vt;

                fn into_data(self) -> VariantData {
                    let mut data = VariantData::zeroed();
                    data.$field = self;
                    data
                }

                unsafe fn from_data(data: &VariantData) -> &Self {
                    &*ptr::addr_of!(data.$field)
                }
            }
        )*
    };
}

scalar_payload! {
    bool => boolean, Bool;
    i8 => int8, Int8;
    i16 => int16, Int16;
    i32 => int32, Int32;
    i64 => int64, Int64;
    u8 => uint8, UInt8;
    u16 => uint16, UInt16;
    u32 => uint32, UInt32;
    u64 => uint64, UInt64;
    usize => ptr, Pointer;
    f32 => flt, Float;
    f64 => dbl, Double;
    Vector2 => vec2, Vector2;
    Vector3 => vec3, Vector3;
    Vector4 => vec4, Vector4;
}

impl VariantPayload for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn into_data(self) -> VariantData {
        let mut data = VariantData::zeroed();
        data.string = RawString::from_string(self);
        data
    }

    unsafe fn from_data(data: &VariantData) -> &Self {
        &*(ptr::addr_of!(data.string) as *const String)
    }
}

macro_rules! vector_payload {
    ($($elem:ty => $vt:ident;)*) => {
        $(
            impl VariantPayload for Vec<$elem> {
                const VALUE_TYPE: ValueType = ValueType::$vt;

                fn into_data(self) -> VariantData {
                    let mut data = VariantData::zeroed();
                    data.vector = RawVector::from_vec(self);
                    data
                }

                unsafe fn from_data(data: &VariantData) -> &Self {
                    &*(ptr::addr_of!(data.vector) as *const Vec<$elem>)
                }
            }
        )*
    };
}

vector_payload! {
    bool => ArrayBool;
    i8 => ArrayInt8;
    i16 => ArrayInt16;
    i32 => ArrayInt32;
    i64 => ArrayInt64;
    u8 => ArrayUInt8;
    u16 => ArrayUInt16;
    u32 => ArrayUInt32;
    u64 => ArrayUInt64;
    usize => ArrayPointer;
    f32 => ArrayFloat;
    f64 => ArrayDouble;
    String => ArrayString;
    Vector2 => ArrayVector2;
    Vector3 => ArrayVector3;
    Vector4 => ArrayVector4;
    Matrix4x4 => ArrayMatrix4x4;
}

impl Variant {
    /// Empty variant (category `Invalid`)
    pub const fn empty() -> Self {
        Variant {
            data: VariantData::zeroed(),
            current: ValueType::Invalid as i32,
            _pad: 0,
        }
    }

    /// Wrap a payload
    pub fn new<T: VariantPayload>(value: T) -> Self {
        Variant {
            data: value.into_data(),
            current: T::VALUE_TYPE as i32,
            _pad: 0,
        }
    }

    /// Active category
    pub fn value_type(&self) -> ValueType {
        u8::try_from(self.current)
            .ok()
            .and_then(ValueType::from_u8)
            .unwrap_or(ValueType::Invalid)
    }

    /// `true` if nothing is stored
    pub fn is_empty(&self) -> bool {
        matches!(self.value_type(), ValueType::Invalid | ValueType::Void)
    }

    /// Borrow the payload if the active category matches `T`
    pub fn get<T: VariantPayload>(&self) -> Option<&T> {
        if self.value_type() == T::VALUE_TYPE {
            // Safety: the tag says the union holds a T.
            Some(unsafe { T::from_data(&self.data) })
        } else {
            None
        }
    }

    /// Replace the payload, releasing the previous one
    pub fn set<T: VariantPayload>(&mut self, value: T) {
        *self = Variant::new(value);
    }

    /// Release the payload and reset to empty
    pub fn reset(&mut self) {
        self.release();
        self.current = ValueType::Invalid as i32;
        self.data = VariantData::zeroed();
    }

    fn release(&mut self) {
        // Safety: the tag identifies the live alternative; each owning
        // alternative is reclaimed with the element type it was built with.
        unsafe {
            match self.value_type() {
                ValueType::String => drop(self.data.string.into_string()),
                ValueType::ArrayBool => drop(self.data.vector.into_vec::<bool>()),
                ValueType::ArrayChar8 | ValueType::ArrayInt8 => {
                    drop(self.data.vector.into_vec::<i8>())
                }
                ValueType::ArrayChar16 | ValueType::ArrayUInt16 => {
                    drop(self.data.vector.into_vec::<u16>())
                }
                ValueType::ArrayInt16 => drop(self.data.vector.into_vec::<i16>()),
                ValueType::ArrayInt32 => drop(self.data.vector.into_vec::<i32>()),
                ValueType::ArrayInt64 => drop(self.data.vector.into_vec::<i64>()),
                ValueType::ArrayUInt8 => drop(self.data.vector.into_vec::<u8>()),
                ValueType::ArrayUInt32 => drop(self.data.vector.into_vec::<u32>()),
                ValueType::ArrayUInt64 => drop(self.data.vector.into_vec::<u64>()),
                ValueType::ArrayPointer => drop(self.data.vector.into_vec::<usize>()),
                ValueType::ArrayFloat => drop(self.data.vector.into_vec::<f32>()),
                ValueType::ArrayDouble => drop(self.data.vector.into_vec::<f64>()),
                ValueType::ArrayString => drop(self.data.vector.into_vec::<String>()),
                ValueType::ArrayAny => drop(self.data.vector.into_vec::<Variant>()),
                ValueType::ArrayVector2 => drop(self.data.vector.into_vec::<Vector2>()),
                ValueType::ArrayVector3 => drop(self.data.vector.into_vec::<Vector3>()),
                ValueType::ArrayVector4 => drop(self.data.vector.into_vec::<Vector4>()),
                ValueType::ArrayMatrix4x4 => drop(self.data.vector.into_vec::<Matrix4x4>()),
                _ => {}
            }
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::empty()
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variant({})", self.value_type())
    }
}

//! Value categories that can cross the native/managed boundary
//!
//! The discriminants are ABI: the managed side declares the same enum with
//! the same byte values and sends them inside [`crate::ManagedType`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SdkError;

/// Transportable value category
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ValueType {
    /// Not a valid category
    #[default]
    Invalid = 0,

    // C types
    /// No value
    Void,
    /// 8-bit boolean
    Bool,
    /// 8-bit character
    Char8,
    /// UTF-16 code unit
    Char16,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Pointer-sized integer
    Pointer,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Function pointer
    Function,

    /// Native owned string
    String,

    /// Variant container
    Any,

    // Vectors
    /// Vector of bool
    ArrayBool,
    /// Vector of char8
    ArrayChar8,
    /// Vector of char16
    ArrayChar16,
    /// Vector of int8
    ArrayInt8,
    /// Vector of int16
    ArrayInt16,
    /// Vector of int32
    ArrayInt32,
    /// Vector of int64
    ArrayInt64,
    /// Vector of uint8
    ArrayUInt8,
    /// Vector of uint16
    ArrayUInt16,
    /// Vector of uint32
    ArrayUInt32,
    /// Vector of uint64
    ArrayUInt64,
    /// Vector of pointers
    ArrayPointer,
    /// Vector of float
    ArrayFloat,
    /// Vector of double
    ArrayDouble,
    /// Vector of strings
    ArrayString,
    /// Vector of variants
    ArrayAny,
    /// Vector of vec2
    ArrayVector2,
    /// Vector of vec3
    ArrayVector3,
    /// Vector of vec4
    ArrayVector4,
    /// Vector of mat4x4
    ArrayMatrix4x4,

    // Fixed-size numerics
    /// Two floats
    Vector2,
    /// Three floats
    Vector3,
    /// Four floats
    Vector4,
    /// Sixteen floats, row major
    Matrix4x4,
}

/// Every category in discriminant order
pub const ALL_VALUE_TYPES: [ValueType; 43] = [
    ValueType::Invalid,
    ValueType::Void,
    ValueType::Bool,
    ValueType::Char8,
    ValueType::Char16,
    ValueType::Int8,
    ValueType::Int16,
    ValueType::Int32,
    ValueType::Int64,
    ValueType::UInt8,
    ValueType::UInt16,
    ValueType::UInt32,
    ValueType::UInt64,
    ValueType::Pointer,
    ValueType::Float,
    ValueType::Double,
    ValueType::Function,
    ValueType::String,
    ValueType::Any,
    ValueType::ArrayBool,
    ValueType::ArrayChar8,
    ValueType::ArrayChar16,
    ValueType::ArrayInt8,
    ValueType::ArrayInt16,
    ValueType::ArrayInt32,
    ValueType::ArrayInt64,
    ValueType::ArrayUInt8,
    ValueType::ArrayUInt16,
    ValueType::ArrayUInt32,
    ValueType::ArrayUInt64,
    ValueType::ArrayPointer,
    ValueType::ArrayFloat,
    ValueType::ArrayDouble,
    ValueType::ArrayString,
    ValueType::ArrayAny,
    ValueType::ArrayVector2,
    ValueType::ArrayVector3,
    ValueType::ArrayVector4,
    ValueType::ArrayMatrix4x4,
    ValueType::Vector2,
    ValueType::Vector3,
    ValueType::Vector4,
    ValueType::Matrix4x4,
];

#[cfg(target_pointer_width = "64")]
const POINTER_NAME: &str = "ptr64";
#[cfg(not(target_pointer_width = "64"))]
const POINTER_NAME: &str = "ptr32";

impl ValueType {
    /// Decode a raw discriminant
    pub fn from_u8(value: u8) -> Option<Self> {
        if value <= ValueType::Matrix4x4 as u8 {
            Some(ALL_VALUE_TYPES[value as usize])
        } else {
            None
        }
    }

    /// Scalars that fit one register (bool through double, plus function pointers)
    pub fn is_scalar(self) -> bool {
        (ValueType::Bool..=ValueType::Function).contains(&self)
    }

    /// Integer categories, including bool and characters
    pub fn is_integer(self) -> bool {
        (ValueType::Bool..=ValueType::Pointer).contains(&self)
    }

    /// Signed integer categories
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ValueType::Int8 | ValueType::Int16 | ValueType::Int32 | ValueType::Int64
        )
    }

    /// `Float` or `Double`
    pub fn is_floating(self) -> bool {
        matches!(self, ValueType::Float | ValueType::Double)
    }

    /// Categories whose storage is a native-owned object (string, variant, vectors)
    pub fn is_object(self) -> bool {
        (ValueType::String..=ValueType::ArrayMatrix4x4).contains(&self)
    }

    /// Vector-of-T categories
    pub fn is_array(self) -> bool {
        (ValueType::ArrayBool..=ValueType::ArrayMatrix4x4).contains(&self)
    }

    /// Fixed-size numeric structs
    pub fn is_struct(self) -> bool {
        (ValueType::Vector2..=ValueType::Matrix4x4).contains(&self)
    }

    /// Element category of a vector category
    pub fn element_type(self) -> Option<ValueType> {
        let element = match self {
            ValueType::ArrayBool => ValueType::Bool,
            ValueType::ArrayChar8 => ValueType::Char8,
            ValueType::ArrayChar16 => ValueType::Char16,
            ValueType::ArrayInt8 => ValueType::Int8,
            ValueType::ArrayInt16 => ValueType::Int16,
            ValueType::ArrayInt32 => ValueType::Int32,
            ValueType::ArrayInt64 => ValueType::Int64,
            ValueType::ArrayUInt8 => ValueType::UInt8,
            ValueType::ArrayUInt16 => ValueType::UInt16,
            ValueType::ArrayUInt32 => ValueType::UInt32,
            ValueType::ArrayUInt64 => ValueType::UInt64,
            ValueType::ArrayPointer => ValueType::Pointer,
            ValueType::ArrayFloat => ValueType::Float,
            ValueType::ArrayDouble => ValueType::Double,
            ValueType::ArrayString => ValueType::String,
            ValueType::ArrayAny => ValueType::Any,
            ValueType::ArrayVector2 => ValueType::Vector2,
            ValueType::ArrayVector3 => ValueType::Vector3,
            ValueType::ArrayVector4 => ValueType::Vector4,
            ValueType::ArrayMatrix4x4 => ValueType::Matrix4x4,
            _ => return None,
        };
        Some(element)
    }

    /// Vector category holding elements of this category
    pub fn array_of(self) -> Option<ValueType> {
        ALL_VALUE_TYPES
            .iter()
            .copied()
            .find(|candidate| candidate.element_type() == Some(self))
    }

    /// Size in bytes of an inline value, `None` for void and object categories
    pub fn size_of(self) -> Option<usize> {
        let size = match self {
            ValueType::Bool | ValueType::Char8 | ValueType::Int8 | ValueType::UInt8 => 1,
            ValueType::Char16 | ValueType::Int16 | ValueType::UInt16 => 2,
            ValueType::Int32 | ValueType::UInt32 | ValueType::Float => 4,
            ValueType::Int64 | ValueType::UInt64 | ValueType::Double => 8,
            ValueType::Pointer | ValueType::Function => std::mem::size_of::<usize>(),
            ValueType::Vector2 => 8,
            ValueType::Vector3 => 12,
            ValueType::Vector4 => 16,
            ValueType::Matrix4x4 => 64,
            _ => return None,
        };
        Some(size)
    }

    /// Canonical lowercase name, as used in plugin manifests and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Invalid => "invalid",
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::Char8 => "char8",
            ValueType::Char16 => "char16",
            ValueType::Int8 => "int8",
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::UInt8 => "uint8",
            ValueType::UInt16 => "uint16",
            ValueType::UInt32 => "uint32",
            ValueType::UInt64 => "uint64",
            ValueType::Pointer => POINTER_NAME,
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Function => "function",
            ValueType::String => "string",
            ValueType::Any => "any",
            ValueType::ArrayBool => "bool[]",
            ValueType::ArrayChar8 => "char8[]",
            ValueType::ArrayChar16 => "char16[]",
            ValueType::ArrayInt8 => "int8[]",
            ValueType::ArrayInt16 => "int16[]",
            ValueType::ArrayInt32 => "int32[]",
            ValueType::ArrayInt64 => "int64[]",
            ValueType::ArrayUInt8 => "uint8[]",
            ValueType::ArrayUInt16 => "uint16[]",
            ValueType::ArrayUInt32 => "uint32[]",
            ValueType::ArrayUInt64 => "uint64[]",
            #[cfg(target_pointer_width = "64")]
            ValueType::ArrayPointer => "ptr64[]",
            #[cfg(not(target_pointer_width = "64"))]
            ValueType::ArrayPointer => "ptr32[]",
            ValueType::ArrayFloat => "float[]",
            ValueType::ArrayDouble => "double[]",
            ValueType::ArrayString => "string[]",
            ValueType::ArrayAny => "any[]",
            ValueType::ArrayVector2 => "vec2[]",
            ValueType::ArrayVector3 => "vec3[]",
            ValueType::ArrayVector4 => "vec4[]",
            ValueType::ArrayMatrix4x4 => "mat4x4[]",
            ValueType::Vector2 => "vec2",
            ValueType::Vector3 => "vec3",
            ValueType::Vector4 => "vec4",
            ValueType::Matrix4x4 => "mat4x4",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_VALUE_TYPES
            .iter()
            .copied()
            .find(|vt| *vt != ValueType::Invalid && vt.name() == s)
            .ok_or_else(|| SdkError::UnknownTypeName(s.to_string()))
    }
}

impl TryFrom<u8> for ValueType {
    type Error = SdkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ValueType::from_u8(value).ok_or(SdkError::UnknownValueType(value))
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
